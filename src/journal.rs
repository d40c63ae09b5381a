//! Transaction journal.
//!
//! Every successful dispense is recorded against the bank account it was
//! charged to. Recording happens after the inventory commit and its failure
//! never undoes the dispense.

use crate::allocation::AllocationPlan;
use crate::error::JournalError;
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Account a withdrawal is charged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccount {
    pub bsb: String,
    pub account_no: String,
    pub account_name: String,
}

impl BankAccount {
    pub fn new(
        bsb: impl Into<String>,
        account_no: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        BankAccount {
            bsb: bsb.into(),
            account_no: account_no.into(),
            account_name: account_name.into(),
        }
    }
}

impl Default for BankAccount {
    fn default() -> Self {
        BankAccount::new("111111", "12345678", "James")
    }
}

/// Resolves the account behind the current withdrawal.
pub trait AccountLookup: Send + Sync {
    fn current_account(&self) -> BankAccount;
}

/// Always charges the same account.
#[derive(Debug, Clone, Default)]
pub struct FixedAccount(pub BankAccount);

impl AccountLookup for FixedAccount {
    fn current_account(&self) -> BankAccount {
        self.0.clone()
    }
}

/// Audit record of one successful dispense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub account: BankAccount,
    pub requested: u64,
    pub plan: AllocationPlan,
    pub created_at: DateTime<Utc>,
}

/// Persists transaction records.
pub trait TransactionRecorder: Send + Sync {
    fn record(&self, record: &TransactionRecord) -> Result<(), JournalError>;
}

impl<T: TransactionRecorder + ?Sized> TransactionRecorder for Arc<T> {
    fn record(&self, record: &TransactionRecord) -> Result<(), JournalError> {
        (**self).record(record)
    }
}

/// Writes each record to the log at info level and keeps nothing.
#[derive(Debug, Default)]
pub struct LogJournal;

impl TransactionRecorder for LogJournal {
    fn record(&self, record: &TransactionRecord) -> Result<(), JournalError> {
        let breakdown = record
            .plan
            .iter()
            .map(|line| format!("{} x {}", line.count, line.denomination))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "Journal: {} {}/{} ({}) withdrew {}: {}",
            record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.account.bsb,
            record.account.account_no,
            record.account.account_name,
            record.requested,
            breakdown
        );
        Ok(())
    }
}

/// Journal kept in memory. Grows with every record; meant for tests and
/// short-lived embedding where the records are read back.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<TransactionRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        MemoryJournal::default()
    }

    /// Records so far, oldest first.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().clone()
    }
}

impl TransactionRecorder for MemoryJournal {
    fn record(&self, record: &TransactionRecord) -> Result<(), JournalError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// One detail row of the CSV journal.
#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    created_at: String,
    bsb: &'a str,
    account_no: &'a str,
    account_name: &'a str,
    requested: u64,
    value: u32,
    description: &'a str,
    quantity: u32,
}

/// Appends one row per dispensed denomination to a CSV file.
///
/// The header is written when the file is new or empty.
#[derive(Debug)]
pub struct CsvJournal {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvJournal {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl TransactionRecorder for CsvJournal {
    fn record(&self, record: &TransactionRecord) -> Result<(), JournalError> {
        let _guard = self.lock.lock();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(&mut file);

        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        for line in record.plan.iter() {
            csv_writer.serialize(JournalRow {
                created_at: created_at.clone(),
                bsb: &record.account.bsb,
                account_no: &record.account.account_no,
                account_name: &record.account.account_name,
                requested: record.requested,
                value: line.denomination.value,
                description: &line.denomination.description,
                quantity: line.count,
            })?;
        }
        csv_writer.flush()?;
        drop(csv_writer);
        file.flush()?;
        Ok(())
    }
}
