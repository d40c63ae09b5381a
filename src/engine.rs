//! Core cash dispense engine.
//!
//! Checks the withdrawal limit, allocates notes from an inventory snapshot
//! and commits the snapshot only when the whole amount was covered. The
//! inventory store sits behind a mutex held for load, allocate and commit;
//! the limit provider, journal and low-stock notifier run outside it.

use crate::allocation::{allocate, AllocationPlan};
use crate::config::{MachineConfig, StockConfig};
use crate::error::DispenseError;
use crate::inventory::{Inventory, InventoryEntry, InventoryStore};
use crate::journal::{
    AccountLookup, FixedAccount, LogJournal, TransactionRecord, TransactionRecorder,
};
use crate::limit::{FixedLimit, LimitProvider};
use crate::low_stock::{self, LogNotifier, LowStockNotifier, LowStockThresholds};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;

/// Guarded state: the store and the thresholds of its current catalog.
struct Vault<S> {
    store: S,
    thresholds: LowStockThresholds,
}

/// The cash dispense engine.
///
/// Safe to share across threads when `S: Send`. Dispenses are serialized
/// against the inventory; each one either commits in full or leaves the
/// store untouched.
pub struct DispenseEngine<S> {
    vault: Mutex<Vault<S>>,
    limit: Box<dyn LimitProvider>,
    accounts: Box<dyn AccountLookup>,
    recorder: Box<dyn TransactionRecorder>,
    notifier: Box<dyn LowStockNotifier>,
}

impl<S: InventoryStore> DispenseEngine<S> {
    /// Creates an engine over `store` with the default limit and account,
    /// and log-based journaling and low-stock notifications.
    ///
    /// The store is used as-is; call [`initialize`](Self::initialize) to load a
    /// configured stock.
    pub fn new(store: S) -> Self {
        let defaults = MachineConfig::default();
        DispenseEngine {
            vault: Mutex::new(Vault {
                store,
                thresholds: defaults.stock.thresholds(),
            }),
            limit: Box::new(FixedLimit(defaults.withdrawal_limit)),
            accounts: Box::new(FixedAccount(defaults.account)),
            recorder: Box::new(LogJournal),
            notifier: Box::new(LogNotifier),
        }
    }

    /// Creates an engine using the limit and account of `config`.
    pub fn with_config(store: S, config: &MachineConfig) -> Self {
        DispenseEngine::new(store)
            .with_limit(FixedLimit(config.withdrawal_limit))
            .with_accounts(FixedAccount(config.account.clone()))
            .with_thresholds(config.stock.thresholds())
    }

    pub fn with_limit(mut self, limit: impl LimitProvider + 'static) -> Self {
        self.limit = Box::new(limit);
        self
    }

    pub fn with_accounts(mut self, accounts: impl AccountLookup + 'static) -> Self {
        self.accounts = Box::new(accounts);
        self
    }

    pub fn with_recorder(mut self, recorder: impl TransactionRecorder + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn with_notifier(mut self, notifier: impl LowStockNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_thresholds(mut self, thresholds: LowStockThresholds) -> Self {
        self.vault.get_mut().thresholds = thresholds;
        self
    }

    /// Replaces the machine's catalog and stock with `config`.
    ///
    /// Old denominations are discarded, not merged. Runs under the inventory
    /// lock so it never interleaves with a dispense.
    pub fn initialize(&self, config: &StockConfig) -> Result<(), DispenseError> {
        let mut vault = self.vault.lock();
        vault.store.reset(config)?;
        vault.thresholds = config.thresholds();
        info!(
            "Initialized machine with {} denomination(s)",
            config.settings().count()
        );
        Ok(())
    }

    /// Current stock, highest value first.
    pub fn current_stock(&self) -> Result<Inventory, DispenseError> {
        let vault = self.vault.lock();
        Ok(vault.store.load_snapshot()?)
    }

    /// Dispenses `amount`, returning the notes handed out.
    ///
    /// On any error the inventory is left exactly as it was.
    pub fn dispense(&self, amount: i64) -> Result<AllocationPlan, DispenseError> {
        let requested = match u64::try_from(amount) {
            Ok(v) if v > 0 => v,
            _ => return Err(DispenseError::InvalidAmount(amount)),
        };

        let limit = self.limit.current_limit();
        if requested > limit {
            warn!("Requested {} is over the withdrawal limit {}", requested, limit);
            return Err(DispenseError::OverLimit {
                required: requested,
                supplied: limit,
            });
        }

        let (plan, low_stock) = {
            let mut vault = self.vault.lock();

            let mut snapshot = vault.store.load_snapshot()?;
            if snapshot.is_empty() {
                warn!("Dispense of {} refused: no cash in the machine", requested);
                return Err(DispenseError::NoStock);
            }

            let allocation = allocate(requested, snapshot.entries_mut());
            if !allocation.is_complete() {
                let supplied = requested - allocation.leftover;
                warn!(
                    "Cannot supply {} with current stock, closest is {}",
                    requested, supplied
                );
                return Err(DispenseError::InsufficientStock {
                    required: requested,
                    supplied,
                });
            }

            vault.store.commit(&snapshot)?;
            let low_stock = low_stock::scan(&snapshot, &vault.thresholds);
            (allocation.plan, low_stock)
        };

        info!("Dispensed {} in {} denomination(s)", requested, plan.len());
        for line in plan.iter() {
            debug!("  {} x {}", line.count, line.denomination);
        }

        self.after_commit(requested, &plan, &low_stock);
        Ok(plan)
    }

    /// Journals the dispense and reports low stock. Neither can fail the dispense.
    fn after_commit(&self, requested: u64, plan: &AllocationPlan, low_stock: &[InventoryEntry]) {
        let record = TransactionRecord {
            account: self.accounts.current_account(),
            requested,
            plan: plan.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.recorder.record(&record) {
            warn!("Failed to record dispense of {}: {}", requested, e);
        }

        if !low_stock.is_empty() {
            self.notifier.notify(low_stock);
        }
    }
}
