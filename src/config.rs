//! Machine configuration.
//!
//! Loads starting stock from CSV and the withdrawal limit from the
//! environment. Defaults describe a fully loaded seven-denomination machine.

use crate::denomination::{default_description, Denomination};
use crate::error::{EngineError, Result, StoreError};
use crate::inventory::{Inventory, InventoryEntry};
use crate::journal::BankAccount;
use crate::low_stock::LowStockThresholds;
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::io::Read;
use std::path::PathBuf;

/// Environment variable overriding the withdrawal limit.
pub const WITHDRAWAL_LIMIT_VAR: &str = "CASH_WITHDRAWAL_LIMIT";

/// Environment variable naming a CSV file that keeps the inventory between runs.
pub const STOCK_PATH_VAR: &str = "CASH_STOCK_PATH";

/// Environment variable naming the CSV transaction journal.
pub const JOURNAL_PATH_VAR: &str = "CASH_JOURNAL_PATH";

/// Withdrawal ceiling used when nothing else is configured.
pub const DEFAULT_WITHDRAWAL_LIMIT: u64 = 1000;

/// (value, starting quantity, low-stock threshold)
const DEFAULT_STOCK: [(u32, u32, u32); 7] = [
    (100, 10, 2),
    (50, 20, 3),
    (20, 30, 4),
    (10, 40, 5),
    (5, 50, 6),
    (2, 60, 7),
    (1, 70, 8),
];

/// Starting setup of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenominationSetting {
    pub quantity: u32,
    pub description: Option<String>,
    pub low_stock_threshold: Option<u32>,
}

/// Starting stock of a machine, keyed by face value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockConfig {
    settings: BTreeMap<u32, DenominationSetting>,
}

#[derive(Debug, Deserialize)]
struct StockConfigRow {
    value: u32,
    quantity: u32,
    #[serde(default)]
    threshold: Option<u32>,
    #[serde(default)]
    description: Option<String>,
}

impl StockConfig {
    /// Creates a config with no denominations.
    pub fn empty() -> Self {
        StockConfig {
            settings: BTreeMap::new(),
        }
    }

    /// Builds a config from `(value, quantity)` pairs without thresholds.
    pub fn from_pairs(pairs: &[(u32, u32)]) -> Self {
        let mut config = StockConfig::empty();
        for &(value, quantity) in pairs {
            config.insert(value, quantity);
        }
        config
    }

    /// Reads `value,quantity[,threshold][,description]` rows.
    ///
    /// Later rows for the same value replace earlier ones.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut config = StockConfig::empty();
        for (row_idx, result) in csv_reader.deserialize::<StockConfigRow>().enumerate() {
            let row = result.map_err(|e| {
                EngineError::Config(format!("stock row {}: {}", row_idx + 2, e))
            })?;
            if row.value == 0 {
                return Err(EngineError::Config(format!(
                    "stock row {}: denomination value must be positive",
                    row_idx + 2
                )));
            }
            config.settings.insert(
                row.value,
                DenominationSetting {
                    quantity: row.quantity,
                    description: row.description.filter(|d| !d.is_empty()),
                    low_stock_threshold: row.threshold,
                },
            );
        }

        Ok(config)
    }

    /// Sets the starting quantity of a denomination.
    pub fn insert(&mut self, value: u32, quantity: u32) -> &mut Self {
        self.settings
            .entry(value)
            .and_modify(|s| s.quantity = quantity)
            .or_insert(DenominationSetting {
                quantity,
                description: None,
                low_stock_threshold: None,
            });
        self
    }

    /// Sets the low-stock threshold of an already configured denomination.
    pub fn with_threshold(mut self, value: u32, threshold: u32) -> Self {
        if let Some(setting) = self.settings.get_mut(&value) {
            setting.low_stock_threshold = Some(threshold);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Settings ordered by face value ascending.
    pub fn settings(&self) -> impl Iterator<Item = (u32, &DenominationSetting)> {
        self.settings.iter().map(|(v, s)| (*v, s))
    }

    /// Builds the inventory this config starts a machine with.
    pub fn to_inventory(&self) -> std::result::Result<Inventory, StoreError> {
        let entries = self
            .settings
            .iter()
            .map(|(&value, setting)| {
                let description = setting
                    .description
                    .clone()
                    .unwrap_or_else(|| default_description(value));
                InventoryEntry::new(
                    Denomination::with_description(value, description),
                    setting.quantity,
                )
            })
            .collect();
        Inventory::new(entries)
    }

    /// Low-stock thresholds of the denominations that configure one.
    pub fn thresholds(&self) -> LowStockThresholds {
        self.settings
            .iter()
            .filter_map(|(&value, s)| s.low_stock_threshold.map(|t| (value, t)))
            .collect()
    }
}

impl Default for StockConfig {
    fn default() -> Self {
        let mut config = StockConfig::empty();
        for (value, quantity, threshold) in DEFAULT_STOCK {
            config.insert(value, quantity);
            config = config.with_threshold(value, threshold);
        }
        config
    }
}

/// Everything needed to stand up a machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub stock: StockConfig,
    pub withdrawal_limit: u64,
    pub account: BankAccount,

    /// Durable inventory file; in-memory stock when `None`.
    pub store_path: Option<PathBuf>,

    /// CSV journal file; in-memory journal when `None`.
    pub journal_path: Option<PathBuf>,
}

impl MachineConfig {
    /// Default configuration overridden by `CASH_WITHDRAWAL_LIMIT`,
    /// `CASH_STOCK_PATH` and `CASH_JOURNAL_PATH` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = MachineConfig::default();
        if let Ok(raw) = env::var(WITHDRAWAL_LIMIT_VAR) {
            config.apply_limit_override(&raw)?;
        }
        config.store_path = env::var_os(STOCK_PATH_VAR).map(PathBuf::from);
        config.journal_path = env::var_os(JOURNAL_PATH_VAR).map(PathBuf::from);
        Ok(config)
    }

    /// Parses and applies a withdrawal limit given as text.
    pub fn apply_limit_override(&mut self, raw: &str) -> Result<()> {
        let limit: u64 = raw.trim().parse().map_err(|_| {
            EngineError::Config(format!("{} must be a positive integer", WITHDRAWAL_LIMIT_VAR))
        })?;
        if limit == 0 {
            return Err(EngineError::Config(format!(
                "{} must be a positive integer",
                WITHDRAWAL_LIMIT_VAR
            )));
        }
        self.withdrawal_limit = limit;
        Ok(())
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            stock: StockConfig::default(),
            withdrawal_limit: DEFAULT_WITHDRAWAL_LIMIT,
            account: BankAccount::default(),
            store_path: None,
            journal_path: None,
        }
    }
}
