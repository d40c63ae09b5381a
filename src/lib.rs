//! # Cash Dispenser
//!
//! A cash machine engine that decides which notes and coins to hand out for
//! a withdrawal, given a finite multi-denomination inventory.
//!
//! ## Design Principles
//!
//! - **All-or-nothing dispense**: inventory is committed only when the full
//!   amount was allocated
//! - **Serialized inventory access**: one dispense or initialize at a time
//! - **Typed failures**: no stock, insufficient stock, over limit and invalid
//!   amount are distinct error variants carrying the amounts involved
//! - **Deterministic output**: stock and breakdowns ordered by value descending
//!
//! ## Example
//!
//! ```
//! use cash_dispenser::{DispenseEngine, MemoryInventoryStore, StockConfig};
//!
//! let engine = DispenseEngine::new(MemoryInventoryStore::new());
//! engine
//!     .initialize(&StockConfig::from_pairs(&[(100, 2), (50, 2), (20, 3), (10, 4)]))
//!     .unwrap();
//!
//! let plan = engine.dispense(90).unwrap();
//! assert_eq!(plan.count_of(50), 1);
//! assert_eq!(plan.count_of(20), 2);
//! ```

pub mod allocation;
pub mod config;
pub mod denomination;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod journal;
pub mod limit;
pub mod low_stock;
pub mod machine;

pub use allocation::{allocate, Allocation, AllocationPlan, PlanLine};
pub use config::{MachineConfig, StockConfig};
pub use denomination::Denomination;
pub use engine::DispenseEngine;
pub use error::{DispenseError, EngineError, FailureKind, Result};
pub use inventory::{
    CsvInventoryStore, Inventory, InventoryEntry, InventoryStore, MemoryInventoryStore,
};
pub use journal::{
    BankAccount, CsvJournal, LogJournal, MemoryJournal, TransactionRecord, TransactionRecorder,
};
pub use limit::{FixedLimit, LimitProvider};
pub use low_stock::{LogNotifier, LowStockNotifier, LowStockThresholds, MemoryNotifier};
pub use machine::CashMachine;
