//! Post-dispense low-stock detection.

use crate::inventory::{Inventory, InventoryEntry};
use log::warn;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-denomination quantity at or below which restocking is signaled.
///
/// Denominations without a threshold are never reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LowStockThresholds(BTreeMap<u32, u32>);

impl LowStockThresholds {
    pub fn new() -> Self {
        LowStockThresholds::default()
    }

    pub fn set(&mut self, value: u32, threshold: u32) {
        self.0.insert(value, threshold);
    }

    pub fn get(&self, value: u32) -> Option<u32> {
        self.0.get(&value).copied()
    }
}

impl FromIterator<(u32, u32)> for LowStockThresholds {
    fn from_iter<I: IntoIterator<Item = (u32, u32)>>(iter: I) -> Self {
        LowStockThresholds(iter.into_iter().collect())
    }
}

/// Returns the entries whose quantity is at or below their threshold,
/// highest value first.
pub fn scan(inventory: &Inventory, thresholds: &LowStockThresholds) -> Vec<InventoryEntry> {
    inventory
        .iter()
        .filter(|entry| {
            thresholds
                .get(entry.value())
                .map(|t| entry.quantity <= t)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Receives denominations that need restocking.
pub trait LowStockNotifier: Send + Sync {
    fn notify(&self, low_stock: &[InventoryEntry]);
}

impl<T: LowStockNotifier + ?Sized> LowStockNotifier for Arc<T> {
    fn notify(&self, low_stock: &[InventoryEntry]) {
        (**self).notify(low_stock)
    }
}

/// Reports low stock through the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LowStockNotifier for LogNotifier {
    fn notify(&self, low_stock: &[InventoryEntry]) {
        for entry in low_stock {
            warn!(
                "Low stock: {} has {} unit(s) left",
                entry.denomination, entry.quantity
            );
        }
    }
}

/// Keeps every notification batch, mostly useful in tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    batches: Mutex<Vec<Vec<InventoryEntry>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        MemoryNotifier::default()
    }

    /// All batches received so far, oldest first.
    pub fn batches(&self) -> Vec<Vec<InventoryEntry>> {
        self.batches.lock().clone()
    }
}

impl LowStockNotifier for MemoryNotifier {
    fn notify(&self, low_stock: &[InventoryEntry]) {
        self.batches.lock().push(low_stock.to_vec());
    }
}
