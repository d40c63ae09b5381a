//! Cash inventory model and stores.
//!
//! An [`Inventory`] is the snapshot the engine works on: one entry per
//! denomination, always ordered by face value descending. Stores keep the
//! durable copy and hand out snapshots.

use crate::config::StockConfig;
use crate::denomination::Denomination;
use crate::error::StoreError;
use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Quantity on hand for one denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub denomination: Denomination,

    /// Units currently in the machine. Never negative.
    pub quantity: u32,
}

impl InventoryEntry {
    pub fn new(denomination: Denomination, quantity: u32) -> Self {
        InventoryEntry {
            denomination,
            quantity,
        }
    }

    /// Face value of this entry's denomination.
    pub fn value(&self) -> u32 {
        self.denomination.value
    }

    /// Removes `count` units from this entry.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds the quantity on hand. Callers must check
    /// stock first; running an entry negative is a bug, not a business failure.
    pub fn withdraw(&mut self, count: u32) {
        self.quantity = self
            .quantity
            .checked_sub(count)
            .expect("withdrawal exceeds quantity on hand");
    }
}

/// Ordered snapshot of every denomination in the machine.
///
/// # Invariants
///
/// - Entries are sorted by value, highest first
/// - Values are positive and unique
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    /// Builds an inventory from unordered entries, validating values.
    pub fn new(mut entries: Vec<InventoryEntry>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.value() == 0 {
                return Err(StoreError::ZeroDenomination);
            }
            if !seen.insert(entry.value()) {
                return Err(StoreError::DuplicateDenomination(entry.value()));
            }
        }

        entries.sort_by(|a, b| b.value().cmp(&a.value()));
        Ok(Inventory { entries })
    }

    /// Creates an inventory with no denominations.
    pub fn empty() -> Self {
        Inventory::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries ordered by value descending.
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    /// Mutable view for the allocation step. Quantities may change; the
    /// ordering and the set of denominations may not.
    pub fn entries_mut(&mut self) -> &mut [InventoryEntry] {
        &mut self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter()
    }

    /// Looks up the entry for a face value.
    pub fn get(&self, value: u32) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.value() == value)
    }

    /// Quantity on hand for a face value, zero if the value is not stocked.
    pub fn quantity_of(&self, value: u32) -> u32 {
        self.get(value).map(|e| e.quantity).unwrap_or(0)
    }

    /// Total cash held, in currency units.
    pub fn total_value(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.value()) * u64::from(e.quantity))
            .sum()
    }
}

/// Durable keeper of the machine's inventory.
///
/// The engine serializes all calls through its own lock, so implementations
/// don't need internal synchronization.
pub trait InventoryStore {
    /// Returns the current inventory, highest value first.
    fn load_snapshot(&self) -> Result<Inventory, StoreError>;

    /// Persists the quantities of a snapshot produced by `load_snapshot`.
    fn commit(&mut self, inventory: &Inventory) -> Result<(), StoreError>;

    /// Replaces the whole catalog and its stock with the configured one.
    fn reset(&mut self, config: &StockConfig) -> Result<(), StoreError>;
}

/// Inventory kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    inventory: Inventory,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        MemoryInventoryStore::default()
    }

    /// Creates a store already holding `inventory`.
    pub fn with_inventory(inventory: Inventory) -> Self {
        MemoryInventoryStore { inventory }
    }
}

impl InventoryStore for MemoryInventoryStore {
    fn load_snapshot(&self) -> Result<Inventory, StoreError> {
        Ok(self.inventory.clone())
    }

    fn commit(&mut self, inventory: &Inventory) -> Result<(), StoreError> {
        self.inventory = inventory.clone();
        Ok(())
    }

    fn reset(&mut self, config: &StockConfig) -> Result<(), StoreError> {
        self.inventory = config.to_inventory()?;
        Ok(())
    }
}

/// One persisted row of a stock file.
#[derive(Debug, Serialize, Deserialize)]
struct StockRow {
    value: u32,
    description: String,
    quantity: u32,
}

/// Inventory persisted as a `value,description,quantity` CSV file.
///
/// A missing file reads as an empty machine. Writes go to a sibling
/// temporary file that is renamed over the original.
#[derive(Debug)]
pub struct CsvInventoryStore {
    path: PathBuf,
}

impl CsvInventoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvInventoryStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<file name>.tmp` next to the store file, never the store file itself.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write(&self, inventory: &Inventory) -> Result<(), StoreError> {
        let tmp_path = self.tmp_path();
        {
            let file = File::create(&tmp_path)?;
            write_stock_rows(inventory, file)?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!("Persisted {} stock rows to {}", inventory.len(), self.path.display());
        Ok(())
    }
}

impl InventoryStore for CsvInventoryStore {
    fn load_snapshot(&self) -> Result<Inventory, StoreError> {
        match File::open(&self.path) {
            Ok(file) => read_stock_rows(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Inventory::empty()),
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&mut self, inventory: &Inventory) -> Result<(), StoreError> {
        self.write(inventory)
    }

    fn reset(&mut self, config: &StockConfig) -> Result<(), StoreError> {
        let inventory = config.to_inventory()?;
        self.write(&inventory)
    }
}

/// Reads `value,description,quantity` rows into an inventory.
pub fn read_stock_rows<R: Read>(reader: R) -> Result<Inventory, StoreError> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let mut entries = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<StockRow>().enumerate() {
        let row = result.map_err(|e| StoreError::InvalidRecord {
            row: row_idx + 2,
            message: e.to_string(),
        })?;
        entries.push(InventoryEntry::new(
            Denomination::with_description(row.value, row.description),
            row.quantity,
        ));
    }

    Inventory::new(entries)
}

/// Writes an inventory as `value,description,quantity` rows, highest value first.
pub fn write_stock_rows<W: Write>(inventory: &Inventory, writer: W) -> Result<(), StoreError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in inventory.iter() {
        csv_writer.serialize(StockRow {
            value: entry.value(),
            description: entry.denomination.description.clone(),
            quantity: entry.quantity,
        })?;
    }
    // An empty inventory still gets a header so the file reads back cleanly.
    if inventory.is_empty() {
        csv_writer.write_record(["value", "description", "quantity"])?;
    }
    csv_writer.flush()?;
    Ok(())
}
