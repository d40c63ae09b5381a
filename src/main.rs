//! Cash Dispenser CLI
//!
//! Runs a CSV file of machine requests and writes one result row per
//! request to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- requests.csv [stock.csv] > results.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `CASH_WITHDRAWAL_LIMIT`: Per-dispense ceiling (default 1000)
//! - `CASH_STOCK_PATH`: CSV file keeping the inventory between runs
//! - `CASH_JOURNAL_PATH`: CSV file receiving the transaction journal

use cash_dispenser::{
    CashMachine, CsvInventoryStore, CsvJournal, DispenseEngine, EngineError, InventoryStore,
    MachineConfig, MemoryInventoryStore, Result, StockConfig,
};
use log::info;
use std::env;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(EngineError::MissingArgument);
    }

    let mut config = MachineConfig::from_env()?;
    let explicit_stock = args.get(2).is_some();
    if let Some(stock_path) = args.get(2) {
        let file = File::open(stock_path)?;
        config.stock = StockConfig::from_csv(BufReader::new(file))?;
    }

    let requests = BufReader::new(File::open(&args[1])?);

    match config.store_path.clone() {
        Some(path) => run_machine(CsvInventoryStore::new(path), &config, explicit_stock, requests),
        None => run_machine(MemoryInventoryStore::new(), &config, true, requests),
    }
}

fn run_machine<S: InventoryStore, R: Read>(
    store: S,
    config: &MachineConfig,
    force_initialize: bool,
    requests: R,
) -> Result<()> {
    let resume = !force_initialize && !store.load_snapshot()?.is_empty();

    let mut engine = DispenseEngine::with_config(store, config);
    if let Some(path) = &config.journal_path {
        engine = engine.with_recorder(CsvJournal::new(path));
    }

    let machine = CashMachine::new(engine, config.stock.clone());
    if resume {
        info!("Resuming with persisted stock");
    } else {
        machine.initialize()?;
    }

    let stdout = io::stdout();
    let handle = stdout.lock();
    machine.process_csv(requests, handle)?;

    Ok(())
}
