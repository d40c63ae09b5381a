//! Cash machine service layer.
//!
//! Exposes the three operations a front end needs (initialize, dispense,
//! stock query) and a streaming CSV driver that runs a file of requests
//! against the engine and writes one result row per request.

use crate::allocation::AllocationPlan;
use crate::config::StockConfig;
use crate::engine::DispenseEngine;
use crate::error::{DispenseError, Result};
use crate::inventory::{Inventory, InventoryStore};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Raw request row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct RequestRecord {
    /// Operation: initialize, dispense or stock
    pub op: String,

    /// Requested amount, only meaningful for dispense
    pub amount: Option<String>,
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Reload the configured starting stock.
    Initialize,

    /// Hand out the given amount.
    Dispense(i64),

    /// Report the current stock.
    Stock,
}

impl RequestRecord {
    /// Parses the raw record, returning `None` for unknown operations or a
    /// dispense without a numeric amount.
    pub fn parse(&self) -> Option<Request> {
        match self.op.trim().to_lowercase().as_str() {
            "initialize" | "init" => Some(Request::Initialize),
            "stock" => Some(Request::Stock),
            "dispense" => {
                let amount = self.amount.as_ref()?.trim();
                amount.parse().ok().map(Request::Dispense)
            }
            _ => None,
        }
    }
}

/// One output row.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    op: &'a str,
    amount: Option<i64>,
    status: &'a str,
    breakdown: String,
    message: String,
}

/// The machine as seen by a front end.
pub struct CashMachine<S> {
    engine: DispenseEngine<S>,
    stock: StockConfig,
}

impl<S: InventoryStore> CashMachine<S> {
    /// Wraps `engine`; `stock` is what [`initialize`](Self::initialize) loads.
    pub fn new(engine: DispenseEngine<S>, stock: StockConfig) -> Self {
        CashMachine { engine, stock }
    }

    pub fn engine(&self) -> &DispenseEngine<S> {
        &self.engine
    }

    /// Resets the machine to its configured starting stock.
    pub fn initialize(&self) -> std::result::Result<Inventory, DispenseError> {
        self.engine.initialize(&self.stock)?;
        self.engine.current_stock()
    }

    pub fn dispense(&self, amount: i64) -> std::result::Result<AllocationPlan, DispenseError> {
        self.engine.dispense(amount)
    }

    /// Current stock, highest value first.
    pub fn current_stock(&self) -> std::result::Result<Inventory, DispenseError> {
        self.engine.current_stock()
    }

    /// Runs every request in `reader` and writes a result row for each.
    ///
    /// Rows that cannot be parsed are logged at warn level and skipped.
    /// Business failures become `error` rows carrying the user-facing message.
    pub fn process_csv<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<()> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["op", "amount", "status", "breakdown", "message"])?;

        for (row_idx, result) in csv_reader.deserialize::<RequestRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let request = match result {
                Ok(record) => match record.parse() {
                    Some(request) => request,
                    None => {
                        warn!("Row {}: Failed to parse request record", row_num);
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Row {}: CSV parse error: {}", row_num, e);
                    continue;
                }
            };

            debug!("Row {}: {:?}", row_num, request);
            let row = self.run(&request);
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    fn run(&self, request: &Request) -> ResultRow<'static> {
        let (op, amount, outcome) = match *request {
            Request::Initialize => (
                "initialize",
                None,
                self.initialize().map(|inv| stock_breakdown(&inv)),
            ),
            Request::Dispense(amount) => (
                "dispense",
                Some(amount),
                self.dispense(amount).map(|plan| plan_breakdown(&plan)),
            ),
            Request::Stock => (
                "stock",
                None,
                self.current_stock().map(|inv| stock_breakdown(&inv)),
            ),
        };

        match outcome {
            Ok(breakdown) => ResultRow {
                op,
                amount,
                status: "ok",
                breakdown,
                message: String::new(),
            },
            Err(e) => ResultRow {
                op,
                amount,
                status: "error",
                breakdown: String::new(),
                message: e.to_string(),
            },
        }
    }
}

/// `value:count` pairs joined by `;`, highest value first.
pub fn plan_breakdown(plan: &AllocationPlan) -> String {
    join_pairs(plan.iter().map(|l| (l.denomination.value, l.count)))
}

/// Same format as [`plan_breakdown`], over quantities on hand.
pub fn stock_breakdown(inventory: &Inventory) -> String {
    join_pairs(inventory.iter().map(|e| (e.value(), e.quantity)))
}

fn join_pairs(pairs: impl Iterator<Item = (u32, u32)>) -> String {
    pairs
        .map(|(value, count)| format!("{}:{}", value, count))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::MemoryInventoryStore;
    use std::io::Cursor;

    fn machine(pairs: &[(u32, u32)]) -> CashMachine<MemoryInventoryStore> {
        let engine = DispenseEngine::new(MemoryInventoryStore::new());
        let machine = CashMachine::new(engine, StockConfig::from_pairs(pairs));
        machine.initialize().unwrap();
        machine
    }

    fn run_csv(machine: &CashMachine<MemoryInventoryStore>, csv: &str) -> String {
        let mut output = Vec::new();
        machine.process_csv(Cursor::new(csv), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_parse_requests() {
        let record = RequestRecord {
            op: " Dispense ".to_string(),
            amount: Some(" 90 ".to_string()),
        };
        assert_eq!(record.parse(), Some(Request::Dispense(90)));

        let record = RequestRecord {
            op: "stock".to_string(),
            amount: None,
        };
        assert_eq!(record.parse(), Some(Request::Stock));

        let record = RequestRecord {
            op: "dispense".to_string(),
            amount: Some("ten".to_string()),
        };
        assert_eq!(record.parse(), None);

        let record = RequestRecord {
            op: "refill".to_string(),
            amount: None,
        };
        assert_eq!(record.parse(), None);
    }

    #[test]
    fn test_dispense_rows() {
        let m = machine(&[(100, 2), (50, 2), (20, 3), (10, 4)]);
        let output = run_csv(
            &m,
            "op,amount\n\
             dispense,90\n\
             dispense,55\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "op,amount,status,breakdown,message");
        assert_eq!(lines[1], "dispense,90,ok,50:1;20:2,");
        assert!(lines[2].starts_with("dispense,55,error,,"));
        assert!(lines[2].contains("The closest amount that can be supplied is $50."));
    }

    #[test]
    fn test_stock_and_initialize_rows() {
        let m = machine(&[(50, 2), (20, 3)]);
        let output = run_csv(
            &m,
            "op,amount\n\
             dispense,50\n\
             stock,\n\
             initialize,\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[1], "dispense,50,ok,50:1,");
        assert_eq!(lines[2], "stock,,ok,50:1;20:3,");
        assert_eq!(lines[3], "initialize,,ok,50:2;20:3,");
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let m = machine(&[(10, 5)]);
        let output = run_csv(
            &m,
            "op,amount\n\
             withdraw,10\n\
             dispense,\n\
             dispense,10\n",
        );
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "dispense,10,ok,10:1,");
    }
}
