//! Edge case tests for the cash dispenser.
//!
//! Requests are driven through `CashMachine::process_csv` and the engine API.

use cash_dispenser::{
    CashMachine, DispenseEngine, DispenseError, FailureKind, FixedLimit, MemoryInventoryStore,
    StockConfig,
};
use std::io::Cursor;
use std::sync::{Arc, Barrier};
use std::thread;

fn machine(pairs: &[(u32, u32)]) -> CashMachine<MemoryInventoryStore> {
    let engine = DispenseEngine::new(MemoryInventoryStore::new());
    let machine = CashMachine::new(engine, StockConfig::from_pairs(pairs));
    machine.initialize().unwrap();
    machine
}

fn run_csv(machine: &CashMachine<MemoryInventoryStore>, csv: &str) -> Vec<String> {
    let mut output = Vec::new();
    machine.process_csv(Cursor::new(csv), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .skip(1) // Skip header
        .map(|s| s.to_string())
        .collect()
}

fn stock(machine: &CashMachine<MemoryInventoryStore>) -> Vec<(u32, u32)> {
    machine
        .current_stock()
        .unwrap()
        .iter()
        .map(|e| (e.value(), e.quantity))
        .collect()
}

// ==================== ALLOCATION ====================

#[test]
fn test_multiple_of_top_denomination_uses_only_it() {
    let m = machine(&[(100, 2), (50, 3), (20, 4)]);
    let rows = run_csv(&m, "op,amount\ndispense,100\n");

    assert_eq!(rows, vec!["dispense,100,ok,100:1,"]);
    assert_eq!(stock(&m), vec![(100, 1), (50, 3), (20, 4)]);
}

#[test]
fn test_mixed_denominations() {
    let m = machine(&[(100, 2), (50, 2), (20, 3), (10, 4)]);
    let rows = run_csv(&m, "op,amount\ndispense,90\n");

    assert_eq!(rows, vec!["dispense,90,ok,50:1;20:2,"]);
    assert_eq!(stock(&m), vec![(100, 2), (50, 1), (20, 1), (10, 4)]);
}

#[test]
fn test_whole_stock_can_be_dispensed() {
    let m = machine(&[(50, 1), (20, 2), (10, 1)]);
    let rows = run_csv(&m, "op,amount\ndispense,100\ndispense,10\n");

    assert_eq!(rows[0], "dispense,100,ok,50:1;20:2;10:1,");
    assert!(rows[1].starts_with("dispense,10,error,,"));
    assert_eq!(stock(&m), vec![(50, 0), (20, 0), (10, 0)]);
}

#[test]
fn test_successful_plans_sum_to_request() {
    let m = machine(&[
        (100, 10),
        (50, 20),
        (20, 30),
        (10, 40),
        (5, 50),
        (2, 60),
        (1, 70),
    ]);
    for amount in 1..=60 {
        let before = m.current_stock().unwrap();
        let plan = m.dispense(amount).unwrap();
        let after = m.current_stock().unwrap();

        assert_eq!(plan.total(), amount as u64);
        for entry in before.iter() {
            assert_eq!(
                after.quantity_of(entry.value()),
                entry.quantity - plan.count_of(entry.value())
            );
        }
    }
}

// ==================== FAILURES ====================

#[test]
fn test_insufficient_stock_row_and_unchanged_inventory() {
    let m = machine(&[(100, 2), (50, 2), (20, 3), (10, 4)]);
    let rows = run_csv(&m, "op,amount\ndispense,55\n");

    assert_eq!(
        rows,
        vec![
            "dispense,55,error,,\"Sorry, this ATM cannot supply the amount required $55 \
             with current stock. The closest amount that can be supplied is $50. \
             Please try again later.\""
        ]
    );
    assert_eq!(stock(&m), vec![(100, 2), (50, 2), (20, 3), (10, 4)]);
}

#[test]
fn test_over_limit_ignores_stock() {
    let engine = DispenseEngine::new(MemoryInventoryStore::new()).with_limit(FixedLimit(1000));
    let m = CashMachine::new(engine, StockConfig::from_pairs(&[(100, 50)]));
    m.initialize().unwrap();

    let err = m.dispense(1001).unwrap_err();
    assert!(matches!(
        err,
        DispenseError::OverLimit {
            required: 1001,
            supplied: 1000
        }
    ));
    assert_eq!(
        err.to_string(),
        "Sorry, the amount $1001 is over your withdraw limitation. \
         The amount you can withdraw is $1000 today."
    );
    assert!(m.dispense(1000).is_ok());
}

#[test]
fn test_empty_machine() {
    let m = machine(&[]);
    let rows = run_csv(&m, "op,amount\ndispense,10\nstock,\n");

    assert_eq!(rows[0], "dispense,10,error,,There is no cash in the machine.");
    assert_eq!(rows[1], "stock,,ok,,");
}

#[test]
fn test_non_positive_amounts() {
    let m = machine(&[(10, 3)]);
    assert_eq!(m.dispense(0).unwrap_err().kind(), FailureKind::InvalidAmount);
    assert_eq!(m.dispense(-10).unwrap_err().kind(), FailureKind::InvalidAmount);

    let rows = run_csv(&m, "op,amount\ndispense,-5\n");
    assert_eq!(rows, vec!["dispense,-5,error,,Can't withdraw non-positive amount $-5."]);
    assert_eq!(stock(&m), vec![(10, 3)]);
}

#[test]
fn test_failure_then_success_sequence() {
    let m = machine(&[(100, 2), (50, 3), (20, 4), (10, 5)]);
    let rows = run_csv(
        &m,
        "op,amount\n\
         dispense,200\n\
         dispense,90\n\
         dispense,200\n\
         dispense,25\n\
         dispense,190\n\
         stock,\n",
    );

    assert_eq!(rows[0], "dispense,200,ok,100:2,");
    assert_eq!(rows[1], "dispense,90,ok,50:1;20:2,");
    assert!(rows[2].contains("closest amount that can be supplied is $190."));
    assert!(rows[3].contains("closest amount that can be supplied is $20."));
    assert_eq!(rows[4], "dispense,190,ok,50:2;20:2;10:5,");
    assert_eq!(rows[5], "stock,,ok,100:0;50:0;20:0;10:0,");
}

// ==================== QUERY & INITIALIZE ====================

#[test]
fn test_stock_query_is_idempotent() {
    let m = machine(&[(20, 5), (5, 2)]);
    let rows = run_csv(&m, "op,amount\nstock,\nstock,\n");
    assert_eq!(rows[0], rows[1]);
    assert_eq!(rows[0], "stock,,ok,20:5;5:2,");
}

#[test]
fn test_initialize_restores_configured_stock() {
    let m = machine(&[(50, 2), (10, 2)]);
    let rows = run_csv(&m, "op,amount\ndispense,60\ninitialize,\ndispense,60\n");

    assert_eq!(rows[0], "dispense,60,ok,50:1;10:1,");
    assert_eq!(rows[1], "initialize,,ok,50:2;10:2,");
    assert_eq!(rows[2], "dispense,60,ok,50:1;10:1,");
}

#[test]
fn test_engine_initialize_discards_old_denominations() {
    let m = machine(&[(3, 10)]);
    m.engine()
        .initialize(&StockConfig::from_pairs(&[(5, 1)]))
        .unwrap();
    assert_eq!(stock(&m), vec![(5, 1)]);
}

// ==================== PARSING ====================

#[test]
fn test_whitespace_and_case_handling() {
    let m = machine(&[(10, 5)]);
    let rows = run_csv(&m, "op, amount\n  DISPENSE , 20 \n");
    assert_eq!(rows, vec!["dispense,20,ok,10:2,"]);
}

#[test]
fn test_unknown_and_malformed_rows_are_skipped() {
    let m = machine(&[(10, 5)]);
    let rows = run_csv(
        &m,
        "op,amount\n\
         refill,100\n\
         dispense,abc\n\
         dispense,12.5\n\
         dispense,10\n",
    );
    assert_eq!(rows, vec!["dispense,10,ok,10:1,"]);
}

// ==================== CONCURRENCY ====================

#[test]
fn test_concurrent_dispenses_never_oversell() {
    // Three 50s: two threads each want 100, only one can have it.
    let engine = Arc::new(DispenseEngine::new(MemoryInventoryStore::new()));
    engine
        .initialize(&StockConfig::from_pairs(&[(50, 3)]))
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine.dispense(100)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(
        failure,
        DispenseError::InsufficientStock {
            required: 100,
            supplied: 50
        }
    ));
    assert_eq!(engine.current_stock().unwrap().quantity_of(50), 1);
}

#[test]
fn test_many_threads_keep_stock_consistent() {
    let engine = Arc::new(DispenseEngine::new(MemoryInventoryStore::new()));
    engine
        .initialize(&StockConfig::from_pairs(&[(20, 25), (10, 25)]))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut dispensed = 0u64;
                for _ in 0..10 {
                    if let Ok(plan) = engine.dispense(30) {
                        dispensed += plan.total();
                    }
                }
                dispensed
            })
        })
        .collect();

    let dispensed: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let remaining = engine.current_stock().unwrap().total_value();
    assert_eq!(dispensed + remaining, 25 * 20 + 25 * 10);
}
