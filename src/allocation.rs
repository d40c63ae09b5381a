//! Denomination allocation.
//!
//! Decides which notes make up a requested amount. The allocator walks the
//! inventory from the highest value down and, at each denomination, first
//! tries to cover the whole remaining amount with that denomination alone
//! before taking single units.

use crate::denomination::Denomination;
use crate::inventory::InventoryEntry;
use log::debug;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Units of one denomination handed out by a dispense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    pub denomination: Denomination,

    /// Always at least one.
    pub count: u32,
}

impl PlanLine {
    /// Cash value of this line.
    pub fn amount(&self) -> u64 {
        u64::from(self.denomination.value) * u64::from(self.count)
    }
}

/// Chosen breakdown of a dispense, keyed by face value.
///
/// Denominations that were not used are absent. Iteration yields the
/// highest value first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    lines: BTreeMap<Reverse<u32>, PlanLine>,
}

impl AllocationPlan {
    pub fn new() -> Self {
        AllocationPlan::default()
    }

    /// Records `count` more units of `denomination`.
    fn add(&mut self, denomination: &Denomination, count: u32) {
        if count == 0 {
            return;
        }
        self.lines
            .entry(Reverse(denomination.value))
            .and_modify(|line| line.count += count)
            .or_insert_with(|| PlanLine {
                denomination: denomination.clone(),
                count,
            });
    }

    /// Units of the given face value in this plan, zero if unused.
    pub fn count_of(&self, value: u32) -> u32 {
        self.lines
            .get(&Reverse(value))
            .map(|line| line.count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanLine> {
        self.lines.values()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cash value of the whole plan.
    pub fn total(&self) -> u64 {
        self.lines.values().map(PlanLine::amount).sum()
    }
}

/// Outcome of one allocation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub plan: AllocationPlan,

    /// Portion of the requested amount the entries could not cover.
    pub leftover: u64,
}

impl Allocation {
    /// Returns `true` if the whole amount was covered.
    pub fn is_complete(&self) -> bool {
        self.leftover == 0
    }
}

/// Allocates `amount` from `entries`, which must be sorted by value descending.
///
/// Quantities in `entries` are decremented as units are taken, so the caller
/// must only persist them when `leftover` is zero.
///
/// At each denomination, from the highest down:
/// 1. If the remaining amount is an exact multiple of the value and the unit
///    count is strictly below the quantity on hand, take that many and stop.
///    This shortcut never takes the last unit of a denomination; step 2 may.
/// 2. Otherwise, if a unit is on hand and fits, take one and stay on this
///    denomination.
/// 3. Otherwise move to the next lower value.
///
/// Entries with a zero face value are skipped.
pub fn allocate(amount: u64, entries: &mut [InventoryEntry]) -> Allocation {
    debug_assert!(
        entries.windows(2).all(|w| w[0].value() > w[1].value()),
        "entries must be sorted by value descending"
    );

    let mut plan = AllocationPlan::new();
    let mut remaining = amount;
    let mut idx = 0;

    while remaining > 0 && idx < entries.len() {
        let head = &mut entries[idx];
        let value = u64::from(head.value());
        if value == 0 {
            idx += 1;
            continue;
        }

        if remaining % value == 0 {
            if let Ok(units) = u32::try_from(remaining / value) {
                if units < head.quantity {
                    head.withdraw(units);
                    plan.add(&head.denomination, units);
                    debug!("Covered {} with {} x {}", remaining, units, head.denomination);
                    remaining = 0;
                    break;
                }
            }
        }

        if head.quantity > 0 && remaining >= value {
            head.withdraw(1);
            plan.add(&head.denomination, 1);
            remaining -= value;
        } else {
            idx += 1;
        }
    }

    Allocation {
        plan,
        leftover: remaining,
    }
}
