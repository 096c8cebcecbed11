//! FIFO allocation planning
//!
//! Splits a requested quantity across eligible lots oldest-first. Both the
//! persisting sale path and the read-only profit preview run the same loop in
//! [`simulate`], so a preview followed by a real sale over unchanged stock
//! yields the same breakdown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::EligibleLot;
use crate::models::PreviewAllocation;
use crate::types::EntityId;
use crate::validation::validate_positive;

/// Quantity to take from one lot, at the lot's unit cost when planned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedAllocation {
    pub lot_id: EntityId,
    pub lot_number: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

impl PlannedAllocation {
    pub fn cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

impl From<&PlannedAllocation> for PreviewAllocation {
    fn from(planned: &PlannedAllocation) -> Self {
        Self {
            lot_id: planned.lot_id,
            lot_number: planned.lot_number.clone(),
            qty_from_lot: planned.quantity,
            cost_per_uom: planned.unit_cost,
        }
    }
}

/// Outcome of running the allocation loop over a set of lots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationPlan {
    pub requested_qty: Decimal,
    pub allocations: Vec<PlannedAllocation>,
    pub allocated_qty: Decimal,
    pub shortfall_qty: Decimal,
    pub estimated_cost: Decimal,
}

impl AllocationPlan {
    pub fn is_complete(&self) -> bool {
        self.shortfall_qty <= Decimal::ZERO
    }
}

/// Walk `lots` in the given order taking `min(remaining, available)` from
/// each until the request is covered or the lots run out.
///
/// Never fails: a request larger than the stock yields a plan with a
/// positive `shortfall_qty`. `lots` must already be in FIFO order
/// (see [`crate::ledger::eligible_lots`]).
pub fn simulate(lots: &[EligibleLot], requested: Decimal) -> AllocationPlan {
    let mut allocations = Vec::new();
    let mut remaining = requested;

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.available_qty <= Decimal::ZERO {
            continue;
        }

        let quantity = remaining.min(lot.available_qty);
        allocations.push(PlannedAllocation {
            lot_id: lot.lot_id,
            lot_number: lot.lot_number.clone(),
            quantity,
            unit_cost: lot.unit_cost,
        });
        remaining -= quantity;
    }

    let allocated_qty: Decimal = allocations.iter().map(|a| a.quantity).sum();
    let estimated_cost: Decimal = allocations.iter().map(PlannedAllocation::cost).sum();

    AllocationPlan {
        requested_qty: requested,
        allocations,
        allocated_qty,
        shortfall_qty: remaining.max(Decimal::ZERO),
        estimated_cost,
    }
}

/// Plan a sale of `requested` units, failing unless it is fully covered.
///
/// On failure no allocation is returned at all; the error reports the total
/// available across `lots` against the request.
pub fn allocate(lots: &[EligibleLot], requested: Decimal) -> LedgerResult<Vec<PlannedAllocation>> {
    validate_positive("quantity", requested)?;

    let plan = simulate(lots, requested);
    if !plan.is_complete() {
        let available: Decimal = lots
            .iter()
            .map(|l| l.available_qty)
            .filter(|q| *q > Decimal::ZERO)
            .sum();
        return Err(LedgerError::InsufficientStock {
            available,
            requested,
        });
    }

    Ok(plan.allocations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn eligible(id: EntityId, day: u32, available: &str, cost: &str) -> EligibleLot {
        EligibleLot {
            lot_id: id,
            lot_number: format!("LOT-{}", id),
            purchase_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            available_qty: dec(available),
            unit_cost: dec(cost),
        }
    }

    #[test]
    fn test_allocate_takes_oldest_lot_first() {
        let lots = vec![eligible(1, 1, "10", "8"), eligible(2, 2, "10", "9")];

        let allocations = allocate(&lots, dec("15")).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].lot_id, 1);
        assert_eq!(allocations[0].quantity, dec("10"));
        assert_eq!(allocations[1].lot_id, 2);
        assert_eq!(allocations[1].quantity, dec("5"));
        let cost: Decimal = allocations.iter().map(PlannedAllocation::cost).sum();
        assert_eq!(cost, dec("125"));
    }

    #[test]
    fn test_allocate_stops_once_covered() {
        let lots = vec![
            eligible(1, 1, "10", "8"),
            eligible(2, 2, "10", "9"),
            eligible(3, 3, "10", "9"),
        ];

        let allocations = allocate(&lots, dec("10")).unwrap();
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].quantity, dec("10"));
    }

    #[test]
    fn test_allocate_insufficient_stock_reports_totals() {
        let lots = vec![eligible(1, 1, "4", "8"), eligible(2, 2, "6", "9")];

        let err = allocate(&lots, dec("15")).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: dec("10"),
                requested: dec("15"),
            }
        );
    }

    #[test]
    fn test_allocate_rejects_non_positive_quantity() {
        let lots = vec![eligible(1, 1, "10", "8")];
        assert!(matches!(
            allocate(&lots, Decimal::ZERO),
            Err(LedgerError::Validation { .. })
        ));
        assert!(matches!(
            allocate(&lots, dec("-1")),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn test_simulate_reports_shortfall_without_failing() {
        let lots = vec![eligible(1, 1, "10", "8")];

        let plan = simulate(&lots, dec("12.5"));
        assert!(!plan.is_complete());
        assert_eq!(plan.allocated_qty, dec("10"));
        assert_eq!(plan.shortfall_qty, dec("2.5"));
        assert_eq!(plan.estimated_cost, dec("80"));
    }

    #[test]
    fn test_simulate_with_no_lots() {
        let plan = simulate(&[], dec("5"));
        assert!(plan.allocations.is_empty());
        assert_eq!(plan.shortfall_qty, dec("5"));
        assert_eq!(plan.estimated_cost, Decimal::ZERO);
    }
}
