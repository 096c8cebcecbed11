//! Lot ledger
//!
//! Derives a lot's available quantity and unit cost from its recorded data.
//! Every figure is recomputed from the records on each call so it always
//! reflects the latest adjustments, expenses and allocations.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{LotDetail, PurchaseLotView};
use crate::types::{EntityId, DECIMAL_SCALE};

/// An open lot that can supply a sale, with its figures at read time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EligibleLot {
    pub lot_id: EntityId,
    pub lot_number: String,
    pub purchase_date: NaiveDate,
    pub available_qty: Decimal,
    pub unit_cost: Decimal,
}

/// Recorded quantity plus adjustments minus everything already allocated
pub fn available_quantity(detail: &LotDetail) -> Decimal {
    let adjusted: Decimal = detail.adjustments.iter().map(|a| a.qty_delta).sum();
    let allocated: Decimal = detail
        .allocations
        .iter()
        .map(|a| a.quantity_allocated)
        .sum();

    detail.lot.quantity + adjusted - allocated
}

/// Sum of all expenses booked against the lot
pub fn total_expenses(detail: &LotDetail) -> Decimal {
    detail.expenses.iter().map(|e| e.amount).sum()
}

/// Per-unit cost of a lot: purchase price plus ancillary costs spread over
/// the recorded quantity
pub fn unit_cost(detail: &LotDetail) -> LedgerResult<Decimal> {
    unit_cost_from_parts(
        detail.lot.buy_price_per_uom,
        detail.lot.other_charges,
        total_expenses(detail),
        detail.lot.quantity,
    )
    .ok_or_else(|| {
        LedgerError::DataIntegrity(format!(
            "lot {} has zero recorded quantity",
            detail.lot.id
        ))
    })
}

/// Unit cost formula: `buy_price + (other_charges + expenses) / recorded_quantity`.
///
/// Ancillary costs are divided by the recorded quantity, not the available
/// quantity, so a lot's unit cost does not rise as it depletes. The result
/// is rounded half away from zero to [`DECIMAL_SCALE`] places, the scale an
/// allocation stores it at, so previews and recorded sales agree.
/// Returns `None` when the recorded quantity is zero.
pub fn unit_cost_from_parts(
    buy_price_per_uom: Decimal,
    other_charges: Decimal,
    total_expenses: Decimal,
    recorded_quantity: Decimal,
) -> Option<Decimal> {
    (other_charges + total_expenses)
        .checked_div(recorded_quantity)
        .map(|ancillary| {
            (buy_price_per_uom + ancillary)
                .round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::MidpointAwayFromZero)
        })
}

/// Total money sunk into a lot: purchase price, charges and expenses
pub fn lot_total_cost(detail: &LotDetail) -> Decimal {
    detail.lot.buy_price_per_uom * detail.lot.quantity
        + detail.lot.other_charges
        + total_expenses(detail)
}

/// Allocation order key: purchase date, then lot id.
///
/// The id tie-break keeps lots bought on the same day in insertion order.
pub fn fifo_key(purchase_date: NaiveDate, lot_id: EntityId) -> (NaiveDate, EntityId) {
    (purchase_date, lot_id)
}

/// Sort lots into allocation order
pub fn sort_fifo(lots: &mut [EligibleLot]) {
    lots.sort_by_key(|l| fifo_key(l.purchase_date, l.lot_id));
}

/// Lots of `crop_id` that can be allocated from, oldest first.
///
/// Closed lots and lots with nothing available are skipped. The input order
/// does not matter.
pub fn eligible_lots(lots: &[LotDetail], crop_id: EntityId) -> LedgerResult<Vec<EligibleLot>> {
    let mut eligible = Vec::new();

    for detail in lots
        .iter()
        .filter(|d| d.lot.crop_id == crop_id && !d.lot.is_closed)
    {
        let available_qty = available_quantity(detail);
        if available_qty <= Decimal::ZERO {
            continue;
        }

        eligible.push(EligibleLot {
            lot_id: detail.lot.id,
            lot_number: detail.lot.lot_number.clone(),
            purchase_date: detail.lot.purchase_date,
            available_qty,
            unit_cost: unit_cost(detail)?,
        });
    }

    sort_fifo(&mut eligible);
    Ok(eligible)
}

/// Reject changes to the lot's stock once it is closed
pub fn ensure_open(detail: &LotDetail) -> LedgerResult<()> {
    if detail.lot.is_closed {
        return Err(LedgerError::ClosedLot(detail.lot.id));
    }
    Ok(())
}

/// Build the API view of a lot
pub fn lot_view(detail: &LotDetail) -> LedgerResult<PurchaseLotView> {
    Ok(PurchaseLotView {
        lot: detail.lot.clone(),
        crop_name: detail.crop_name.clone(),
        farmer_name: detail.farmer_name.clone(),
        warehouse_name: detail.warehouse_name.clone(),
        uom_code: detail.uom_code.clone(),
        available_qty: available_quantity(detail),
        unit_cost: unit_cost(detail)?,
        total_cost: lot_total_cost(detail),
        expenses: detail.expenses.clone(),
        tests: detail.tests.clone(),
        adjustments: detail.adjustments.clone(),
    })
}
