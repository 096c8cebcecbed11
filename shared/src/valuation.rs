//! Valuation and reporting math
//!
//! Read-only aggregations over fully loaded lots and sales: stock per crop,
//! lot aging, weighted break-even cost and realised sale profit.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::allocation::AllocationPlan;
use crate::error::LedgerResult;
use crate::ledger::{available_quantity, fifo_key, unit_cost};
use crate::models::{
    BreakEven, LotDetail, LotStock, PreviewAllocation, ProfitPreview, SaleDetail, SaleProfit,
    SaleView, StockSummary,
};
use crate::types::EntityId;

/// Open stock per crop, ordered by crop id.
///
/// Every open lot counts toward its crop's total, including lots adjusted
/// below zero. Crops whose total is zero or negative are left out.
pub fn stock_summary(lots: &[LotDetail]) -> Vec<StockSummary> {
    let mut by_crop: BTreeMap<EntityId, StockSummary> = BTreeMap::new();

    for detail in lots.iter().filter(|d| !d.lot.is_closed) {
        let entry = by_crop
            .entry(detail.lot.crop_id)
            .or_insert_with(|| StockSummary {
                crop_id: detail.lot.crop_id,
                crop_name: detail.crop_name.clone(),
                total_available_qty: Decimal::ZERO,
            });
        entry.total_available_qty += available_quantity(detail);
    }

    by_crop
        .into_values()
        .filter(|s| s.total_available_qty > Decimal::ZERO)
        .collect()
}

/// Per-lot stock with its age in whole days as of `today`.
///
/// Only open lots with positive available quantity are listed, oldest first.
pub fn lot_aging(lots: &[LotDetail], today: NaiveDate) -> LedgerResult<Vec<LotStock>> {
    let mut open: Vec<&LotDetail> = lots.iter().filter(|d| !d.lot.is_closed).collect();
    open.sort_by_key(|d| fifo_key(d.lot.purchase_date, d.lot.id));

    let mut rows = Vec::new();
    for detail in open {
        let available_qty = available_quantity(detail);
        if available_qty <= Decimal::ZERO {
            continue;
        }

        rows.push(LotStock {
            lot_id: detail.lot.id,
            lot_number: detail.lot.lot_number.clone(),
            crop_id: detail.lot.crop_id,
            crop_name: detail.crop_name.clone(),
            farmer_name: detail.farmer_name.clone(),
            purchase_date: detail.lot.purchase_date,
            quantity: detail.lot.quantity,
            available_qty,
            days_since_purchase: (today - detail.lot.purchase_date).num_days(),
            unit_cost: unit_cost(detail)?,
        });
    }

    Ok(rows)
}

/// Weighted-average unit cost of a crop's remaining open stock:
/// `Σ(available × unit_cost) / Σ available`, or zero with no stock.
pub fn break_even(lots: &[LotDetail], crop_id: EntityId, crop_name: &str) -> LedgerResult<BreakEven> {
    let mut total_qty = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;

    for detail in lots
        .iter()
        .filter(|d| d.lot.crop_id == crop_id && !d.lot.is_closed)
    {
        let available = available_quantity(detail);
        if available <= Decimal::ZERO {
            continue;
        }
        total_qty += available;
        total_cost += available * unit_cost(detail)?;
    }

    let weighted_avg_cost_per_uom = if total_qty > Decimal::ZERO {
        total_cost / total_qty
    } else {
        Decimal::ZERO
    };

    Ok(BreakEven {
        crop_id,
        crop_name: crop_name.to_string(),
        weighted_avg_cost_per_uom,
        total_available_qty: total_qty,
    })
}

/// Break-even for every crop that still has open stock, ordered by crop id
pub fn break_evens(lots: &[LotDetail]) -> LedgerResult<Vec<BreakEven>> {
    let mut crops: BTreeMap<EntityId, &str> = BTreeMap::new();
    for detail in lots.iter().filter(|d| !d.lot.is_closed) {
        crops.entry(detail.lot.crop_id).or_insert(&detail.crop_name);
    }

    let mut result = Vec::new();
    for (crop_id, crop_name) in crops {
        let entry = break_even(lots, crop_id, crop_name)?;
        if entry.total_available_qty > Decimal::ZERO {
            result.push(entry);
        }
    }
    Ok(result)
}

/// Money totals of a recorded sale, computed from its frozen allocations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaleTotals {
    pub revenue: Decimal,
    pub total_cost: Decimal,
    pub sale_expenses: Decimal,
    pub net_profit: Decimal,
    pub amount_paid: Decimal,
}

pub fn sale_totals(detail: &SaleDetail) -> SaleTotals {
    let revenue = detail.sale.quantity * detail.sale.sell_price_per_uom;
    let total_cost: Decimal = detail.allocations.iter().map(|a| a.cost()).sum();
    let sale_expenses: Decimal = detail.expenses.iter().map(|e| e.amount).sum();
    let amount_paid: Decimal = detail.payments.iter().map(|p| p.amount).sum();

    SaleTotals {
        revenue,
        total_cost,
        sale_expenses,
        net_profit: revenue - total_cost - sale_expenses,
        amount_paid,
    }
}

/// Realised profit of a sale: revenue − allocated cost − sale expenses
pub fn sale_profit(detail: &SaleDetail) -> SaleProfit {
    let totals = sale_totals(detail);

    SaleProfit {
        sale_id: detail.sale.id,
        crop_name: detail.crop_name.clone(),
        trader_name: detail.trader_name.clone(),
        sale_date: detail.sale.sale_date,
        quantity: detail.sale.quantity,
        sell_price_per_uom: detail.sale.sell_price_per_uom,
        revenue: totals.revenue,
        total_cost: totals.total_cost,
        sale_expenses: totals.sale_expenses,
        net_profit: totals.net_profit,
    }
}

pub fn sale_view(detail: SaleDetail) -> SaleView {
    let totals = sale_totals(&detail);

    SaleView {
        sale: detail.sale,
        crop_name: detail.crop_name,
        trader_name: detail.trader_name,
        revenue: totals.revenue,
        total_cost: totals.total_cost,
        sale_expenses: totals.sale_expenses,
        net_profit: totals.net_profit,
        amount_paid: totals.amount_paid,
        balance_due: totals.revenue - totals.amount_paid,
        allocations: detail.allocations,
        expenses: detail.expenses,
        payments: detail.payments,
    }
}

/// Price a simulated allocation
pub fn profit_preview(
    crop_id: EntityId,
    crop_name: &str,
    plan: &AllocationPlan,
    sell_price_per_uom: Decimal,
) -> ProfitPreview {
    let revenue = plan.requested_qty * sell_price_per_uom;

    ProfitPreview {
        crop_id,
        crop_name: crop_name.to_string(),
        sale_qty: plan.requested_qty,
        sell_price_per_uom,
        revenue,
        estimated_cost: plan.estimated_cost,
        estimated_profit: revenue - plan.estimated_cost,
        shortfall_qty: plan.shortfall_qty,
        allocations: plan.allocations.iter().map(PreviewAllocation::from).collect(),
    }
}
