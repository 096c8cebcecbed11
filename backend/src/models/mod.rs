//! Database models for the Crop Ledger server
//!
//! Re-exports models from the shared crate and adds the row types the
//! services decode query results into.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

pub use shared::models::*;
use shared::EntityId;

/// Purchase lot joined with its crop, farmer, warehouse and unit names
#[derive(Debug, FromRow)]
pub struct LotRow {
    pub id: EntityId,
    pub lot_number: String,
    pub crop_id: EntityId,
    pub farmer_id: EntityId,
    pub warehouse_id: EntityId,
    pub unit_of_measure_id: EntityId,
    pub quantity: Decimal,
    pub buy_price_per_uom: Decimal,
    pub other_charges: Decimal,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub crop_name: String,
    pub farmer_name: String,
    pub warehouse_name: String,
    pub uom_code: String,
}

impl From<LotRow> for LotDetail {
    fn from(row: LotRow) -> Self {
        LotDetail::new(
            PurchaseLot {
                id: row.id,
                lot_number: row.lot_number,
                crop_id: row.crop_id,
                farmer_id: row.farmer_id,
                warehouse_id: row.warehouse_id,
                unit_of_measure_id: row.unit_of_measure_id,
                quantity: row.quantity,
                buy_price_per_uom: row.buy_price_per_uom,
                other_charges: row.other_charges,
                purchase_date: row.purchase_date,
                notes: row.notes,
                is_closed: row.is_closed,
                created_at: row.created_at,
            },
            row.crop_name,
            row.farmer_name,
        )
        .with_storage(row.warehouse_name, row.uom_code)
    }
}

#[derive(Debug, FromRow)]
pub struct LotExpenseRow {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

impl From<LotExpenseRow> for LotExpense {
    fn from(row: LotExpenseRow) -> Self {
        Self {
            id: row.id,
            purchase_lot_id: row.purchase_lot_id,
            description: row.description,
            amount: row.amount,
            expense_date: row.expense_date,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LotTestRow {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub test_name: String,
    pub result: Option<String>,
    pub notes: Option<String>,
    pub test_date: NaiveDate,
}

impl From<LotTestRow> for LotTest {
    fn from(row: LotTestRow) -> Self {
        Self {
            id: row.id,
            purchase_lot_id: row.purchase_lot_id,
            test_name: row.test_name,
            result: row.result,
            notes: row.notes,
            test_date: row.test_date,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LotAdjustmentRow {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub qty_delta: Decimal,
    pub reason: String,
    pub adjustment_date: NaiveDate,
}

impl From<LotAdjustmentRow> for LotAdjustment {
    fn from(row: LotAdjustmentRow) -> Self {
        Self {
            id: row.id,
            purchase_lot_id: row.purchase_lot_id,
            qty_delta: row.qty_delta,
            reason: row.reason,
            adjustment_date: row.adjustment_date,
        }
    }
}

/// Allocation joined with the lot number it drew from
#[derive(Debug, FromRow)]
pub struct SaleAllocationRow {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub purchase_lot_id: EntityId,
    pub lot_number: String,
    pub quantity_allocated: Decimal,
    pub cost_per_uom_at_allocation: Decimal,
}

impl From<SaleAllocationRow> for SaleAllocation {
    fn from(row: SaleAllocationRow) -> Self {
        Self {
            id: row.id,
            sale_id: row.sale_id,
            purchase_lot_id: row.purchase_lot_id,
            lot_number: row.lot_number,
            quantity_allocated: row.quantity_allocated,
            cost_per_uom_at_allocation: row.cost_per_uom_at_allocation,
        }
    }
}

/// Sale joined with its crop and trader names
#[derive(Debug, FromRow)]
pub struct SaleRow {
    pub id: EntityId,
    pub crop_id: EntityId,
    pub trader_id: EntityId,
    pub quantity: Decimal,
    pub sell_price_per_uom: Decimal,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub crop_name: String,
    pub trader_name: String,
}

impl From<SaleRow> for SaleDetail {
    fn from(row: SaleRow) -> Self {
        SaleDetail {
            sale: Sale {
                id: row.id,
                crop_id: row.crop_id,
                trader_id: row.trader_id,
                quantity: row.quantity,
                sell_price_per_uom: row.sell_price_per_uom,
                sale_date: row.sale_date,
                notes: row.notes,
                created_at: row.created_at,
            },
            crop_name: row.crop_name,
            trader_name: row.trader_name,
            allocations: Vec::new(),
            expenses: Vec::new(),
            payments: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SaleExpenseRow {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

impl From<SaleExpenseRow> for SaleExpense {
    fn from(row: SaleExpenseRow) -> Self {
        Self {
            id: row.id,
            sale_id: row.sale_id,
            description: row.description,
            amount: row.amount,
            expense_date: row.expense_date,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentRow {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            sale_id: row.sale_id,
            amount: row.amount,
            payment_date: row.payment_date,
            payment_method: row.payment_method,
            reference_number: row.reference_number,
            notes: row.notes,
        }
    }
}

/// Quote joined with its crop and trader names
#[derive(Debug, FromRow)]
pub struct PriceQuoteRow {
    pub id: EntityId,
    pub crop_id: EntityId,
    pub crop_name: String,
    pub trader_id: EntityId,
    pub trader_name: String,
    pub price_per_uom: Decimal,
    pub quote_date: NaiveDate,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl From<PriceQuoteRow> for PriceQuote {
    fn from(row: PriceQuoteRow) -> Self {
        Self {
            id: row.id,
            crop_id: row.crop_id,
            crop_name: row.crop_name,
            trader_id: row.trader_id,
            trader_name: row.trader_name,
            price_per_uom: row.price_per_uom,
            quote_date: row.quote_date,
            notes: row.notes,
            is_active: row.is_active,
        }
    }
}
