//! Sale, allocation and payment models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::EntityId;

/// A sale of crop to a trader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: EntityId,
    pub crop_id: EntityId,
    pub trader_id: EntityId,
    pub quantity: Decimal,
    pub sell_price_per_uom: Decimal,
    pub sale_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Quantity of a sale drawn from one purchase lot.
///
/// `cost_per_uom_at_allocation` is frozen when the row is written and is never
/// recomputed, even if the lot's expenses change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleAllocation {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub purchase_lot_id: EntityId,
    pub lot_number: String,
    pub quantity_allocated: Decimal,
    pub cost_per_uom_at_allocation: Decimal,
}

impl SaleAllocation {
    pub fn cost(&self) -> Decimal {
        self.quantity_allocated * self.cost_per_uom_at_allocation
    }
}

/// Expense booked against a sale (freight, commission)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleExpense {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

/// Payment received from the trader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: EntityId,
    pub sale_id: EntityId,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

/// A sale together with all of its child records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleDetail {
    pub sale: Sale,
    pub crop_name: String,
    pub trader_name: String,
    pub allocations: Vec<SaleAllocation>,
    pub expenses: Vec<SaleExpense>,
    pub payments: Vec<Payment>,
}

/// Sale as returned to API callers, with derived money figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub crop_name: String,
    pub trader_name: String,
    pub revenue: Decimal,
    pub total_cost: Decimal,
    pub sale_expenses: Decimal,
    pub net_profit: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub allocations: Vec<SaleAllocation>,
    pub expenses: Vec<SaleExpense>,
    pub payments: Vec<Payment>,
}

/// Input for creating a sale
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSaleRequest {
    pub crop_id: EntityId,
    pub trader_id: EntityId,
    pub quantity: Decimal,
    pub sell_price_per_uom: Decimal,
    pub sale_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for adding a sale expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSaleExpenseRequest {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

/// Input for recording a payment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    #[validate(length(max = 50))]
    pub payment_method: Option<String>,
    #[validate(length(max = 100))]
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}
