//! Purchase lot models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::SaleAllocation;
use crate::types::EntityId;

/// A crop lot bought from a farmer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLot {
    pub id: EntityId,
    /// Human-readable lot number (e.g., "LOT-20240315-1A2B3C4D")
    pub lot_number: String,
    pub crop_id: EntityId,
    pub farmer_id: EntityId,
    pub warehouse_id: EntityId,
    pub unit_of_measure_id: EntityId,
    /// Quantity recorded at purchase, in the lot's unit of measure
    pub quantity: Decimal,
    pub buy_price_per_uom: Decimal,
    /// Flat charges paid on top of the purchase price (transport, loading)
    pub other_charges: Decimal,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
}

/// Expense booked against a lot after purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotExpense {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

/// Quality test recorded for a lot. Informational only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotTest {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub test_name: String,
    pub result: Option<String>,
    pub notes: Option<String>,
    pub test_date: NaiveDate,
}

/// Signed correction to a lot's recorded quantity (spoilage, weighing error)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotAdjustment {
    pub id: EntityId,
    pub purchase_lot_id: EntityId,
    pub qty_delta: Decimal,
    pub reason: String,
    pub adjustment_date: NaiveDate,
}

/// A lot together with every record the ledger derives figures from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotDetail {
    pub lot: PurchaseLot,
    pub crop_name: String,
    pub farmer_name: String,
    #[serde(default)]
    pub warehouse_name: String,
    /// Code of the lot's unit of measure (e.g., "KG", "QTL")
    #[serde(default)]
    pub uom_code: String,
    pub expenses: Vec<LotExpense>,
    pub tests: Vec<LotTest>,
    pub adjustments: Vec<LotAdjustment>,
    pub allocations: Vec<SaleAllocation>,
}

impl LotDetail {
    /// A freshly purchased lot with no child records
    pub fn new(lot: PurchaseLot, crop_name: impl Into<String>, farmer_name: impl Into<String>) -> Self {
        Self {
            lot,
            crop_name: crop_name.into(),
            farmer_name: farmer_name.into(),
            warehouse_name: String::new(),
            uom_code: String::new(),
            expenses: Vec::new(),
            tests: Vec::new(),
            adjustments: Vec::new(),
            allocations: Vec::new(),
        }
    }

    /// Attach the names of the warehouse holding the lot and its unit of measure
    pub fn with_storage(mut self, warehouse_name: impl Into<String>, uom_code: impl Into<String>) -> Self {
        self.warehouse_name = warehouse_name.into();
        self.uom_code = uom_code.into();
        self
    }
}

/// Lot as returned to API callers, with derived stock and cost figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLotView {
    #[serde(flatten)]
    pub lot: PurchaseLot,
    pub crop_name: String,
    pub farmer_name: String,
    pub warehouse_name: String,
    pub uom_code: String,
    pub available_qty: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub expenses: Vec<LotExpense>,
    pub tests: Vec<LotTest>,
    pub adjustments: Vec<LotAdjustment>,
}

/// Input for recording a purchase
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseLotRequest {
    pub crop_id: EntityId,
    pub farmer_id: EntityId,
    pub warehouse_id: EntityId,
    pub unit_of_measure_id: EntityId,
    pub quantity: Decimal,
    pub buy_price_per_uom: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
    pub purchase_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for adding a lot expense
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLotExpenseRequest {
    #[validate(length(min = 1, max = 200))]
    pub description: String,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
}

/// Input for adding a lot test
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLotTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub test_name: String,
    pub result: Option<String>,
    pub notes: Option<String>,
    pub test_date: NaiveDate,
}

/// Input for adjusting a lot's quantity
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLotAdjustmentRequest {
    pub qty_delta: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub adjustment_date: NaiveDate,
}
