//! Stock, valuation and profit report models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Total open stock for one crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSummary {
    pub crop_id: EntityId,
    pub crop_name: String,
    pub total_available_qty: Decimal,
}

/// Per-lot stock with age and unit cost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotStock {
    pub lot_id: EntityId,
    pub lot_number: String,
    pub crop_id: EntityId,
    pub crop_name: String,
    pub farmer_name: String,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub available_qty: Decimal,
    pub days_since_purchase: i64,
    pub unit_cost: Decimal,
}

/// Weighted-average cost of a crop's remaining stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakEven {
    pub crop_id: EntityId,
    pub crop_name: String,
    pub weighted_avg_cost_per_uom: Decimal,
    pub total_available_qty: Decimal,
}

/// One line of a hypothetical allocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewAllocation {
    pub lot_id: EntityId,
    pub lot_number: String,
    pub qty_from_lot: Decimal,
    pub cost_per_uom: Decimal,
}

/// Result of simulating a sale without persisting it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitPreview {
    pub crop_id: EntityId,
    pub crop_name: String,
    pub sale_qty: Decimal,
    pub sell_price_per_uom: Decimal,
    pub revenue: Decimal,
    pub estimated_cost: Decimal,
    pub estimated_profit: Decimal,
    /// Quantity that open stock could not cover; zero when the sale is fully coverable
    pub shortfall_qty: Decimal,
    pub allocations: Vec<PreviewAllocation>,
}

/// Realised profit of a recorded sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleProfit {
    pub sale_id: EntityId,
    pub crop_name: String,
    pub trader_name: String,
    pub sale_date: NaiveDate,
    pub quantity: Decimal,
    pub sell_price_per_uom: Decimal,
    pub revenue: Decimal,
    pub total_cost: Decimal,
    pub sale_expenses: Decimal,
    pub net_profit: Decimal,
}
