//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row identity assigned by the database.
///
/// Identities are allocated from a sequence, so ascending ids follow
/// insertion order. The allocator relies on this for its tie-break.
pub type EntityId = i64;

/// Decimal places stored for every quantity, price and amount column
pub const DECIMAL_SCALE: u32 = 4;

/// Filter for listing purchase lots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotFilter {
    pub crop_id: Option<EntityId>,
    pub farmer_id: Option<EntityId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Filter for listing sales
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    pub crop_id: Option<EntityId>,
    pub trader_id: Option<EntityId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Filter for listing price quotes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteFilter {
    pub crop_id: Option<EntityId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Output format for report endpoints
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}
