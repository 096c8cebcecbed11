//! Trader price quote models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::EntityId;

/// Price a trader offered for a crop on a given day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuote {
    pub id: EntityId,
    pub crop_id: EntityId,
    pub crop_name: String,
    pub trader_id: EntityId,
    pub trader_name: String,
    pub price_per_uom: Decimal,
    pub quote_date: NaiveDate,
    pub notes: Option<String>,
    /// Inactive quotes stay listed but are never returned as the latest
    pub is_active: bool,
}

/// Input for recording a quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePriceQuoteRequest {
    pub crop_id: EntityId,
    pub trader_id: EntityId,
    pub price_per_uom: Decimal,
    pub quote_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}
