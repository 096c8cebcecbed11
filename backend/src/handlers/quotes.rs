//! HTTP handlers for price quote endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{CreatePriceQuoteRequest, PriceQuote};
use crate::services::QuoteService;
use crate::AppState;
use shared::{EntityId, QuoteFilter};

#[derive(Debug, Deserialize)]
pub struct LatestQuoteQuery {
    pub crop_id: EntityId,
}

/// Record a price quote
pub async fn create_quote(
    State(state): State<AppState>,
    Json(input): Json<CreatePriceQuoteRequest>,
) -> AppResult<(StatusCode, Json<PriceQuote>)> {
    let quote = QuoteService::new(state.db).create_quote(input).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

/// List price quotes
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(filter): Query<QuoteFilter>,
) -> AppResult<Json<Vec<PriceQuote>>> {
    let quotes = QuoteService::new(state.db).list_quotes(&filter).await?;
    Ok(Json(quotes))
}

/// Latest active quote for a crop
pub async fn get_latest_quote(
    State(state): State<AppState>,
    Query(query): Query<LatestQuoteQuery>,
) -> AppResult<Json<PriceQuote>> {
    let quote = QuoteService::new(state.db).latest_quote(query.crop_id).await?;
    Ok(Json(quote))
}
