//! Reporting handlers for stock valuation and profit analysis
//!
//! Every report can be returned as CSV with `format=csv`.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::services::{ReportingService, SaleService};
use crate::AppState;
use shared::{EntityId, ReportFormat};

#[derive(Deserialize)]
pub struct CropReportQuery {
    pub crop_id: Option<EntityId>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Deserialize)]
pub struct ProfitPreviewQuery {
    pub crop_id: EntityId,
    pub qty: Decimal,
    pub sell_price: Decimal,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

fn reporting(state: AppState) -> ReportingService {
    ReportingService::new(state.db, state.clock)
}

/// Render report rows as JSON or as a CSV attachment
fn respond<T: Serialize, R: Serialize>(
    format: ReportFormat,
    filename: &str,
    data: T,
    rows: &[R],
) -> AppResult<Response> {
    match format {
        ReportFormat::Csv => {
            let csv = ReportingService::export_to_csv(rows)?;
            let disposition = format!("attachment; filename=\"{}.csv\"", filename);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response())
        }
        ReportFormat::Json => Ok(Json(data).into_response()),
    }
}

/// Get open stock per crop
pub async fn get_stock_summary(
    State(state): State<AppState>,
    Query(query): Query<CropReportQuery>,
) -> AppResult<Response> {
    let data = reporting(state).stock_summary(query.crop_id).await?;
    respond(query.format, "stock_summary", &data, &data)
}

/// Get per-lot stock with aging
pub async fn get_lot_stock(
    State(state): State<AppState>,
    Query(query): Query<CropReportQuery>,
) -> AppResult<Response> {
    let data = reporting(state).lot_aging(query.crop_id).await?;
    respond(query.format, "lot_stock", &data, &data)
}

/// Preview the FIFO cost and profit of a hypothetical sale.
///
/// As CSV, one row per lot the sale would draw from.
pub async fn get_profit_preview(
    State(state): State<AppState>,
    Query(query): Query<ProfitPreviewQuery>,
) -> AppResult<Response> {
    let service = SaleService::new(state.db, state.config.ledger.lock_timeout_ms);
    let preview = service
        .preview_profit(query.crop_id, query.qty, query.sell_price)
        .await?;
    respond(query.format, "profit_preview", &preview, &preview.allocations)
}

/// Get break-even cost for one crop, or for every crop with stock
pub async fn get_break_even(
    State(state): State<AppState>,
    Query(query): Query<CropReportQuery>,
) -> AppResult<Response> {
    let service = reporting(state);
    match query.crop_id {
        Some(crop_id) => {
            let data = service.break_even(crop_id).await?;
            respond(query.format, "break_even", &data, std::slice::from_ref(&data))
        }
        None => {
            let data = service.all_break_evens().await?;
            respond(query.format, "break_even", &data, &data)
        }
    }
}

/// Get realised profit of a recorded sale
pub async fn get_sale_profit(
    State(state): State<AppState>,
    Path(sale_id): Path<EntityId>,
    Query(query): Query<FormatQuery>,
) -> AppResult<Response> {
    let data = reporting(state).sale_profit(sale_id).await?;
    respond(query.format, "sale_profit", &data, std::slice::from_ref(&data))
}
