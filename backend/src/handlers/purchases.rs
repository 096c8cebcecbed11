//! HTTP handlers for purchase lot endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::models::{
    CreateLotAdjustmentRequest, CreateLotExpenseRequest, CreateLotTestRequest,
    CreatePurchaseLotRequest, LotAdjustment, LotExpense, LotTest, PurchaseLotView,
};
use crate::services::purchase::{LotAvailability, PurchaseService};
use crate::AppState;
use shared::{EntityId, LotFilter};

fn service(state: AppState) -> PurchaseService {
    PurchaseService::new(state.db, state.config.ledger.lock_timeout_ms)
}

/// Record a purchase lot
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseLotRequest>,
) -> AppResult<(StatusCode, Json<PurchaseLotView>)> {
    let lot = service(state).create_lot(input).await?;
    Ok((StatusCode::CREATED, Json(lot)))
}

/// List purchase lots
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(filter): Query<LotFilter>,
) -> AppResult<Json<Vec<PurchaseLotView>>> {
    let lots = service(state).list_lots(&filter).await?;
    Ok(Json(lots))
}

/// Get a purchase lot by ID
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
) -> AppResult<Json<PurchaseLotView>> {
    let lot = service(state).get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// Get the available quantity of a lot
pub async fn get_available_quantity(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
) -> AppResult<Json<LotAvailability>> {
    let availability = service(state).available_quantity(lot_id).await?;
    Ok(Json(availability))
}

/// Add an expense to a lot
pub async fn add_lot_expense(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
    Json(input): Json<CreateLotExpenseRequest>,
) -> AppResult<(StatusCode, Json<LotExpense>)> {
    let expense = service(state).add_expense(lot_id, input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Add a quality test to a lot
pub async fn add_lot_test(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
    Json(input): Json<CreateLotTestRequest>,
) -> AppResult<(StatusCode, Json<LotTest>)> {
    let test = service(state).add_test(lot_id, input).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

/// Adjust a lot's quantity
pub async fn add_lot_adjustment(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
    Json(input): Json<CreateLotAdjustmentRequest>,
) -> AppResult<(StatusCode, Json<LotAdjustment>)> {
    let adjustment = service(state).add_adjustment(lot_id, input).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

/// Close a lot
pub async fn close_purchase(
    State(state): State<AppState>,
    Path(lot_id): Path<EntityId>,
) -> AppResult<Json<PurchaseLotView>> {
    let lot = service(state).close_lot(lot_id).await?;
    Ok(Json(lot))
}
