//! HTTP handlers for sale endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::models::{
    CreatePaymentRequest, CreateSaleExpenseRequest, CreateSaleRequest, Payment, SaleExpense,
    SaleView,
};
use crate::services::SaleService;
use crate::AppState;
use shared::{EntityId, SaleFilter};

fn service(state: AppState) -> SaleService {
    SaleService::new(state.db, state.config.ledger.lock_timeout_ms)
}

/// Record a sale with FIFO allocations
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleRequest>,
) -> AppResult<(StatusCode, Json<SaleView>)> {
    let sale = service(state).create_sale_with_allocations(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List sales
pub async fn list_sales(
    State(state): State<AppState>,
    Query(filter): Query<SaleFilter>,
) -> AppResult<Json<Vec<SaleView>>> {
    let sales = service(state).list_sales(&filter).await?;
    Ok(Json(sales))
}

/// Get a sale by ID
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<EntityId>,
) -> AppResult<Json<SaleView>> {
    let sale = service(state).get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Add an expense to a sale
pub async fn add_sale_expense(
    State(state): State<AppState>,
    Path(sale_id): Path<EntityId>,
    Json(input): Json<CreateSaleExpenseRequest>,
) -> AppResult<(StatusCode, Json<SaleExpense>)> {
    let expense = service(state).add_expense(sale_id, input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Record a payment for a sale
pub async fn add_payment(
    State(state): State<AppState>,
    Path(sale_id): Path<EntityId>,
    Json(input): Json<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    let payment = service(state).add_payment(sale_id, input).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
