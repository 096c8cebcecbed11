//! Route definitions for the Crop Ledger API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/purchases", purchase_routes())
        .nest("/sales", sale_routes())
        .nest("/quotes", quote_routes())
        .nest("/reports", report_routes())
}

/// Purchase lot routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        .route("/:lot_id", get(handlers::get_purchase))
        .route("/:lot_id/available", get(handlers::get_available_quantity))
        .route("/:lot_id/expenses", post(handlers::add_lot_expense))
        .route("/:lot_id/tests", post(handlers::add_lot_test))
        .route("/:lot_id/adjustments", post(handlers::add_lot_adjustment))
        .route("/:lot_id/close", post(handlers::close_purchase))
}

/// Sale routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/:sale_id", get(handlers::get_sale))
        .route("/:sale_id/expenses", post(handlers::add_sale_expense))
        .route("/:sale_id/payments", post(handlers::add_payment))
}

/// Price quote routes
fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_quotes).post(handlers::create_quote))
        .route("/latest", get(handlers::get_latest_quote))
}

/// Reporting routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/stock", get(handlers::get_stock_summary))
        .route("/lot-stock", get(handlers::get_lot_stock))
        .route("/profit-preview", get(handlers::get_profit_preview))
        .route("/breakeven", get(handlers::get_break_even))
        .route("/sale-profit/:sale_id", get(handlers::get_sale_profit))
}
