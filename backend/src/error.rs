//! Error handling for the Crop Ledger server
//!
//! Maps engine and persistence failures onto consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::LedgerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Closed lot: {0}")]
    ClosedLotViolation(String),

    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation { field, message } => AppError::Validation { field, message },
            LedgerError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            LedgerError::ClosedLot(lot_id) => {
                AppError::ClosedLotViolation(format!("Lot {} is closed", lot_id))
            }
            LedgerError::DataIntegrity(msg) => AppError::DataIntegrity(msg),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<Decimal>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            available: None,
            requested: None,
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ClosedLotViolation(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::DataIntegrity(_)
            | AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
            },
            AppError::NotFound(resource) => {
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::InsufficientStock {
                available,
                requested,
            } => ErrorDetail {
                available: Some(*available),
                requested: Some(*requested),
                ..ErrorDetail::new("INSUFFICIENT_STOCK", self.to_string())
            },
            AppError::ClosedLotViolation(msg) => ErrorDetail::new("CLOSED_LOT", msg.clone()),
            AppError::DataIntegrity(msg) => ErrorDetail::new("DATA_INTEGRITY", msg.clone()),
            AppError::Timeout => ErrorDetail::new(
                "TIMEOUT",
                "The operation did not complete in time and was rolled back",
            ),
            AppError::Configuration(msg) => {
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg))
            }
            AppError::DatabaseError(_) => {
                ErrorDetail::new("PERSISTENCE_ERROR", "A database error occurred")
            }
            AppError::Internal(msg) => ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_detail = self.detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_http_status() {
        let insufficient: AppError = LedgerError::InsufficientStock {
            available: Decimal::from(10),
            requested: Decimal::from(15),
        }
        .into();
        assert_eq!(insufficient.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            insufficient.to_string(),
            "Insufficient stock. Available: 10, Requested: 15"
        );

        let closed: AppError = LedgerError::ClosedLot(7).into();
        assert_eq!(closed.status_code(), StatusCode::CONFLICT);

        let invalid: AppError = LedgerError::validation("quantity", "quantity must be positive").into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_insufficient_stock_detail_carries_figures() {
        let err = AppError::InsufficientStock {
            available: Decimal::from(10),
            requested: Decimal::from(15),
        };
        let detail = err.detail();
        assert_eq!(detail.code, "INSUFFICIENT_STOCK");
        assert_eq!(detail.available, Some(Decimal::from(10)));
        assert_eq!(detail.requested, Some(Decimal::from(15)));
    }

    #[test]
    fn test_database_errors_hide_details() {
        let err = AppError::DatabaseError(sqlx::Error::RowNotFound);
        let detail = err.detail();
        assert_eq!(detail.code, "PERSISTENCE_ERROR");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_omits_unused_fields() {
        let err = AppError::Validation {
            field: "quantity".to_string(),
            message: "quantity must be positive".to_string(),
        };
        let body = serde_json::to_value(ErrorResponse { error: err.detail() }).unwrap();

        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "quantity");
        assert!(body["error"].get("available").is_none());
    }
}
