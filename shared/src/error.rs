//! Errors raised by the inventory engine

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::EntityId;

/// Engine error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Insufficient stock. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Lot {0} is closed")]
    ClosedLot(EntityId),

    /// Stored data breaks a ledger invariant (e.g. a lot with zero recorded quantity)
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),
}

impl LedgerError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for engine operations
pub type LedgerResult<T> = Result<T, LedgerError>;
