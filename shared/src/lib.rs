//! Shared types and inventory engine for the Crop Ledger platform
//!
//! This crate holds the domain models and the pure ledger logic (available
//! stock, unit cost, FIFO allocation, valuation). It performs no I/O so the
//! backend, the WASM client and the test suites all compute figures the
//! same way.

pub mod allocation;
pub mod error;
pub mod ledger;
pub mod models;
pub mod types;
pub mod validation;
pub mod valuation;

pub use allocation::*;
pub use error::*;
pub use ledger::*;
pub use models::*;
pub use types::*;
pub use validation::*;
pub use valuation::*;
