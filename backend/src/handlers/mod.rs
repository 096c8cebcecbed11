//! HTTP handlers for the Crop Ledger API

pub mod health;
pub mod purchases;
pub mod quotes;
pub mod reports;
pub mod sales;

pub use health::*;
pub use purchases::*;
pub use quotes::*;
pub use reports::*;
pub use sales::*;
