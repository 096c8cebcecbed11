//! Business logic services for the Crop Ledger server

pub mod ledger;
pub mod purchase;
pub mod quote;
pub mod reference;
pub mod reporting;
pub mod sale;

pub use purchase::PurchaseService;
pub use quote::QuoteService;
pub use reporting::ReportingService;
pub use sale::SaleService;

#[cfg(test)]
mod db_tests;
