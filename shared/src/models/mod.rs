//! Domain models for the Crop Ledger platform

mod purchase;
mod quote;
mod report;
mod sale;

pub use purchase::*;
pub use quote::*;
pub use report::*;
pub use sale::*;
