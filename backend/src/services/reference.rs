//! Lookups against master reference tables
//!
//! Crops, farmers, traders, warehouses and units of measure are maintained
//! elsewhere; the ledger only checks that referenced ids exist and reads
//! their display names.

use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use shared::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Crop,
    Farmer,
    Trader,
    Warehouse,
    UnitOfMeasure,
}

impl Reference {
    fn table(&self) -> &'static str {
        match self {
            Reference::Crop => "crops",
            Reference::Farmer => "farmers",
            Reference::Trader => "traders",
            Reference::Warehouse => "warehouses",
            Reference::UnitOfMeasure => "units_of_measure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Reference::Crop => "Crop",
            Reference::Farmer => "Farmer",
            Reference::Trader => "Trader",
            Reference::Warehouse => "Warehouse",
            Reference::UnitOfMeasure => "Unit of measure",
        }
    }
}

/// Fail with NotFound unless `id` exists in the reference table
pub async fn ensure_exists(conn: &mut PgConnection, reference: Reference, id: EntityId) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        reference.table()
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await?;

    if !exists {
        return Err(AppError::NotFound(reference.label().to_string()));
    }
    Ok(())
}

/// Display name of a reference record
pub async fn name_of(conn: &mut PgConnection, reference: Reference, id: EntityId) -> AppResult<String> {
    sqlx::query_scalar::<_, String>(&format!(
        "SELECT name FROM {} WHERE id = $1",
        reference.table()
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(reference.label().to_string()))
}
