//! Reporting service: stock, aging, break-even and profit reports
//!
//! Read-only. Lots are loaded fully populated and handed to the valuation
//! functions in `shared`, so reports use the same formulas as allocation.

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::models::{BreakEven, LotStock, SaleProfit, StockSummary};
use crate::services::ledger::{self, LotQuery};
use crate::services::reference::{self, Reference};
use crate::services::sale::load_sale_detail;
use shared::{break_even, break_evens, lot_aging, sale_profit, stock_summary, EntityId};

/// Reporting service for stock valuation and profit analysis
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    clock: Arc<dyn Clock>,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Open stock per crop
    pub async fn stock_summary(&self, crop_id: Option<EntityId>) -> AppResult<Vec<StockSummary>> {
        let mut conn = self.db.acquire().await?;
        let lots = ledger::load_lot_details(&mut conn, &LotQuery::open_for_crop(crop_id)).await?;
        Ok(stock_summary(&lots))
    }

    /// Open lots with stock left, oldest first, aged against the clock
    pub async fn lot_aging(&self, crop_id: Option<EntityId>) -> AppResult<Vec<LotStock>> {
        let mut conn = self.db.acquire().await?;
        let lots = ledger::load_lot_details(&mut conn, &LotQuery::open_for_crop(crop_id)).await?;
        Ok(lot_aging(&lots, self.clock.today())?)
    }

    /// Weighted-average cost of one crop's open stock
    pub async fn break_even(&self, crop_id: EntityId) -> AppResult<BreakEven> {
        let mut conn = self.db.acquire().await?;
        let crop_name = reference::name_of(&mut conn, Reference::Crop, crop_id).await?;
        let lots =
            ledger::load_lot_details(&mut conn, &LotQuery::open_for_crop(Some(crop_id))).await?;
        Ok(break_even(&lots, crop_id, &crop_name)?)
    }

    /// Break-even for every crop with open stock
    pub async fn all_break_evens(&self) -> AppResult<Vec<BreakEven>> {
        let mut conn = self.db.acquire().await?;
        let lots = ledger::load_lot_details(&mut conn, &LotQuery::open_for_crop(None)).await?;
        Ok(break_evens(&lots)?)
    }

    /// Realised profit of a recorded sale
    pub async fn sale_profit(&self, sale_id: EntityId) -> AppResult<SaleProfit> {
        let mut conn = self.db.acquire().await?;
        let detail = load_sale_detail(&mut conn, sale_id).await?;
        Ok(sale_profit(&detail))
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
