//! Purchase lot service: recording lots and the records attached to them

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CreateLotAdjustmentRequest, CreateLotExpenseRequest, CreateLotTestRequest,
    CreatePurchaseLotRequest, LotAdjustment, LotAdjustmentRow, LotExpense, LotExpenseRow, LotTest,
    LotTestRow, PurchaseLotView,
};
use crate::services::ledger::{self, LotQuery};
use crate::services::reference::{self, Reference};
use shared::{
    ensure_open, lot_view, validate_create_purchase, validate_lot_adjustment, validate_lot_expense,
    validate_lot_test, EntityId, LotFilter,
};

/// Purchase service for managing lots
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    lock_timeout_ms: u64,
}

/// Current available quantity of one lot
#[derive(Debug, Clone, Serialize)]
pub struct LotAvailability {
    pub lot_id: EntityId,
    pub lot_number: String,
    pub is_closed: bool,
    pub available_qty: Decimal,
}

/// Generate a human-readable lot number like `LOT-20240315-1A2B3C4D`
pub fn generate_lot_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("LOT-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    /// Record a new purchase lot
    pub async fn create_lot(&self, input: CreatePurchaseLotRequest) -> AppResult<PurchaseLotView> {
        validate_create_purchase(&input)?;

        let mut tx = self.db.begin().await?;

        reference::ensure_exists(&mut tx, Reference::Crop, input.crop_id).await?;
        reference::ensure_exists(&mut tx, Reference::Farmer, input.farmer_id).await?;
        reference::ensure_exists(&mut tx, Reference::Warehouse, input.warehouse_id).await?;
        reference::ensure_exists(&mut tx, Reference::UnitOfMeasure, input.unit_of_measure_id).await?;

        let lot_number = generate_lot_number();
        let lot_id = sqlx::query_scalar::<_, EntityId>(
            r#"
            INSERT INTO purchase_lots (
                lot_number, crop_id, farmer_id, warehouse_id, unit_of_measure_id,
                quantity, buy_price_per_uom, other_charges, purchase_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&lot_number)
        .bind(input.crop_id)
        .bind(input.farmer_id)
        .bind(input.warehouse_id)
        .bind(input.unit_of_measure_id)
        .bind(input.quantity)
        .bind(input.buy_price_per_uom)
        .bind(input.other_charges)
        .bind(input.purchase_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let detail = ledger::load_lot_detail(&mut tx, lot_id).await?;
        tx.commit().await?;

        tracing::info!(lot_id, %lot_number, quantity = %input.quantity, "Purchase lot recorded");

        Ok(lot_view(&detail)?)
    }

    /// Get a lot with its derived stock and cost figures
    pub async fn get_lot(&self, lot_id: EntityId) -> AppResult<PurchaseLotView> {
        let mut conn = self.db.acquire().await?;
        let detail = ledger::load_lot_detail(&mut conn, lot_id).await?;
        Ok(lot_view(&detail)?)
    }

    /// List lots, newest purchase first
    pub async fn list_lots(&self, filter: &LotFilter) -> AppResult<Vec<PurchaseLotView>> {
        let mut conn = self.db.acquire().await?;
        let details = ledger::load_lot_details(&mut conn, &LotQuery::from(filter)).await?;

        details
            .iter()
            .rev()
            .map(|d| lot_view(d).map_err(AppError::from))
            .collect()
    }

    /// Current available quantity of a lot
    pub async fn available_quantity(&self, lot_id: EntityId) -> AppResult<LotAvailability> {
        let mut conn = self.db.acquire().await?;
        let detail = ledger::load_lot_detail(&mut conn, lot_id).await?;

        Ok(LotAvailability {
            lot_id: detail.lot.id,
            lot_number: detail.lot.lot_number.clone(),
            is_closed: detail.lot.is_closed,
            available_qty: shared::available_quantity(&detail),
        })
    }

    /// Book an expense against a lot. Closed lots still accept expenses.
    pub async fn add_expense(
        &self,
        lot_id: EntityId,
        input: CreateLotExpenseRequest,
    ) -> AppResult<LotExpense> {
        validate_lot_expense(&input)?;
        self.ensure_lot_exists(lot_id).await?;

        let expense = sqlx::query_as::<_, LotExpenseRow>(
            r#"
            INSERT INTO lot_expenses (purchase_lot_id, description, amount, expense_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, purchase_lot_id, description, amount, expense_date
            "#,
        )
        .bind(lot_id)
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.expense_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(lot_id, amount = %expense.amount, "Lot expense recorded");

        Ok(expense.into())
    }

    /// Record a quality test for a lot
    pub async fn add_test(&self, lot_id: EntityId, input: CreateLotTestRequest) -> AppResult<LotTest> {
        validate_lot_test(&input)?;
        self.ensure_lot_exists(lot_id).await?;

        let test = sqlx::query_as::<_, LotTestRow>(
            r#"
            INSERT INTO lot_tests (purchase_lot_id, test_name, result, notes, test_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, purchase_lot_id, test_name, result, notes, test_date
            "#,
        )
        .bind(lot_id)
        .bind(input.test_name.trim())
        .bind(&input.result)
        .bind(&input.notes)
        .bind(input.test_date)
        .fetch_one(&self.db)
        .await?;

        Ok(test.into())
    }

    /// Correct a lot's quantity. The lot row is locked so the adjustment
    /// cannot interleave with a sale allocating from it.
    pub async fn add_adjustment(
        &self,
        lot_id: EntityId,
        input: CreateLotAdjustmentRequest,
    ) -> AppResult<LotAdjustment> {
        validate_lot_adjustment(&input)?;

        let mut tx = self.db.begin().await?;
        ledger::set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let detail = ledger::lock_lot(&mut tx, lot_id).await?;
        ensure_open(&detail)?;

        let adjustment = sqlx::query_as::<_, LotAdjustmentRow>(
            r#"
            INSERT INTO lot_adjustments (purchase_lot_id, qty_delta, reason, adjustment_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, purchase_lot_id, qty_delta, reason, adjustment_date
            "#,
        )
        .bind(lot_id)
        .bind(input.qty_delta)
        .bind(input.reason.trim())
        .bind(input.adjustment_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(lot_id, qty_delta = %adjustment.qty_delta, "Lot adjusted");

        Ok(adjustment.into())
    }

    /// Close a lot. Closing is irreversible; a closed lot keeps its history
    /// but no longer takes adjustments or allocations.
    pub async fn close_lot(&self, lot_id: EntityId) -> AppResult<PurchaseLotView> {
        let mut tx = self.db.begin().await?;
        ledger::set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let detail = ledger::lock_lot(&mut tx, lot_id).await?;
        ensure_open(&detail)?;

        sqlx::query("UPDATE purchase_lots SET is_closed = TRUE WHERE id = $1")
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;

        let detail = ledger::load_lot_detail(&mut tx, lot_id).await?;
        tx.commit().await?;

        tracing::info!(lot_id, "Lot closed");

        Ok(lot_view(&detail)?)
    }

    async fn ensure_lot_exists(&self, lot_id: EntityId) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_lots WHERE id = $1)",
        )
        .bind(lot_id)
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Purchase lot".to_string()));
        }
        Ok(())
    }
}
