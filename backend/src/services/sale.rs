//! Sale service: FIFO allocation of sales against purchase lots
//!
//! A sale and all of its allocations are written in one transaction while
//! the crop's open lots are row-locked, so two sales can never draw the same
//! stock. Profit previews run the same planner over an unlocked read.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::models::{
    CreatePaymentRequest, CreateSaleExpenseRequest, CreateSaleRequest, Payment, PaymentRow,
    ProfitPreview, SaleAllocationRow, SaleDetail, SaleExpense, SaleExpenseRow, SaleRow, SaleView,
};
use crate::services::ledger::{self, LotQuery};
use crate::services::reference::{self, Reference};
use shared::{
    allocate, eligible_lots, profit_preview, sale_view, simulate, validate_create_sale,
    validate_payment, validate_profit_preview, validate_sale_expense, EntityId, LedgerError,
    SaleFilter,
};

const SALE_SELECT: &str = r#"
    SELECT s.id, s.crop_id, s.trader_id, s.quantity, s.sell_price_per_uom, s.sale_date,
           s.notes, s.created_at, c.name AS crop_name, t.name AS trader_name
    FROM sales s
    JOIN crops c ON c.id = s.crop_id
    JOIN traders t ON t.id = s.trader_id
"#;

/// Sale service for recording and pricing sales
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    /// Record a sale, allocating its quantity across the crop's open lots
    /// oldest first.
    ///
    /// Either the sale and every allocation are committed together or
    /// nothing is written. Each allocation freezes the lot's unit cost at
    /// this moment.
    #[tracing::instrument(skip(self, input), fields(crop_id = input.crop_id, quantity = %input.quantity))]
    pub async fn create_sale_with_allocations(&self, input: CreateSaleRequest) -> AppResult<SaleView> {
        validate_create_sale(&input)?;

        let mut tx = self.db.begin().await?;
        ledger::set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        reference::ensure_exists(&mut tx, Reference::Crop, input.crop_id).await?;
        reference::ensure_exists(&mut tx, Reference::Trader, input.trader_id).await?;

        let lots = ledger::lock_open_lots_for_crop(&mut tx, input.crop_id).await?;
        let eligible = eligible_lots(&lots, input.crop_id)?;

        let planned = match allocate(&eligible, input.quantity) {
            Ok(planned) => planned,
            Err(LedgerError::InsufficientStock {
                available,
                requested,
            }) => {
                tracing::warn!(%available, %requested, "Sale rejected: insufficient stock");
                return Err(AppError::InsufficientStock {
                    available,
                    requested,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let sale_id = sqlx::query_scalar::<_, EntityId>(
            r#"
            INSERT INTO sales (crop_id, trader_id, quantity, sell_price_per_uom, sale_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.crop_id)
        .bind(input.trader_id)
        .bind(input.quantity)
        .bind(input.sell_price_per_uom)
        .bind(input.sale_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        for allocation in &planned {
            sqlx::query(
                r#"
                INSERT INTO sale_allocations (
                    sale_id, purchase_lot_id, quantity_allocated, cost_per_uom_at_allocation
                )
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(sale_id)
            .bind(allocation.lot_id)
            .bind(allocation.quantity)
            .bind(allocation.unit_cost)
            .execute(&mut *tx)
            .await
            .map_err(map_allocation_error)?;
        }

        let detail = load_sale_detail(&mut tx, sale_id).await?;
        tx.commit().await?;

        tracing::info!(
            sale_id,
            lots = planned.len(),
            "Sale recorded with FIFO allocations"
        );

        Ok(sale_view(detail))
    }

    /// Price a hypothetical sale against current stock without writing
    /// anything or taking locks.
    ///
    /// A quantity larger than the open stock is not an error: the preview
    /// covers what it can and reports the rest as `shortfall_qty`.
    #[tracing::instrument(skip(self))]
    pub async fn preview_profit(
        &self,
        crop_id: EntityId,
        qty: Decimal,
        sell_price: Decimal,
    ) -> AppResult<ProfitPreview> {
        validate_profit_preview(crop_id, qty, sell_price)?;

        let mut conn = self.db.acquire().await?;
        let crop_name = reference::name_of(&mut conn, Reference::Crop, crop_id).await?;
        let lots =
            ledger::load_lot_details(&mut conn, &LotQuery::open_for_crop(Some(crop_id))).await?;

        let plan = simulate(&eligible_lots(&lots, crop_id)?, qty);
        if !plan.is_complete() {
            tracing::debug!(shortfall = %plan.shortfall_qty, "Preview exceeds open stock");
        }

        Ok(profit_preview(crop_id, &crop_name, &plan, sell_price))
    }

    /// Get a sale with allocations, expenses, payments and totals
    pub async fn get_sale(&self, sale_id: EntityId) -> AppResult<SaleView> {
        let mut conn = self.db.acquire().await?;
        let detail = load_sale_detail(&mut conn, sale_id).await?;
        Ok(sale_view(detail))
    }

    /// List sales, newest first
    pub async fn list_sales(&self, filter: &SaleFilter) -> AppResult<Vec<SaleView>> {
        let mut conn = self.db.acquire().await?;
        let sql = format!(
            r#"{}
            WHERE ($1::BIGINT IS NULL OR s.crop_id = $1)
              AND ($2::BIGINT IS NULL OR s.trader_id = $2)
              AND ($3::DATE IS NULL OR s.sale_date >= $3)
              AND ($4::DATE IS NULL OR s.sale_date <= $4)
            ORDER BY s.sale_date DESC, s.id DESC
            "#,
            SALE_SELECT
        );

        let rows = sqlx::query_as::<_, SaleRow>(&sql)
            .bind(filter.crop_id)
            .bind(filter.trader_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&mut *conn)
            .await?;

        let details = attach_children(&mut conn, rows).await?;
        Ok(details.into_iter().map(sale_view).collect())
    }

    /// Book an expense against a sale
    pub async fn add_expense(
        &self,
        sale_id: EntityId,
        input: CreateSaleExpenseRequest,
    ) -> AppResult<SaleExpense> {
        validate_sale_expense(&input)?;
        self.ensure_sale_exists(sale_id).await?;

        let expense = sqlx::query_as::<_, SaleExpenseRow>(
            r#"
            INSERT INTO sale_expenses (sale_id, description, amount, expense_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sale_id, description, amount, expense_date
            "#,
        )
        .bind(sale_id)
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.expense_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(sale_id, amount = %expense.amount, "Sale expense recorded");

        Ok(expense.into())
    }

    /// Record a payment received for a sale
    pub async fn add_payment(&self, sale_id: EntityId, input: CreatePaymentRequest) -> AppResult<Payment> {
        validate_payment(&input)?;
        self.ensure_sale_exists(sale_id).await?;

        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (sale_id, amount, payment_date, payment_method, reference_number, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sale_id, amount, payment_date, payment_method, reference_number, notes
            "#,
        )
        .bind(sale_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(&input.payment_method)
        .bind(&input.reference_number)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(sale_id, amount = %payment.amount, "Payment recorded");

        Ok(payment.into())
    }

    async fn ensure_sale_exists(&self, sale_id: EntityId) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sales WHERE id = $1)")
            .bind(sale_id)
            .fetch_one(&self.db)
            .await?;

        if !exists {
            return Err(AppError::NotFound("Sale".to_string()));
        }
        Ok(())
    }
}

/// Load one sale with all child records
pub async fn load_sale_detail(conn: &mut PgConnection, sale_id: EntityId) -> AppResult<SaleDetail> {
    let row = sqlx::query_as::<_, SaleRow>(&format!("{} WHERE s.id = $1", SALE_SELECT))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

    attach_children(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Loaded sale disappeared".to_string()))
}

async fn attach_children(conn: &mut PgConnection, rows: Vec<SaleRow>) -> AppResult<Vec<SaleDetail>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<EntityId> = rows.iter().map(|r| r.id).collect();
    let mut details: Vec<SaleDetail> = rows.into_iter().map(SaleDetail::from).collect();
    let index: HashMap<EntityId, usize> = details
        .iter()
        .enumerate()
        .map(|(i, d)| (d.sale.id, i))
        .collect();

    let allocations = sqlx::query_as::<_, SaleAllocationRow>(
        r#"
        SELECT a.id, a.sale_id, a.purchase_lot_id, l.lot_number,
               a.quantity_allocated, a.cost_per_uom_at_allocation
        FROM sale_allocations a
        JOIN purchase_lots l ON l.id = a.purchase_lot_id
        WHERE a.sale_id = ANY($1)
        ORDER BY a.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in allocations {
        if let Some(&i) = index.get(&row.sale_id) {
            details[i].allocations.push(row.into());
        }
    }

    let expenses = sqlx::query_as::<_, SaleExpenseRow>(
        r#"
        SELECT id, sale_id, description, amount, expense_date
        FROM sale_expenses
        WHERE sale_id = ANY($1)
        ORDER BY expense_date, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in expenses {
        if let Some(&i) = index.get(&row.sale_id) {
            details[i].expenses.push(row.into());
        }
    }

    let payments = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, sale_id, amount, payment_date, payment_method, reference_number, notes
        FROM payments
        WHERE sale_id = ANY($1)
        ORDER BY payment_date, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in payments {
        if let Some(&i) = index.get(&row.sale_id) {
            details[i].payments.push(row.into());
        }
    }

    Ok(details)
}

/// The `sale_allocations` trigger rejects draws from closed or exhausted
/// lots. Under the row locks it should never fire; if it does, the stored
/// ledger disagrees with what was just read.
fn map_allocation_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(ALLOCATION_REJECTED) {
            return AppError::DataIntegrity(db_err.message().to_string());
        }
    }
    AppError::DatabaseError(err)
}

/// SQLSTATE raised by the allocation guard trigger
const ALLOCATION_REJECTED: &str = "LG001";
