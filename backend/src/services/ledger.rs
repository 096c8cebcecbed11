//! Lot loading and locking
//!
//! Builds fully populated [`LotDetail`] values (lot plus every child record
//! the ledger derives figures from) so the engine in `shared` never has to
//! go back to the database. Child tables are fetched with one query each for
//! the whole set of lots.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use crate::models::{
    LotAdjustmentRow, LotDetail, LotExpenseRow, LotRow, LotTestRow, SaleAllocationRow,
};
use shared::{EntityId, LotFilter};

const LOT_SELECT: &str = r#"
    SELECT l.id, l.lot_number, l.crop_id, l.farmer_id, l.warehouse_id, l.unit_of_measure_id,
           l.quantity, l.buy_price_per_uom, l.other_charges, l.purchase_date, l.notes,
           l.is_closed, l.created_at, c.name AS crop_name, f.name AS farmer_name,
           w.name AS warehouse_name, u.code AS uom_code
    FROM purchase_lots l
    JOIN crops c ON c.id = l.crop_id
    JOIN farmers f ON f.id = l.farmer_id
    JOIN warehouses w ON w.id = l.warehouse_id
    JOIN units_of_measure u ON u.id = l.unit_of_measure_id
"#;

/// Postgres `lock_not_available`, raised when `lock_timeout` expires
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Which lots to load
#[derive(Debug, Clone, Default)]
pub struct LotQuery {
    pub crop_id: Option<EntityId>,
    pub farmer_id: Option<EntityId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub open_only: bool,
}

impl LotQuery {
    pub fn open_for_crop(crop_id: Option<EntityId>) -> Self {
        Self {
            crop_id,
            open_only: true,
            ..Default::default()
        }
    }
}

impl From<&LotFilter> for LotQuery {
    fn from(filter: &LotFilter) -> Self {
        Self {
            crop_id: filter.crop_id,
            farmer_id: filter.farmer_id,
            from: filter.from,
            to: filter.to,
            open_only: false,
        }
    }
}

/// Load lots matching `query` with all child records, in FIFO order
pub async fn load_lot_details(
    conn: &mut PgConnection,
    query: &LotQuery,
) -> AppResult<Vec<LotDetail>> {
    let sql = format!(
        r#"{}
        WHERE ($1::BIGINT IS NULL OR l.crop_id = $1)
          AND ($2::BIGINT IS NULL OR l.farmer_id = $2)
          AND ($3::DATE IS NULL OR l.purchase_date >= $3)
          AND ($4::DATE IS NULL OR l.purchase_date <= $4)
          AND ($5 = FALSE OR l.is_closed = FALSE)
        ORDER BY l.purchase_date, l.id
        "#,
        LOT_SELECT
    );

    let rows = sqlx::query_as::<_, LotRow>(&sql)
        .bind(query.crop_id)
        .bind(query.farmer_id)
        .bind(query.from)
        .bind(query.to)
        .bind(query.open_only)
        .fetch_all(&mut *conn)
        .await?;

    attach_children(conn, rows).await
}

/// Load a single lot with all child records
pub async fn load_lot_detail(conn: &mut PgConnection, lot_id: EntityId) -> AppResult<LotDetail> {
    let sql = format!("{} WHERE l.id = $1", LOT_SELECT);
    fetch_single(conn, &sql, lot_id).await
}

/// Lock one lot row for the rest of the transaction, then load it.
///
/// Serialises adjustments and closing against allocations drawing from the
/// same lot.
pub async fn lock_lot(conn: &mut PgConnection, lot_id: EntityId) -> AppResult<LotDetail> {
    let sql = format!("{} WHERE l.id = $1 FOR UPDATE OF l", LOT_SELECT);
    fetch_single(conn, &sql, lot_id).await
}

/// Lock every open lot of `crop_id` and load them in FIFO order.
///
/// Rows are locked in `purchase_date, id` order so that concurrent sales of
/// the same crop queue behind each other instead of deadlocking. Child rows
/// are read only after the locks are held, so allocations committed by a
/// sale we waited on are visible.
#[tracing::instrument(skip(conn))]
pub async fn lock_open_lots_for_crop(
    conn: &mut PgConnection,
    crop_id: EntityId,
) -> AppResult<Vec<LotDetail>> {
    let sql = format!(
        r#"{}
        WHERE l.crop_id = $1 AND l.is_closed = FALSE
        ORDER BY l.purchase_date, l.id
        FOR UPDATE OF l
        "#,
        LOT_SELECT
    );

    let rows = sqlx::query_as::<_, LotRow>(&sql)
        .bind(crop_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_lock_error)?;

    tracing::debug!(crop_id, locked = rows.len(), "Locked open lots");

    attach_children(conn, rows).await
}

/// Bound how long statements in the current transaction wait for row locks
pub async fn set_lock_timeout(conn: &mut PgConnection, timeout_ms: u64) -> AppResult<()> {
    // SET does not accept bind parameters
    sqlx::query(&format!("SET LOCAL lock_timeout = {}", timeout_ms))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Turn an expired lock wait into [`AppError::Timeout`]
pub fn map_lock_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            tracing::warn!("Gave up waiting for lot row locks");
            return AppError::Timeout;
        }
    }
    AppError::DatabaseError(err)
}

async fn fetch_single(conn: &mut PgConnection, sql: &str, lot_id: EntityId) -> AppResult<LotDetail> {
    let row = sqlx::query_as::<_, LotRow>(sql)
        .bind(lot_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_lock_error)?
        .ok_or_else(|| AppError::NotFound("Purchase lot".to_string()))?;

    attach_children(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Loaded lot disappeared".to_string()))
}

async fn attach_children(conn: &mut PgConnection, rows: Vec<LotRow>) -> AppResult<Vec<LotDetail>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<EntityId> = rows.iter().map(|r| r.id).collect();
    let mut details: Vec<LotDetail> = rows.into_iter().map(LotDetail::from).collect();
    let index: HashMap<EntityId, usize> = details
        .iter()
        .enumerate()
        .map(|(i, d)| (d.lot.id, i))
        .collect();

    let expenses = sqlx::query_as::<_, LotExpenseRow>(
        r#"
        SELECT id, purchase_lot_id, description, amount, expense_date
        FROM lot_expenses
        WHERE purchase_lot_id = ANY($1)
        ORDER BY expense_date, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in expenses {
        if let Some(&i) = index.get(&row.purchase_lot_id) {
            details[i].expenses.push(row.into());
        }
    }

    let tests = sqlx::query_as::<_, LotTestRow>(
        r#"
        SELECT id, purchase_lot_id, test_name, result, notes, test_date
        FROM lot_tests
        WHERE purchase_lot_id = ANY($1)
        ORDER BY test_date, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in tests {
        if let Some(&i) = index.get(&row.purchase_lot_id) {
            details[i].tests.push(row.into());
        }
    }

    let adjustments = sqlx::query_as::<_, LotAdjustmentRow>(
        r#"
        SELECT id, purchase_lot_id, qty_delta, reason, adjustment_date
        FROM lot_adjustments
        WHERE purchase_lot_id = ANY($1)
        ORDER BY adjustment_date, id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in adjustments {
        if let Some(&i) = index.get(&row.purchase_lot_id) {
            details[i].adjustments.push(row.into());
        }
    }

    let allocations = sqlx::query_as::<_, SaleAllocationRow>(
        r#"
        SELECT a.id, a.sale_id, a.purchase_lot_id, l.lot_number,
               a.quantity_allocated, a.cost_per_uom_at_allocation
        FROM sale_allocations a
        JOIN purchase_lots l ON l.id = a.purchase_lot_id
        WHERE a.purchase_lot_id = ANY($1)
        ORDER BY a.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    for row in allocations {
        if let Some(&i) = index.get(&row.purchase_lot_id) {
            details[i].allocations.push(row.into());
        }
    }

    Ok(details)
}
