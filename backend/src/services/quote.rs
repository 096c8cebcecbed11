//! Price quote service: trader offers per crop

use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{CreatePriceQuoteRequest, PriceQuote, PriceQuoteRow};
use crate::services::reference::{self, Reference};
use shared::{validate_price_quote, EntityId, QuoteFilter};

const QUOTE_SELECT: &str = r#"
    SELECT q.id, q.crop_id, c.name AS crop_name, q.trader_id, t.name AS trader_name,
           q.price_per_uom, q.quote_date, q.notes, q.is_active
    FROM price_quotes q
    JOIN crops c ON c.id = q.crop_id
    JOIN traders t ON t.id = q.trader_id
"#;

/// Quote service for recording and looking up trader prices
#[derive(Clone)]
pub struct QuoteService {
    db: PgPool,
}

impl QuoteService {
    /// Create a new QuoteService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a quote
    pub async fn create_quote(&self, input: CreatePriceQuoteRequest) -> AppResult<PriceQuote> {
        validate_price_quote(&input)?;

        let mut tx = self.db.begin().await?;

        reference::ensure_exists(&mut tx, Reference::Crop, input.crop_id).await?;
        reference::ensure_exists(&mut tx, Reference::Trader, input.trader_id).await?;

        let quote_id = sqlx::query_scalar::<_, EntityId>(
            r#"
            INSERT INTO price_quotes (crop_id, trader_id, price_per_uom, quote_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.crop_id)
        .bind(input.trader_id)
        .bind(input.price_per_uom)
        .bind(input.quote_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let quote = sqlx::query_as::<_, PriceQuoteRow>(&format!("{} WHERE q.id = $1", QUOTE_SELECT))
            .bind(quote_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(quote_id, crop_id = input.crop_id, price = %input.price_per_uom, "Price quote recorded");

        Ok(quote.into())
    }

    /// List quotes, newest first
    pub async fn list_quotes(&self, filter: &QuoteFilter) -> AppResult<Vec<PriceQuote>> {
        let sql = format!(
            r#"{}
            WHERE ($1::BIGINT IS NULL OR q.crop_id = $1)
              AND ($2::DATE IS NULL OR q.quote_date >= $2)
              AND ($3::DATE IS NULL OR q.quote_date <= $3)
            ORDER BY q.quote_date DESC, q.id DESC
            "#,
            QUOTE_SELECT
        );

        let rows = sqlx::query_as::<_, PriceQuoteRow>(&sql)
            .bind(filter.crop_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(PriceQuote::from).collect())
    }

    /// Most recent active quote for a crop. Quotes on the same day are
    /// ordered by id, so the last one recorded wins.
    pub async fn latest_quote(&self, crop_id: EntityId) -> AppResult<PriceQuote> {
        let sql = format!(
            r#"{}
            WHERE q.crop_id = $1 AND q.is_active = TRUE
            ORDER BY q.quote_date DESC, q.id DESC
            LIMIT 1
            "#,
            QUOTE_SELECT
        );

        sqlx::query_as::<_, PriceQuoteRow>(&sql)
            .bind(crop_id)
            .fetch_optional(&self.db)
            .await?
            .map(PriceQuote::from)
            .ok_or_else(|| AppError::NotFound("Price quote".to_string()))
    }
}
