//! # Report Repository
//!
//! Daily sales rollups for one product or for the best seller of a window.
//!
//! ```text
//! window LastDays(3), today = 03-10
//!
//!   sale_items ⋈ sales  (created_at in [03-08 00:00, 03-11 00:00))
//!        │
//!        ▼  bucket by UTC day
//!   03-08: -      03-09: 4 u / $40.00     03-10: 1 u / $10.00
//!        │
//!        ▼  fill_missing_days
//!   [03-08: 0/0, 03-09: 4/4000, 03-10: 1/1000]
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use caja_core::report::fill_missing_days;
use caja_core::{
    CoreError, DailySales, DateRange, ReportWindow, SalesSeries, TopProduct, DEFAULT_REPORT_DAYS,
};

use crate::error::DbResult;

/// Read-only reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Daily series for one product over `window`, ending today (UTC).
    pub async fn series_for_product(
        &self,
        product_id: i64,
        window: ReportWindow,
    ) -> DbResult<SalesSeries> {
        self.series_for_product_as_of(product_id, window, Utc::now().date_naive())
            .await
    }

    pub async fn series_for_product_as_of(
        &self,
        product_id: i64,
        window: ReportWindow,
        today: NaiveDate,
    ) -> DbResult<SalesSeries> {
        let range = window.resolve(today)?;
        let top = self
            .top_product(product_id, today)
            .await?
            .ok_or(CoreError::ProductNotFound(product_id))?;

        let series = self.daily(product_id, &range).await?;
        Ok(SalesSeries {
            top: Some(top),
            series,
        })
    }

    /// Daily series for the product with the most units sold in `window`.
    ///
    /// Ties go to the lowest product id. No sales in the window gives an
    /// empty payload.
    pub async fn top_seller(&self, window: ReportWindow) -> DbResult<SalesSeries> {
        self.top_seller_as_of(window, Utc::now().date_naive()).await
    }

    pub async fn top_seller_as_of(
        &self,
        window: ReportWindow,
        today: NaiveDate,
    ) -> DbResult<SalesSeries> {
        let range = window.resolve(today)?;

        let best: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT si.product_id
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
            GROUP BY si.product_id
            ORDER BY SUM(si.quantity) DESC, si.product_id ASC
            LIMIT 1
            "#,
        )
        .bind(range.start_at())
        .bind(range.end_at())
        .fetch_optional(&self.pool)
        .await?;

        let Some(product_id) = best else {
            debug!(start = %range.start, "No sales in window");
            return Ok(SalesSeries::default());
        };

        let top = self.top_product(product_id, today).await?;
        let series = self.daily(product_id, &range).await?;
        Ok(SalesSeries { top, series })
    }

    async fn top_product(&self, product_id: i64, today: NaiveDate) -> DbResult<Option<TopProduct>> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, price_cents FROM products WHERE id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((id, name, price_cents)) = row else {
            return Ok(None);
        };

        let month = DateRange::last_days(today, DEFAULT_REPORT_DAYS);
        let units_last_30_days: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(si.quantity), 0)
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE si.product_id = ?1 AND s.created_at >= ?2 AND s.created_at < ?3
            "#,
        )
        .bind(id)
        .bind(month.start_at())
        .bind(month.end_at())
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(TopProduct {
            id,
            name,
            price_cents,
            units_last_30_days,
        }))
    }

    async fn daily(&self, product_id: i64, range: &DateRange) -> DbResult<Vec<DailySales>> {
        let rows: Vec<(DateTime<Utc>, i64, i64)> = sqlx::query_as(
            r#"
            SELECT s.created_at, si.quantity, si.line_total_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE si.product_id = ?1 AND s.created_at >= ?2 AND s.created_at < ?3
            "#,
        )
        .bind(product_id)
        .bind(range.start_at())
        .bind(range.end_at())
        .fetch_all(&self.pool)
        .await?;

        debug!(product_id, rows = rows.len(), days = range.days(), "Building daily series");

        Ok(fill_missing_days(
            range,
            rows.into_iter().map(|(at, units, revenue_cents)| DailySales {
                date: at.date_naive(),
                units,
                revenue_cents,
            }),
        ))
    }
}
