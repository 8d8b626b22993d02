use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::domain::prediction::{ForecastHistoryEntry, PredictedPrice};

/// Read/write access to prior forecasts. The engine treats the store as
/// optional; a missing store just means every request starts from an empty
/// history.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recent entries for one symbol, newest first.
    async fn recent(&self, symbol: &str, limit: i64)
        -> anyhow::Result<Vec<ForecastHistoryEntry>>;

    async fn append(&self, entry: &ForecastHistoryEntry) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: sqlx::PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

type HistoryRow = (
    String,
    f64,
    f64,
    f64,
    f64,
    f64,
    String,
    f64,
    Vec<String>,
    Vec<String>,
    DateTime<Utc>,
);

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    async fn recent(
        &self,
        symbol: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<ForecastHistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT symbol, price_at_forecast, one_month, three_months, six_months, one_year, \
                    sentiment, confidence, key_drivers, risks, created_at \
             FROM forecast_history \
             WHERE symbol = $1 \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("select forecast_history failed")?;

        Ok(rows
            .into_iter()
            .map(
                |(
                    symbol,
                    price_at_forecast,
                    one_month,
                    three_months,
                    six_months,
                    one_year,
                    sentiment,
                    confidence,
                    key_drivers,
                    risks,
                    created_at,
                )| ForecastHistoryEntry {
                    symbol,
                    price_at_forecast,
                    predicted: PredictedPrice {
                        one_month,
                        three_months,
                        six_months,
                        one_year,
                    },
                    sentiment,
                    confidence,
                    key_drivers,
                    risks,
                    created_at,
                },
            )
            .collect())
    }

    async fn append(&self, entry: &ForecastHistoryEntry) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO forecast_history \
             (id, symbol, price_at_forecast, one_month, three_months, six_months, one_year, \
              sentiment, confidence, key_drivers, risks, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(&entry.symbol)
        .bind(entry.price_at_forecast)
        .bind(entry.predicted.one_month)
        .bind(entry.predicted.three_months)
        .bind(entry.predicted.six_months)
        .bind(entry.predicted.one_year)
        .bind(&entry.sentiment)
        .bind(entry.confidence)
        .bind(&entry.key_drivers)
        .bind(&entry.risks)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .context("insert forecast_history failed")?;
        Ok(())
    }
}
