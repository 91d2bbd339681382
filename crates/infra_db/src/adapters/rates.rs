//! Exchange rates backed by the `exchange_rates` table
//!
//! Rows are effective from `effective_at` until superseded. A lookup
//! without `as_of` takes the newest row; a historical lookup takes the
//! newest row effective at that instant. When only the opposite pair is
//! stored its reciprocal is used.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{Currency, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_fx::{RateProvider, RateQuote};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::codec::ping;
use crate::error::DatabaseError;

#[derive(Debug, sqlx::FromRow)]
struct RateRow {
    rate: Decimal,
    effective_at: DateTime<Utc>,
    source: String,
}

#[derive(Debug, Clone)]
pub struct PostgresRateProvider {
    pool: PgPool,
    provider_id: String,
}

impl PostgresRateProvider {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            provider_id: "postgres-rates".to_string(),
        }
    }

    /// Records a rate effective from `effective_at`, replacing any row for
    /// the same pair and instant
    #[instrument(skip(self))]
    pub async fn store_rate(
        &self,
        base: Currency,
        quote: Currency,
        rate: Decimal,
        effective_at: DateTime<Utc>,
        source: &str,
    ) -> Result<(), DatabaseError> {
        if rate <= Decimal::ZERO {
            return Err(DatabaseError::ConstraintViolation(format!(
                "rate for {}/{} must be positive",
                base, quote
            )));
        }
        sqlx::query(
            r#"
            INSERT INTO exchange_rates (base_currency, quote_currency, rate, effective_at, source)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (base_currency, quote_currency, effective_at)
            DO UPDATE SET rate = EXCLUDED.rate, source = EXCLUDED.source
            "#,
        )
        .bind(base.code())
        .bind(quote.code())
        .bind(rate)
        .bind(effective_at)
        .bind(source)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest(
        &self,
        base: Currency,
        quote: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Option<RateRow>, DatabaseError> {
        let row = sqlx::query_as::<_, RateRow>(
            r#"
            SELECT rate, effective_at, source
            FROM exchange_rates
            WHERE base_currency = $1 AND quote_currency = $2
              AND effective_at <= COALESCE($3, now())
            ORDER BY effective_at DESC
            LIMIT 1
            "#,
        )
        .bind(base.code())
        .bind(quote.code())
        .bind(as_of)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

impl DomainPort for PostgresRateProvider {}

#[async_trait]
impl HealthCheckable for PostgresRateProvider {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, &self.provider_id).await
    }
}

#[async_trait]
impl RateProvider for PostgresRateProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    #[instrument(skip(self))]
    async fn get_rate(
        &self,
        base: Currency,
        quote: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, PortError> {
        let (rate, row) = match self.latest(base, quote, as_of).await? {
            Some(row) => (row.rate, row),
            None => match self.latest(quote, base, as_of).await? {
                Some(row) if !row.rate.is_zero() => {
                    debug!("using reciprocal of stored rate");
                    (Decimal::ONE / row.rate, row)
                }
                _ => return Err(PortError::not_found("ExchangeRate", format!("{}/{}", base, quote))),
            },
        };

        Ok(RateQuote {
            base,
            quote,
            rate,
            timestamp: if as_of.is_some() { row.effective_at } else { Utc::now() },
            source: row.source,
        })
    }
}
