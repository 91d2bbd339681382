//! Gap-free document counters
//!
//! The counter row is created on first use and incremented with a single
//! upsert, so concurrent callers serialize on the row lock and never see
//! the same value.

use async_trait::async_trait;
use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, TenantContext};
use domain_invoicing::SequencePort;
use sqlx::PgPool;
use tracing::instrument;

use crate::codec::ping;
use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct PostgresSequenceAdapter {
    pool: PgPool,
}

impl PostgresSequenceAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresSequenceAdapter {}

#[async_trait]
impl HealthCheckable for PostgresSequenceAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-sequence-adapter").await
    }
}

#[async_trait]
impl SequencePort for PostgresSequenceAdapter {
    #[instrument(skip(self, ctx), fields(company_id = %ctx.company_id))]
    async fn next_value(&self, ctx: &TenantContext, key: &str, year: i32) -> Result<u64, PortError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (company_id, sequence_key, year, last_value)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (company_id, sequence_key, year)
            DO UPDATE SET last_value = document_sequences.last_value + 1, updated_at = now()
            RETURNING last_value
            "#,
        )
        .bind(*ctx.company_id.as_uuid())
        .bind(key)
        .bind(year)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        u64::try_from(value).map_err(|e| DatabaseError::decode("last_value", e).into())
    }
}
