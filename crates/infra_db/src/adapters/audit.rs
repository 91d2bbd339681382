//! Durable audit trail

use async_trait::async_trait;
use core_kernel::{AuditEvent, AuditSink};
use sqlx::PgPool;
use tracing::warn;

/// Appends audit events to `audit_events`
///
/// A failed write is logged and dropped; the business operation that
/// produced the event has already committed.
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn record(&self, event: AuditEvent) {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_events
                (id, company_id, branch_id, user_id, entity, entity_id, action, old_data, new_data, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*event.id.as_uuid())
        .bind(*event.company_id.as_uuid())
        .bind(*event.branch_id.as_uuid())
        .bind(*event.user_id.as_uuid())
        .bind(event.entity.as_str())
        .bind(event.entity_id.as_str())
        .bind(event.action.as_str())
        .bind(event.old_data.as_ref())
        .bind(event.new_data.as_ref())
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(
                event_id = %event.id,
                entity = event.entity.as_str(),
                action = event.action.as_str(),
                error = %e,
                "failed to persist audit event"
            );
        }
    }
}
