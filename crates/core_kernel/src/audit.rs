//! Audit events emitted by every mutating operation
//!
//! The sink is fire-and-forget from the caller's point of view: `record`
//! cannot fail, so adapters log their own delivery problems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::context::TenantContext;
use crate::identifiers::{AuditEventId, BranchId, CompanyId, UserId};

/// Kind of entity an audit event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Invoice,
    AccountPayable,
    AccountReceivable,
    Provision,
    EquityEntry,
    PeriodClose,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Invoice => "invoice",
            AuditEntity::AccountPayable => "account_payable",
            AuditEntity::AccountReceivable => "account_receivable",
            AuditEntity::Provision => "provision",
            AuditEntity::EquityEntry => "equity_entry",
            AuditEntity::PeriodClose => "period_close",
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    StatusChanged,
    Settled,
    Cancelled,
    Reversed,
    Flagged,
    FlagCleared,
    Closed,
    Reopened,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::Updated => "updated",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::Settled => "settled",
            AuditAction::Cancelled => "cancelled",
            AuditAction::Reversed => "reversed",
            AuditAction::Flagged => "flagged",
            AuditAction::FlagCleared => "flag_cleared",
            AuditAction::Closed => "closed",
            AuditAction::Reopened => "reopened",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Before/after description of a single mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub company_id: CompanyId,
    pub branch_id: BranchId,
    pub user_id: UserId,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub action: AuditAction,
    pub old_data: Option<serde_json::Value>,
    pub new_data: Option<serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        ctx: &TenantContext,
        entity: AuditEntity,
        entity_id: impl fmt::Display,
        action: AuditAction,
    ) -> Self {
        Self {
            id: AuditEventId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            user_id: ctx.user_id,
            entity,
            entity_id: entity_id.to_string(),
            action,
            old_data: None,
            new_data: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attaches the state before the mutation
    pub fn with_old<T: Serialize>(mut self, old: &T) -> Self {
        self.old_data = snapshot(old);
        self
    }

    /// Attaches the state after the mutation
    pub fn with_new<T: Serialize>(mut self, new: &T) -> Self {
        self.new_data = snapshot(new);
        self
    }
}

fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(error) => {
            warn!(%error, "could not serialize audit snapshot");
            None
        }
    }
}

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Delivers one event. Never fails from the caller's perspective.
    async fn record(&self, event: AuditEvent);
}

/// Writes audit events to the tracing pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            event_id = %event.id,
            company_id = %event.company_id,
            user_id = %event.user_id,
            entity = %event.entity,
            entity_id = %event.entity_id,
            action = %event.action,
            "audit event"
        );
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! In-memory audit sink for tests

    use super::*;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    pub struct InMemoryAuditSink {
        events: RwLock<Vec<AuditEvent>>,
    }

    impl InMemoryAuditSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<AuditEvent> {
            self.events.read().await.clone()
        }

        /// Events for one entity kind and action
        pub async fn matching(&self, entity: AuditEntity, action: AuditAction) -> Vec<AuditEvent> {
            self.events
                .read()
                .await
                .iter()
                .filter(|e| e.entity == entity && e.action == action)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl AuditSink for InMemoryAuditSink {
        async fn record(&self, event: AuditEvent) {
            self.events.write().await.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::InvoiceId;
    use mock::InMemoryAuditSink;

    fn ctx() -> TenantContext {
        TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new())
    }

    #[tokio::test]
    async fn test_event_carries_tenant_and_snapshots() {
        let ctx = ctx();
        let invoice_id = InvoiceId::new();
        let event = AuditEvent::new(&ctx, AuditEntity::Invoice, invoice_id, AuditAction::StatusChanged)
            .with_old(&serde_json::json!({"status": "draft"}))
            .with_new(&serde_json::json!({"status": "issued"}));

        assert_eq!(event.company_id, ctx.company_id);
        assert_eq!(event.entity_id, invoice_id.to_string());
        assert_eq!(event.old_data.unwrap()["status"], "draft");
        assert_eq!(event.new_data.unwrap()["status"], "issued");
    }

    #[tokio::test]
    async fn test_in_memory_sink_filters() {
        let sink = InMemoryAuditSink::new();
        let ctx = ctx();
        sink.record(AuditEvent::new(&ctx, AuditEntity::Invoice, "a", AuditAction::Created)).await;
        sink.record(AuditEvent::new(&ctx, AuditEntity::Provision, "b", AuditAction::Reversed)).await;

        assert_eq!(sink.events().await.len(), 2);
        assert_eq!(sink.matching(AuditEntity::Provision, AuditAction::Reversed).await.len(), 1);
    }
}
