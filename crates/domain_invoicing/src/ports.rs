//! Ports for the invoicing domain

use async_trait::async_trait;
use chrono::NaiveDate;
use core_kernel::{CustomerId, DomainPort, InvoiceId, PortError, TenantContext};
use serde::{Deserialize, Serialize};

use crate::invoice::{Invoice, InvoiceStatus};

/// Filter for invoice listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceQuery {
    #[serde(default)]
    pub statuses: Vec<InvoiceStatus>,
    pub customer_id: Option<CustomerId>,
    pub issued_from: Option<NaiveDate>,
    pub issued_to: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl InvoiceQuery {
    pub fn matches(&self, invoice: &Invoice) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&invoice.status))
            && self.customer_id.map_or(true, |c| invoice.customer_id == c)
            && self.issued_from.map_or(true, |d| invoice.issue_date >= d)
            && self.issued_to.map_or(true, |d| invoice.issue_date <= d)
    }
}

#[async_trait]
pub trait InvoicePort: DomainPort {
    /// Persists the invoice together with its lines
    async fn insert_invoice(&self, ctx: &TenantContext, invoice: &Invoice) -> Result<(), PortError>;

    async fn get_invoice(&self, ctx: &TenantContext, id: InvoiceId) -> Result<Invoice, PortError>;

    /// Replaces the invoice and its lines if the stored version matches
    async fn update_invoice(
        &self,
        ctx: &TenantContext,
        invoice: &Invoice,
        expected_version: i64,
    ) -> Result<(), PortError>;

    async fn find_invoices(&self, ctx: &TenantContext, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError>;
}

/// Atomic per-company, per-year counters
#[async_trait]
pub trait SequencePort: DomainPort {
    /// Increments the counter for `(company, key, year)` and returns the new
    /// value, starting at 1. Concurrent callers always observe distinct values.
    async fn next_value(&self, ctx: &TenantContext, key: &str, year: i32) -> Result<u64, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::{AdapterHealth, CompanyId, HealthCheckResult, HealthCheckable};
    use std::collections::HashMap;
    use tokio::sync::{Mutex, RwLock};

    #[derive(Debug, Default)]
    pub struct InMemoryInvoiceStore {
        invoices: RwLock<HashMap<InvoiceId, Invoice>>,
    }

    impl InMemoryInvoiceStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn len(&self) -> usize {
            self.invoices.read().await.len()
        }
    }

    impl DomainPort for InMemoryInvoiceStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryInvoiceStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::new("in-memory-invoices", AdapterHealth::Healthy, 0)
        }
    }

    #[async_trait]
    impl InvoicePort for InMemoryInvoiceStore {
        async fn insert_invoice(&self, _ctx: &TenantContext, invoice: &Invoice) -> Result<(), PortError> {
            let mut store = self.invoices.write().await;
            let duplicate_number = store
                .values()
                .any(|i| i.company_id == invoice.company_id && i.number == invoice.number);
            if store.contains_key(&invoice.id) || duplicate_number {
                return Err(PortError::conflict(format!("invoice {} already exists", invoice.number)));
            }
            store.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn get_invoice(&self, ctx: &TenantContext, id: InvoiceId) -> Result<Invoice, PortError> {
            self.invoices
                .read()
                .await
                .get(&id)
                .filter(|i| i.company_id == ctx.company_id)
                .cloned()
                .ok_or_else(|| PortError::not_found(Invoice::ENTITY, id))
        }

        async fn update_invoice(
            &self,
            ctx: &TenantContext,
            invoice: &Invoice,
            expected_version: i64,
        ) -> Result<(), PortError> {
            let mut store = self.invoices.write().await;
            let current = store
                .get(&invoice.id)
                .filter(|i| i.company_id == ctx.company_id)
                .ok_or_else(|| PortError::not_found(Invoice::ENTITY, invoice.id))?;
            if current.version != expected_version {
                return Err(PortError::conflict(format!(
                    "invoice {} is at version {}, expected {}",
                    invoice.id, current.version, expected_version
                )));
            }
            store.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn find_invoices(&self, ctx: &TenantContext, query: &InvoiceQuery) -> Result<Vec<Invoice>, PortError> {
            let mut results: Vec<Invoice> = self
                .invoices
                .read()
                .await
                .values()
                .filter(|i| i.company_id == ctx.company_id && query.matches(i))
                .cloned()
                .collect();
            results.sort_by_key(|i| (i.issue_date, i.number));
            Ok(results
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .collect())
        }
    }

    /// Mutex-guarded counter map
    #[derive(Debug, Default)]
    pub struct InMemorySequenceStore {
        counters: Mutex<HashMap<(CompanyId, String, i32), u64>>,
    }

    impl InMemorySequenceStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Presets a counter, as if `value` numbers had already been issued
        pub async fn seed(&self, company_id: CompanyId, key: &str, year: i32, value: u64) {
            self.counters
                .lock()
                .await
                .insert((company_id, key.to_string(), year), value);
        }
    }

    impl DomainPort for InMemorySequenceStore {}

    #[async_trait]
    impl SequencePort for InMemorySequenceStore {
        async fn next_value(&self, ctx: &TenantContext, key: &str, year: i32) -> Result<u64, PortError> {
            let mut counters = self.counters.lock().await;
            let counter = counters
                .entry((ctx.company_id, key.to_string(), year))
                .or_insert(0);
            *counter += 1;
            Ok(*counter)
        }
    }
}
