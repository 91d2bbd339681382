//! Ports for the ledger domain
//!
//! The ledger service depends on these traits only. PostgreSQL adapters live
//! in `infra_db`; the in-memory implementations in [`mock`] back unit and
//! workflow tests.
//!
//! Every call is scoped by the tenant's `company_id`. Updates carry the
//! version the caller read; a mismatch is reported as `PortError::Conflict`.

use async_trait::async_trait;
use chrono::NaiveDate;
use core_kernel::{
    ContractId, CustomerId, DomainPort, EmployeeId, InvoiceId, PayableId, PortError, ProvisionId,
    ReceivableId, SeriesId, SupplierId, TenantContext, YearMonth,
};
use serde::{Deserialize, Serialize};

use crate::equity::EquityEntry;
use crate::obligation::ObligationStatus;
use crate::payable::AccountPayable;
use crate::period::PeriodLock;
use crate::provision::{Provision, ProvisionStatus, ProvisionSubject};
use crate::receivable::AccountReceivable;

/// Filter for payables and receivables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObligationQuery {
    /// Stored statuses to include; all when empty
    #[serde(default)]
    pub statuses: Vec<ObligationStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Only records recognized on or before this date
    pub recorded_to: Option<NaiveDate>,
    pub series_id: Option<SeriesId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ObligationQuery {
    /// Open and partially settled records
    pub fn outstanding() -> Self {
        Self {
            statuses: vec![ObligationStatus::Open, ObligationStatus::Partial],
            ..Default::default()
        }
    }

    pub fn matches(&self, status: ObligationStatus, due_date: NaiveDate, recorded_on: NaiveDate) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&status))
            && self.due_from.map_or(true, |d| due_date >= d)
            && self.due_to.map_or(true, |d| due_date <= d)
            && self.recorded_to.map_or(true, |d| recorded_on <= d)
    }
}

/// Filter for provisions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionQuery {
    pub status: Option<ProvisionStatus>,
    pub subject: Option<ProvisionSubject>,
    pub date_to: Option<NaiveDate>,
}

/// Outcome of the idempotent invoice-receivable insert
#[derive(Debug, Clone, PartialEq)]
pub enum ReceivableInsert {
    /// This call created the receivable
    Created(AccountReceivable),
    /// A receivable for the invoice already existed and was returned
    Existing(AccountReceivable),
}

impl ReceivableInsert {
    pub fn receivable(&self) -> &AccountReceivable {
        match self {
            ReceivableInsert::Created(r) | ReceivableInsert::Existing(r) => r,
        }
    }

    pub fn into_receivable(self) -> AccountReceivable {
        match self {
            ReceivableInsert::Created(r) | ReceivableInsert::Existing(r) => r,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ReceivableInsert::Created(_))
    }
}

#[async_trait]
pub trait PayablePort: DomainPort {
    /// Inserts all records or none
    async fn insert_payables(&self, ctx: &TenantContext, payables: &[AccountPayable]) -> Result<(), PortError>;

    async fn get_payable(&self, ctx: &TenantContext, id: PayableId) -> Result<AccountPayable, PortError>;

    async fn update_payable(
        &self,
        ctx: &TenantContext,
        payable: &AccountPayable,
        expected_version: i64,
    ) -> Result<(), PortError>;

    async fn find_payables(&self, ctx: &TenantContext, query: &ObligationQuery) -> Result<Vec<AccountPayable>, PortError>;
}

#[async_trait]
pub trait ReceivablePort: DomainPort {
    /// Inserts all records or none
    async fn insert_receivables(
        &self,
        ctx: &TenantContext,
        receivables: &[AccountReceivable],
    ) -> Result<(), PortError>;

    /// Inserts the receivable for `receivable.invoice_id` unless one already
    /// exists. At most one receivable per invoice, even under concurrency.
    async fn insert_for_invoice(
        &self,
        ctx: &TenantContext,
        receivable: &AccountReceivable,
    ) -> Result<ReceivableInsert, PortError>;

    async fn get_receivable(&self, ctx: &TenantContext, id: ReceivableId) -> Result<AccountReceivable, PortError>;

    async fn find_by_invoice(
        &self,
        ctx: &TenantContext,
        invoice_id: InvoiceId,
    ) -> Result<Option<AccountReceivable>, PortError>;

    async fn update_receivable(
        &self,
        ctx: &TenantContext,
        receivable: &AccountReceivable,
        expected_version: i64,
    ) -> Result<(), PortError>;

    async fn find_receivables(
        &self,
        ctx: &TenantContext,
        query: &ObligationQuery,
    ) -> Result<Vec<AccountReceivable>, PortError>;

    /// Receivables carrying a review flag
    async fn find_flagged(&self, ctx: &TenantContext) -> Result<Vec<AccountReceivable>, PortError>;
}

#[async_trait]
pub trait ProvisionPort: DomainPort {
    async fn insert_provision(&self, ctx: &TenantContext, provision: &Provision) -> Result<(), PortError>;

    async fn get_provision(&self, ctx: &TenantContext, id: ProvisionId) -> Result<Provision, PortError>;

    async fn update_provision(
        &self,
        ctx: &TenantContext,
        provision: &Provision,
        expected_version: i64,
    ) -> Result<(), PortError>;

    async fn find_provisions(&self, ctx: &TenantContext, query: &ProvisionQuery) -> Result<Vec<Provision>, PortError>;

    /// Stores the reversed `old` and its `replacement` together, or neither
    async fn supersede_provision(
        &self,
        ctx: &TenantContext,
        old: &Provision,
        expected_version: i64,
        replacement: &Provision,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait EquityPort: DomainPort {
    async fn insert_equity_entry(&self, ctx: &TenantContext, entry: &EquityEntry) -> Result<(), PortError>;

    /// Entries dated on or before `up_to` (all when `None`)
    async fn find_equity_entries(
        &self,
        ctx: &TenantContext,
        up_to: Option<NaiveDate>,
    ) -> Result<Vec<EquityEntry>, PortError>;
}

#[async_trait]
pub trait PeriodLockPort: DomainPort {
    async fn get_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<Option<PeriodLock>, PortError>;

    /// Fails with `PortError::Conflict` when the period is already locked
    async fn insert_lock(&self, ctx: &TenantContext, lock: &PeriodLock) -> Result<(), PortError>;

    /// Returns whether a lock was removed
    async fn delete_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<bool, PortError>;

    async fn list_locks(&self, ctx: &TenantContext) -> Result<Vec<PeriodLock>, PortError>;
}

/// Counterparty master data owned outside this core
#[async_trait]
pub trait CounterpartyDirectory: DomainPort {
    async fn customer_exists(&self, ctx: &TenantContext, id: CustomerId) -> Result<bool, PortError>;
    async fn supplier_exists(&self, ctx: &TenantContext, id: SupplierId) -> Result<bool, PortError>;
    async fn contract_exists(&self, ctx: &TenantContext, id: ContractId) -> Result<bool, PortError>;
    async fn employee_exists(&self, ctx: &TenantContext, id: EmployeeId) -> Result<bool, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use core_kernel::{AdapterHealth, CompanyId, HealthCheckResult, HealthCheckable};
    use std::collections::{HashMap, HashSet};
    use tokio::sync::RwLock;

    fn paginate<T>(items: Vec<T>, limit: Option<usize>, offset: Option<usize>) -> Vec<T> {
        items
            .into_iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }

    fn stale(entity: &str, id: impl std::fmt::Display, expected: i64, actual: i64) -> PortError {
        PortError::conflict(format!(
            "{} {} is at version {}, expected {}",
            entity, id, actual, expected
        ))
    }

    /// In-memory implementation of every ledger store port
    #[derive(Debug, Default)]
    pub struct InMemoryLedger {
        payables: RwLock<HashMap<PayableId, AccountPayable>>,
        receivables: RwLock<HashMap<ReceivableId, AccountReceivable>>,
        provisions: RwLock<HashMap<ProvisionId, Provision>>,
        equity: RwLock<Vec<EquityEntry>>,
        locks: RwLock<HashMap<(CompanyId, YearMonth), PeriodLock>>,
    }

    impl InMemoryLedger {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn receivable_count(&self) -> usize {
            self.receivables.read().await.len()
        }
    }

    impl DomainPort for InMemoryLedger {}

    #[async_trait]
    impl HealthCheckable for InMemoryLedger {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::new("in-memory-ledger", AdapterHealth::Healthy, 0)
        }
    }

    #[async_trait]
    impl PayablePort for InMemoryLedger {
        async fn insert_payables(&self, _ctx: &TenantContext, payables: &[AccountPayable]) -> Result<(), PortError> {
            let mut store = self.payables.write().await;
            if let Some(dup) = payables.iter().find(|p| store.contains_key(&p.id)) {
                return Err(PortError::conflict(format!("payable {} already exists", dup.id)));
            }
            for payable in payables {
                store.insert(payable.id, payable.clone());
            }
            Ok(())
        }

        async fn get_payable(&self, ctx: &TenantContext, id: PayableId) -> Result<AccountPayable, PortError> {
            self.payables
                .read()
                .await
                .get(&id)
                .filter(|p| p.company_id == ctx.company_id)
                .cloned()
                .ok_or_else(|| PortError::not_found(AccountPayable::ENTITY, id))
        }

        async fn update_payable(
            &self,
            ctx: &TenantContext,
            payable: &AccountPayable,
            expected_version: i64,
        ) -> Result<(), PortError> {
            let mut store = self.payables.write().await;
            let current = store
                .get(&payable.id)
                .filter(|p| p.company_id == ctx.company_id)
                .ok_or_else(|| PortError::not_found(AccountPayable::ENTITY, payable.id))?;
            if current.version != expected_version {
                return Err(stale(AccountPayable::ENTITY, payable.id, expected_version, current.version));
            }
            store.insert(payable.id, payable.clone());
            Ok(())
        }

        async fn find_payables(&self, ctx: &TenantContext, query: &ObligationQuery) -> Result<Vec<AccountPayable>, PortError> {
            let store = self.payables.read().await;
            let mut results: Vec<AccountPayable> = store
                .values()
                .filter(|p| p.company_id == ctx.company_id)
                .filter(|p| query.matches(p.obligation.status, p.obligation.due_date, p.obligation.recorded_on))
                .filter(|p| query.series_id.map_or(true, |s| p.series.map(|r| r.series_id) == Some(s)))
                .cloned()
                .collect();
            results.sort_by_key(|p| (p.obligation.due_date, p.id));
            Ok(paginate(results, query.limit, query.offset))
        }
    }

    #[async_trait]
    impl ReceivablePort for InMemoryLedger {
        async fn insert_receivables(
            &self,
            _ctx: &TenantContext,
            receivables: &[AccountReceivable],
        ) -> Result<(), PortError> {
            let mut store = self.receivables.write().await;
            if let Some(dup) = receivables.iter().find(|r| store.contains_key(&r.id)) {
                return Err(PortError::conflict(format!("receivable {} already exists", dup.id)));
            }
            for receivable in receivables {
                store.insert(receivable.id, receivable.clone());
            }
            Ok(())
        }

        async fn insert_for_invoice(
            &self,
            _ctx: &TenantContext,
            receivable: &AccountReceivable,
        ) -> Result<ReceivableInsert, PortError> {
            let invoice_id = receivable
                .invoice_id
                .ok_or_else(|| PortError::validation_field("receivable has no invoice", "invoice_id"))?;

            // Check and insert under one write lock, like a unique index.
            let mut store = self.receivables.write().await;
            if let Some(existing) = store
                .values()
                .find(|r| r.company_id == receivable.company_id && r.invoice_id == Some(invoice_id))
            {
                return Ok(ReceivableInsert::Existing(existing.clone()));
            }
            store.insert(receivable.id, receivable.clone());
            Ok(ReceivableInsert::Created(receivable.clone()))
        }

        async fn get_receivable(&self, ctx: &TenantContext, id: ReceivableId) -> Result<AccountReceivable, PortError> {
            self.receivables
                .read()
                .await
                .get(&id)
                .filter(|r| r.company_id == ctx.company_id)
                .cloned()
                .ok_or_else(|| PortError::not_found(AccountReceivable::ENTITY, id))
        }

        async fn find_by_invoice(
            &self,
            ctx: &TenantContext,
            invoice_id: InvoiceId,
        ) -> Result<Option<AccountReceivable>, PortError> {
            Ok(self
                .receivables
                .read()
                .await
                .values()
                .find(|r| r.company_id == ctx.company_id && r.invoice_id == Some(invoice_id))
                .cloned())
        }

        async fn update_receivable(
            &self,
            ctx: &TenantContext,
            receivable: &AccountReceivable,
            expected_version: i64,
        ) -> Result<(), PortError> {
            let mut store = self.receivables.write().await;
            let current = store
                .get(&receivable.id)
                .filter(|r| r.company_id == ctx.company_id)
                .ok_or_else(|| PortError::not_found(AccountReceivable::ENTITY, receivable.id))?;
            if current.version != expected_version {
                return Err(stale(AccountReceivable::ENTITY, receivable.id, expected_version, current.version));
            }
            store.insert(receivable.id, receivable.clone());
            Ok(())
        }

        async fn find_receivables(
            &self,
            ctx: &TenantContext,
            query: &ObligationQuery,
        ) -> Result<Vec<AccountReceivable>, PortError> {
            let store = self.receivables.read().await;
            let mut results: Vec<AccountReceivable> = store
                .values()
                .filter(|r| r.company_id == ctx.company_id)
                .filter(|r| query.matches(r.obligation.status, r.obligation.due_date, r.obligation.recorded_on))
                .filter(|r| query.series_id.map_or(true, |s| r.series.map(|x| x.series_id) == Some(s)))
                .cloned()
                .collect();
            results.sort_by_key(|r| (r.obligation.due_date, r.id));
            Ok(paginate(results, query.limit, query.offset))
        }

        async fn find_flagged(&self, ctx: &TenantContext) -> Result<Vec<AccountReceivable>, PortError> {
            let mut results: Vec<AccountReceivable> = self
                .receivables
                .read()
                .await
                .values()
                .filter(|r| r.company_id == ctx.company_id && r.review_flag.is_some())
                .cloned()
                .collect();
            results.sort_by_key(|r| r.id);
            Ok(results)
        }
    }

    #[async_trait]
    impl ProvisionPort for InMemoryLedger {
        async fn insert_provision(&self, _ctx: &TenantContext, provision: &Provision) -> Result<(), PortError> {
            let mut store = self.provisions.write().await;
            if store.contains_key(&provision.id) {
                return Err(PortError::conflict(format!("provision {} already exists", provision.id)));
            }
            store.insert(provision.id, provision.clone());
            Ok(())
        }

        async fn get_provision(&self, ctx: &TenantContext, id: ProvisionId) -> Result<Provision, PortError> {
            self.provisions
                .read()
                .await
                .get(&id)
                .filter(|p| p.company_id == ctx.company_id)
                .cloned()
                .ok_or_else(|| PortError::not_found(Provision::ENTITY, id))
        }

        async fn update_provision(
            &self,
            ctx: &TenantContext,
            provision: &Provision,
            expected_version: i64,
        ) -> Result<(), PortError> {
            let mut store = self.provisions.write().await;
            let current = store
                .get(&provision.id)
                .filter(|p| p.company_id == ctx.company_id)
                .ok_or_else(|| PortError::not_found(Provision::ENTITY, provision.id))?;
            if current.version != expected_version {
                return Err(stale(Provision::ENTITY, provision.id, expected_version, current.version));
            }
            store.insert(provision.id, provision.clone());
            Ok(())
        }

        async fn find_provisions(&self, ctx: &TenantContext, query: &ProvisionQuery) -> Result<Vec<Provision>, PortError> {
            let mut results: Vec<Provision> = self
                .provisions
                .read()
                .await
                .values()
                .filter(|p| p.company_id == ctx.company_id)
                .filter(|p| query.status.map_or(true, |s| p.status == s))
                .filter(|p| query.subject.map_or(true, |s| p.subject == s))
                .filter(|p| query.date_to.map_or(true, |d| p.provision_date <= d))
                .cloned()
                .collect();
            results.sort_by_key(|p| (p.provision_date, p.id));
            Ok(results)
        }

        async fn supersede_provision(
            &self,
            ctx: &TenantContext,
            old: &Provision,
            expected_version: i64,
            replacement: &Provision,
        ) -> Result<(), PortError> {
            let mut store = self.provisions.write().await;
            let current = store
                .get(&old.id)
                .filter(|p| p.company_id == ctx.company_id)
                .ok_or_else(|| PortError::not_found(Provision::ENTITY, old.id))?;
            if current.version != expected_version {
                return Err(stale(Provision::ENTITY, old.id, expected_version, current.version));
            }
            if store.contains_key(&replacement.id) {
                return Err(PortError::conflict(format!("provision {} already exists", replacement.id)));
            }
            store.insert(old.id, old.clone());
            store.insert(replacement.id, replacement.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl EquityPort for InMemoryLedger {
        async fn insert_equity_entry(&self, _ctx: &TenantContext, entry: &EquityEntry) -> Result<(), PortError> {
            self.equity.write().await.push(entry.clone());
            Ok(())
        }

        async fn find_equity_entries(
            &self,
            ctx: &TenantContext,
            up_to: Option<NaiveDate>,
        ) -> Result<Vec<EquityEntry>, PortError> {
            Ok(self
                .equity
                .read()
                .await
                .iter()
                .filter(|e| e.company_id == ctx.company_id)
                .filter(|e| up_to.map_or(true, |d| e.entry_date <= d))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl PeriodLockPort for InMemoryLedger {
        async fn get_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<Option<PeriodLock>, PortError> {
            Ok(self.locks.read().await.get(&(ctx.company_id, period)).cloned())
        }

        async fn insert_lock(&self, ctx: &TenantContext, lock: &PeriodLock) -> Result<(), PortError> {
            let mut locks = self.locks.write().await;
            let key = (ctx.company_id, lock.period);
            if locks.contains_key(&key) {
                return Err(PortError::conflict(format!("period {} already closed", lock.period)));
            }
            locks.insert(key, lock.clone());
            Ok(())
        }

        async fn delete_lock(&self, ctx: &TenantContext, period: YearMonth) -> Result<bool, PortError> {
            Ok(self.locks.write().await.remove(&(ctx.company_id, period)).is_some())
        }

        async fn list_locks(&self, ctx: &TenantContext) -> Result<Vec<PeriodLock>, PortError> {
            let mut locks: Vec<PeriodLock> = self
                .locks
                .read()
                .await
                .values()
                .filter(|l| l.company_id == ctx.company_id)
                .cloned()
                .collect();
            locks.sort_by_key(|l| l.period);
            Ok(locks)
        }
    }

    /// Directory that knows only registered ids, or everything when permissive
    #[derive(Debug, Default)]
    pub struct InMemoryDirectory {
        permissive: bool,
        customers: RwLock<HashSet<CustomerId>>,
        suppliers: RwLock<HashSet<SupplierId>>,
        contracts: RwLock<HashSet<ContractId>>,
        employees: RwLock<HashSet<EmployeeId>>,
    }

    impl InMemoryDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every lookup succeeds
        pub fn permissive() -> Self {
            Self {
                permissive: true,
                ..Self::default()
            }
        }

        pub async fn add_customer(&self, id: CustomerId) {
            self.customers.write().await.insert(id);
        }

        pub async fn add_supplier(&self, id: SupplierId) {
            self.suppliers.write().await.insert(id);
        }

        pub async fn add_contract(&self, id: ContractId) {
            self.contracts.write().await.insert(id);
        }

        pub async fn add_employee(&self, id: EmployeeId) {
            self.employees.write().await.insert(id);
        }
    }

    impl DomainPort for InMemoryDirectory {}

    #[async_trait]
    impl CounterpartyDirectory for InMemoryDirectory {
        async fn customer_exists(&self, _ctx: &TenantContext, id: CustomerId) -> Result<bool, PortError> {
            Ok(self.permissive || self.customers.read().await.contains(&id))
        }

        async fn supplier_exists(&self, _ctx: &TenantContext, id: SupplierId) -> Result<bool, PortError> {
            Ok(self.permissive || self.suppliers.read().await.contains(&id))
        }

        async fn contract_exists(&self, _ctx: &TenantContext, id: ContractId) -> Result<bool, PortError> {
            Ok(self.permissive || self.contracts.read().await.contains(&id))
        }

        async fn employee_exists(&self, _ctx: &TenantContext, id: EmployeeId) -> Result<bool, PortError> {
            Ok(self.permissive || self.employees.read().await.contains(&id))
        }
    }
}
