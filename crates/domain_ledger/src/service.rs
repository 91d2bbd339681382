//! Ledger application service
//!
//! Orchestrates validation, period checks, conversion, persistence and audit
//! for payables, receivables, provisions and equity entries.

use chrono::NaiveDate;
use core_kernel::{
    AuditAction, AuditEntity, AuditEvent, AuditSink, Clock, EquityEntryId, InvoiceId, Money,
    PayableId, ProvisionId, ReceivableId, SeriesId, SettlementId, TenantContext, MAX_AMOUNT,
};
use domain_fx::CurrencyConverter;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::equity::{EquityEntry, NewEquityEntry};
use crate::error::LedgerError;
use crate::obligation::{Obligation, Settlement, SettlementRequest};
use crate::payable::{AccountPayable, NewPayable};
use crate::period::PeriodGuard;
use crate::ports::{
    CounterpartyDirectory, EquityPort, ObligationQuery, PayablePort, PeriodLockPort, ProvisionPort,
    ProvisionQuery, ReceivableInsert, ReceivablePort,
};
use crate::provision::{NewProvision, Provision, ProvisionStatus, ProvisionSubject, SupersedeProvision};
use crate::receivable::{AccountReceivable, InvoiceReceivable, NewReceivable, ReviewFlag};
use crate::recurrence::{Occurrence, Recurrence, SeriesRef};

/// The stores the ledger service works against
#[derive(Clone)]
pub struct LedgerPorts {
    pub payables: Arc<dyn PayablePort>,
    pub receivables: Arc<dyn ReceivablePort>,
    pub provisions: Arc<dyn ProvisionPort>,
    pub equity: Arc<dyn EquityPort>,
    pub period_locks: Arc<dyn PeriodLockPort>,
    pub directory: Arc<dyn CounterpartyDirectory>,
}

#[cfg(any(test, feature = "mock"))]
impl LedgerPorts {
    /// Wires every port to one in-memory ledger
    pub fn in_memory(
        store: Arc<crate::ports::mock::InMemoryLedger>,
        directory: Arc<crate::ports::mock::InMemoryDirectory>,
    ) -> Self {
        Self {
            payables: store.clone(),
            receivables: store.clone(),
            provisions: store.clone(),
            equity: store.clone(),
            period_locks: store,
            directory,
        }
    }
}

fn require_positive(amount: &Money, field: &str) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::validation(format!(
            "{} must be positive, got {}",
            field, amount
        )));
    }
    if amount.amount() > MAX_AMOUNT {
        return Err(LedgerError::validation(format!(
            "{} must not exceed {}, got {}",
            field, MAX_AMOUNT, amount
        )));
    }
    Ok(())
}

fn require_text(value: &str, field: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn schedule(
    recorded_on: NaiveDate,
    due_date: NaiveDate,
    recurrence: Option<Recurrence>,
) -> Result<Vec<Occurrence>, LedgerError> {
    match recurrence {
        Some(recurrence) => recurrence.schedule(recorded_on, due_date),
        None => Ok(vec![Occurrence {
            number: 1,
            recorded_on,
            due_date,
        }]),
    }
}

pub struct LedgerService {
    ports: LedgerPorts,
    guard: PeriodGuard,
    converter: Arc<CurrencyConverter>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    pub fn new(
        ports: LedgerPorts,
        converter: Arc<CurrencyConverter>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let guard = PeriodGuard::new(ports.period_locks.clone());
        Self {
            ports,
            guard,
            converter,
            audit,
            clock,
        }
    }

    pub fn ports(&self) -> &LedgerPorts {
        &self.ports
    }

    pub fn period_guard(&self) -> &PeriodGuard {
        &self.guard
    }

    fn new_settlement(&self, request: SettlementRequest) -> Settlement {
        Settlement {
            id: SettlementId::new_v7(),
            amount: core_kernel::round_money(request.amount),
            settled_on: request.settled_on,
            reference: request.reference,
            recorded_at: self.clock.now(),
        }
    }

    // ------------------------------------------------------------------
    // Payables
    // ------------------------------------------------------------------

    /// Records a payable, or the whole series when it recurs
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, supplier_id = %request.supplier_id))]
    pub async fn create_payable(
        &self,
        ctx: &TenantContext,
        request: NewPayable,
    ) -> Result<Vec<AccountPayable>, LedgerError> {
        require_text(&request.description, "description")?;
        require_positive(&request.amount, "amount")?;
        if !self.ports.directory.supplier_exists(ctx, request.supplier_id).await? {
            return Err(LedgerError::not_found("Supplier", request.supplier_id));
        }

        let recorded_on = request.recorded_on.unwrap_or_else(|| self.clock.today());
        let occurrences = schedule(recorded_on, request.due_date, request.recurrence)?;
        self.guard
            .ensure_all_open(ctx, occurrences.iter().map(|o| o.recorded_on))
            .await?;

        let amount = request.amount.rounded();
        let converted = self.converter.convert(&amount, None).await?;
        let series_id = request.recurrence.map(|_| SeriesId::new_v7());
        let now = self.clock.now();

        let payables: Vec<AccountPayable> = occurrences
            .iter()
            .map(|occurrence| {
                let mut obligation =
                    Obligation::new(amount, converted.clone(), occurrence.recorded_on, occurrence.due_date);
                obligation.classification = request.classification;
                AccountPayable {
                    id: PayableId::new_v7(),
                    company_id: ctx.company_id,
                    branch_id: ctx.branch_id,
                    supplier_id: request.supplier_id,
                    description: request.description.clone(),
                    category: request.category,
                    obligation,
                    recurrence: request.recurrence,
                    series: series_id.map(|series_id| SeriesRef {
                        series_id,
                        occurrence: occurrence.number,
                    }),
                    document_id: request.document_id,
                    created_by: ctx.user_id,
                    created_at: now,
                    updated_at: now,
                    version: 1,
                }
            })
            .collect();

        self.ports.payables.insert_payables(ctx, &payables).await?;
        for payable in &payables {
            self.audit
                .record(
                    AuditEvent::new(ctx, AuditEntity::AccountPayable, payable.id, AuditAction::Created)
                        .with_new(payable),
                )
                .await;
        }

        info!(count = payables.len(), "payables created");
        Ok(payables)
    }

    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, payable_id = %id))]
    pub async fn record_payable_settlement(
        &self,
        ctx: &TenantContext,
        id: PayableId,
        request: SettlementRequest,
    ) -> Result<AccountPayable, LedgerError> {
        self.guard.ensure_open(ctx, request.settled_on).await?;

        let mut payable = self.ports.payables.get_payable(ctx, id).await?;
        let before = payable.clone();
        payable
            .obligation
            .apply_settlement(AccountPayable::ENTITY, self.new_settlement(request))?;
        payable.updated_at = self.clock.now();
        payable.version += 1;

        self.ports.payables.update_payable(ctx, &payable, before.version).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountPayable, id, AuditAction::Settled)
                    .with_old(&before)
                    .with_new(&payable),
            )
            .await;

        info!(status = %payable.obligation.status, "payable settlement recorded");
        Ok(payable)
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id, payable_id = %id))]
    pub async fn cancel_payable(&self, ctx: &TenantContext, id: PayableId) -> Result<AccountPayable, LedgerError> {
        let today = self.clock.today();
        self.guard.ensure_open(ctx, today).await?;

        let mut payable = self.ports.payables.get_payable(ctx, id).await?;
        let before = payable.clone();
        payable.obligation.cancel(AccountPayable::ENTITY, today)?;
        payable.updated_at = self.clock.now();
        payable.version += 1;

        self.ports.payables.update_payable(ctx, &payable, before.version).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountPayable, id, AuditAction::Cancelled)
                    .with_old(&before)
                    .with_new(&payable),
            )
            .await;
        Ok(payable)
    }

    pub async fn get_payable(&self, ctx: &TenantContext, id: PayableId) -> Result<AccountPayable, LedgerError> {
        Ok(self.ports.payables.get_payable(ctx, id).await?)
    }

    pub async fn list_payables(
        &self,
        ctx: &TenantContext,
        query: &ObligationQuery,
    ) -> Result<Vec<AccountPayable>, LedgerError> {
        Ok(self.ports.payables.find_payables(ctx, query).await?)
    }

    /// Outstanding payables due before `as_of` (today by default)
    pub async fn list_overdue_payables(
        &self,
        ctx: &TenantContext,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<AccountPayable>, LedgerError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let payables = self
            .ports
            .payables
            .find_payables(ctx, &ObligationQuery::outstanding())
            .await?;
        Ok(payables
            .into_iter()
            .filter(|p| p.obligation.is_overdue(as_of))
            .collect())
    }

    // ------------------------------------------------------------------
    // Receivables
    // ------------------------------------------------------------------

    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, customer_id = %request.customer_id))]
    pub async fn create_receivable(
        &self,
        ctx: &TenantContext,
        request: NewReceivable,
    ) -> Result<Vec<AccountReceivable>, LedgerError> {
        require_text(&request.description, "description")?;
        require_positive(&request.amount, "amount")?;
        if !self.ports.directory.customer_exists(ctx, request.customer_id).await? {
            return Err(LedgerError::not_found("Customer", request.customer_id));
        }

        let recorded_on = request.recorded_on.unwrap_or_else(|| self.clock.today());
        let occurrences = schedule(recorded_on, request.due_date, request.recurrence)?;
        self.guard
            .ensure_all_open(ctx, occurrences.iter().map(|o| o.recorded_on))
            .await?;

        let amount = request.amount.rounded();
        let converted = self.converter.convert(&amount, None).await?;
        let series_id = request.recurrence.map(|_| SeriesId::new_v7());
        let now = self.clock.now();

        let receivables: Vec<AccountReceivable> = occurrences
            .iter()
            .map(|occurrence| {
                let mut obligation =
                    Obligation::new(amount, converted.clone(), occurrence.recorded_on, occurrence.due_date);
                obligation.classification = request.classification;
                AccountReceivable {
                    id: ReceivableId::new_v7(),
                    company_id: ctx.company_id,
                    branch_id: ctx.branch_id,
                    customer_id: request.customer_id,
                    description: request.description.clone(),
                    category: request.category,
                    obligation,
                    recurrence: request.recurrence,
                    series: series_id.map(|series_id| SeriesRef {
                        series_id,
                        occurrence: occurrence.number,
                    }),
                    invoice_id: None,
                    review_flag: None,
                    created_by: ctx.user_id,
                    created_at: now,
                    updated_at: now,
                    version: 1,
                }
            })
            .collect();

        self.ports.receivables.insert_receivables(ctx, &receivables).await?;
        for receivable in &receivables {
            self.audit
                .record(
                    AuditEvent::new(ctx, AuditEntity::AccountReceivable, receivable.id, AuditAction::Created)
                        .with_new(receivable),
                )
                .await;
        }

        info!(count = receivables.len(), "receivables created");
        Ok(receivables)
    }

    /// Creates the receivable for an issued invoice, or returns the one that
    /// already exists. Safe to call any number of times per invoice.
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, invoice_id = %request.invoice_id))]
    pub async fn create_receivable_for_invoice(
        &self,
        ctx: &TenantContext,
        request: InvoiceReceivable,
    ) -> Result<ReceivableInsert, LedgerError> {
        if let Some(existing) = self.ports.receivables.find_by_invoice(ctx, request.invoice_id).await? {
            info!(receivable_id = %existing.id, "receivable already exists for invoice");
            return Ok(ReceivableInsert::Existing(existing));
        }
        require_positive(&request.amount, "invoice total")?;
        self.guard.ensure_open(ctx, request.recorded_on).await?;

        let now = self.clock.now();
        let receivable = AccountReceivable {
            id: ReceivableId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            customer_id: request.customer_id,
            description: request.description,
            category: request.category,
            obligation: Obligation::new(request.amount, request.converted, request.recorded_on, request.due_date),
            recurrence: None,
            series: None,
            invoice_id: Some(request.invoice_id),
            review_flag: None,
            created_by: ctx.user_id,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        let outcome = self.ports.receivables.insert_for_invoice(ctx, &receivable).await?;
        match &outcome {
            ReceivableInsert::Created(created) => {
                self.audit
                    .record(
                        AuditEvent::new(ctx, AuditEntity::AccountReceivable, created.id, AuditAction::Created)
                            .with_new(created),
                    )
                    .await;
                info!(receivable_id = %created.id, "receivable created for invoice");
            }
            ReceivableInsert::Existing(existing) => {
                info!(receivable_id = %existing.id, "receivable already exists for invoice");
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, receivable_id = %id))]
    pub async fn record_receivable_settlement(
        &self,
        ctx: &TenantContext,
        id: ReceivableId,
        request: SettlementRequest,
    ) -> Result<AccountReceivable, LedgerError> {
        self.guard.ensure_open(ctx, request.settled_on).await?;

        let mut receivable = self.ports.receivables.get_receivable(ctx, id).await?;
        let before = receivable.clone();
        receivable
            .obligation
            .apply_settlement(AccountReceivable::ENTITY, self.new_settlement(request))?;
        receivable.updated_at = self.clock.now();
        receivable.version += 1;

        self.ports
            .receivables
            .update_receivable(ctx, &receivable, before.version)
            .await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountReceivable, id, AuditAction::Settled)
                    .with_old(&before)
                    .with_new(&receivable),
            )
            .await;

        info!(status = %receivable.obligation.status, "receivable settlement recorded");
        Ok(receivable)
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id, receivable_id = %id))]
    pub async fn cancel_receivable(
        &self,
        ctx: &TenantContext,
        id: ReceivableId,
    ) -> Result<AccountReceivable, LedgerError> {
        let today = self.clock.today();
        self.guard.ensure_open(ctx, today).await?;

        let mut receivable = self.ports.receivables.get_receivable(ctx, id).await?;
        let before = receivable.clone();
        receivable.obligation.cancel(AccountReceivable::ENTITY, today)?;
        receivable.updated_at = self.clock.now();
        receivable.version += 1;

        self.ports
            .receivables
            .update_receivable(ctx, &receivable, before.version)
            .await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountReceivable, id, AuditAction::Cancelled)
                    .with_old(&before)
                    .with_new(&receivable),
            )
            .await;
        Ok(receivable)
    }

    /// Flags the still-outstanding receivable of `invoice_id` for review.
    ///
    /// Returns `None` when the invoice has no receivable or it is already
    /// paid or cancelled.
    #[instrument(skip(self, reason), fields(company_id = %ctx.company_id, invoice_id = %invoice_id))]
    pub async fn flag_invoice_receivable(
        &self,
        ctx: &TenantContext,
        invoice_id: InvoiceId,
        reason: impl Into<String>,
    ) -> Result<Option<AccountReceivable>, LedgerError> {
        let Some(mut receivable) = self.ports.receivables.find_by_invoice(ctx, invoice_id).await? else {
            return Ok(None);
        };
        if !receivable.obligation.status.is_outstanding() {
            return Ok(None);
        }
        if receivable.review_flag.is_some() {
            return Ok(Some(receivable));
        }

        let before = receivable.clone();
        let reason = reason.into();
        receivable.review_flag = Some(ReviewFlag {
            reason: reason.clone(),
            flagged_at: self.clock.now(),
        });
        receivable.updated_at = self.clock.now();
        receivable.version += 1;

        self.ports
            .receivables
            .update_receivable(ctx, &receivable, before.version)
            .await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountReceivable, receivable.id, AuditAction::Flagged)
                    .with_old(&before)
                    .with_new(&receivable),
            )
            .await;

        warn!(receivable_id = %receivable.id, %reason, "receivable flagged for review");
        Ok(Some(receivable))
    }

    pub async fn clear_review_flag(
        &self,
        ctx: &TenantContext,
        id: ReceivableId,
    ) -> Result<AccountReceivable, LedgerError> {
        let mut receivable = self.ports.receivables.get_receivable(ctx, id).await?;
        if receivable.review_flag.is_none() {
            return Err(LedgerError::validation(format!("receivable {} is not flagged", id)));
        }

        let before = receivable.clone();
        receivable.review_flag = None;
        receivable.updated_at = self.clock.now();
        receivable.version += 1;

        self.ports
            .receivables
            .update_receivable(ctx, &receivable, before.version)
            .await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::AccountReceivable, id, AuditAction::FlagCleared)
                    .with_old(&before)
                    .with_new(&receivable),
            )
            .await;
        Ok(receivable)
    }

    pub async fn get_receivable(
        &self,
        ctx: &TenantContext,
        id: ReceivableId,
    ) -> Result<AccountReceivable, LedgerError> {
        Ok(self.ports.receivables.get_receivable(ctx, id).await?)
    }

    pub async fn receivable_for_invoice(
        &self,
        ctx: &TenantContext,
        invoice_id: InvoiceId,
    ) -> Result<Option<AccountReceivable>, LedgerError> {
        Ok(self.ports.receivables.find_by_invoice(ctx, invoice_id).await?)
    }

    pub async fn list_receivables(
        &self,
        ctx: &TenantContext,
        query: &ObligationQuery,
    ) -> Result<Vec<AccountReceivable>, LedgerError> {
        Ok(self.ports.receivables.find_receivables(ctx, query).await?)
    }

    pub async fn list_overdue_receivables(
        &self,
        ctx: &TenantContext,
        as_of: Option<NaiveDate>,
    ) -> Result<Vec<AccountReceivable>, LedgerError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let receivables = self
            .ports
            .receivables
            .find_receivables(ctx, &ObligationQuery::outstanding())
            .await?;
        Ok(receivables
            .into_iter()
            .filter(|r| r.obligation.is_overdue(as_of))
            .collect())
    }

    pub async fn list_flagged_receivables(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<AccountReceivable>, LedgerError> {
        Ok(self.ports.receivables.find_flagged(ctx).await?)
    }

    // ------------------------------------------------------------------
    // Provisions
    // ------------------------------------------------------------------

    async fn ensure_subject_exists(
        &self,
        ctx: &TenantContext,
        subject: ProvisionSubject,
    ) -> Result<(), LedgerError> {
        let exists = match subject {
            ProvisionSubject::Employee(id) => self.ports.directory.employee_exists(ctx, id).await?,
            ProvisionSubject::Contract(id) => self.ports.directory.contract_exists(ctx, id).await?,
        };
        if !exists {
            return Err(match subject {
                ProvisionSubject::Employee(id) => LedgerError::not_found("Employee", id),
                ProvisionSubject::Contract(id) => LedgerError::not_found("Contract", id),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(company_id = %ctx.company_id))]
    pub async fn create_provision(
        &self,
        ctx: &TenantContext,
        request: NewProvision,
    ) -> Result<Provision, LedgerError> {
        require_text(&request.description, "description")?;
        require_positive(&request.amount, "amount")?;
        self.ensure_subject_exists(ctx, request.subject).await?;
        self.guard.ensure_open(ctx, request.provision_date).await?;

        let amount = request.amount.rounded();
        let converted = self.converter.convert(&amount, None).await?;
        let provision = Provision {
            id: ProvisionId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            subject: request.subject,
            description: request.description,
            amount,
            converted,
            provision_date: request.provision_date,
            status: ProvisionStatus::Active,
            reversed_at: None,
            reversed_on: None,
            supersedes: None,
            superseded_by: None,
            classification: request.classification,
            created_by: ctx.user_id,
            created_at: self.clock.now(),
            version: 1,
        };

        self.ports.provisions.insert_provision(ctx, &provision).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Provision, provision.id, AuditAction::Created)
                    .with_new(&provision),
            )
            .await;
        Ok(provision)
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id, provision_id = %id))]
    pub async fn reverse_provision(&self, ctx: &TenantContext, id: ProvisionId) -> Result<Provision, LedgerError> {
        let today = self.clock.today();
        self.guard.ensure_open(ctx, today).await?;

        let mut provision = self.ports.provisions.get_provision(ctx, id).await?;
        let before = provision.clone();
        provision.reverse(self.clock.now(), today)?;
        provision.version += 1;

        self.ports
            .provisions
            .update_provision(ctx, &provision, before.version)
            .await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Provision, id, AuditAction::Reversed)
                    .with_old(&before)
                    .with_new(&provision),
            )
            .await;

        info!("provision reversed");
        Ok(provision)
    }

    /// Replaces an active provision's estimate: the old provision is
    /// reversed and a new one records the new amount.
    ///
    /// Returns `(replacement, reversed)`.
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, provision_id = %id))]
    pub async fn supersede_provision(
        &self,
        ctx: &TenantContext,
        id: ProvisionId,
        request: SupersedeProvision,
    ) -> Result<(Provision, Provision), LedgerError> {
        require_positive(&request.amount, "amount")?;
        let today = self.clock.today();
        let provision_date = request.provision_date.unwrap_or(today);
        self.guard.ensure_all_open(ctx, [today, provision_date]).await?;

        let mut old = self.ports.provisions.get_provision(ctx, id).await?;
        let before = old.clone();

        let amount = request.amount.rounded();
        let converted = self.converter.convert(&amount, None).await?;
        let replacement = Provision {
            id: ProvisionId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            subject: old.subject,
            description: request.description.unwrap_or_else(|| old.description.clone()),
            amount,
            converted,
            provision_date,
            status: ProvisionStatus::Active,
            reversed_at: None,
            reversed_on: None,
            supersedes: Some(old.id),
            superseded_by: None,
            classification: old.classification,
            created_by: ctx.user_id,
            created_at: self.clock.now(),
            version: 1,
        };

        old.reverse(self.clock.now(), today)?;
        old.superseded_by = Some(replacement.id);
        old.version += 1;

        self.ports
            .provisions
            .supersede_provision(ctx, &old, before.version, &replacement)
            .await?;

        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Provision, old.id, AuditAction::Reversed)
                    .with_old(&before)
                    .with_new(&old),
            )
            .await;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Provision, replacement.id, AuditAction::Created)
                    .with_new(&replacement),
            )
            .await;

        info!(replacement_id = %replacement.id, "provision superseded");
        Ok((replacement, old))
    }

    pub async fn get_provision(&self, ctx: &TenantContext, id: ProvisionId) -> Result<Provision, LedgerError> {
        Ok(self.ports.provisions.get_provision(ctx, id).await?)
    }

    pub async fn list_provisions(
        &self,
        ctx: &TenantContext,
        query: &ProvisionQuery,
    ) -> Result<Vec<Provision>, LedgerError> {
        Ok(self.ports.provisions.find_provisions(ctx, query).await?)
    }

    // ------------------------------------------------------------------
    // Equity
    // ------------------------------------------------------------------

    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, kind = ?request.kind))]
    pub async fn record_equity_entry(
        &self,
        ctx: &TenantContext,
        request: NewEquityEntry,
    ) -> Result<EquityEntry, LedgerError> {
        require_text(&request.description, "description")?;
        require_positive(&request.amount, "amount")?;
        self.guard.ensure_open(ctx, request.entry_date).await?;

        let amount = request.amount.rounded();
        let converted = self.converter.convert(&amount, None).await?;
        let entry = EquityEntry {
            id: EquityEntryId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            kind: request.kind,
            amount,
            converted,
            entry_date: request.entry_date,
            description: request.description,
            created_by: ctx.user_id,
            created_at: self.clock.now(),
        };

        self.ports.equity.insert_equity_entry(ctx, &entry).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::EquityEntry, entry.id, AuditAction::Created)
                    .with_new(&entry),
            )
            .await;
        Ok(entry)
    }

    pub async fn list_equity_entries(
        &self,
        ctx: &TenantContext,
        up_to: Option<NaiveDate>,
    ) -> Result<Vec<EquityEntry>, LedgerError> {
        Ok(self.ports.equity.find_equity_entries(ctx, up_to).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{ExpenseCategory, RevenueCategory};
    use crate::obligation::ObligationStatus;
    use crate::period::PeriodLock;
    use crate::ports::mock::{InMemoryDirectory, InMemoryLedger};
    use crate::recurrence::RecurrenceFrequency;
    use chrono::Utc;
    use core_kernel::mock::InMemoryAuditSink;
    use core_kernel::{
        BranchId, CompanyId, Currency, CustomerId, EmployeeId, ErrorKind, FixedClock, SupplierId,
        UserId, YearMonth,
    };
    use domain_fx::{ConversionConfig, StaticRateProvider};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Harness {
        service: LedgerService,
        store: Arc<InMemoryLedger>,
        audit: Arc<InMemoryAuditSink>,
        rates: Arc<StaticRateProvider>,
        ctx: TenantContext,
    }

    async fn harness() -> Harness {
        let store = Arc::new(InMemoryLedger::new());
        let directory = Arc::new(InMemoryDirectory::permissive());
        let audit = Arc::new(InMemoryAuditSink::new());
        let clock = Arc::new(FixedClock::on_date(date(2025, 6, 15)));
        let rates = Arc::new(
            StaticRateProvider::with_rates("test-table", [(Currency::EUR, Currency::USD, dec!(1.10))]).await,
        );
        let converter = Arc::new(CurrencyConverter::with_clock(
            rates.clone(),
            ConversionConfig::default(),
            clock.clone(),
        ));
        let service = LedgerService::new(
            LedgerPorts::in_memory(store.clone(), directory),
            converter,
            audit.clone(),
            clock,
        );
        Harness {
            service,
            store,
            audit,
            rates,
            ctx: TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new()),
        }
    }

    fn rent(amount: Money) -> NewPayable {
        NewPayable {
            supplier_id: SupplierId::new(),
            description: "Office rent".to_string(),
            amount,
            category: ExpenseCategory::Rent,
            recorded_on: Some(date(2025, 1, 1)),
            due_date: date(2025, 1, 10),
            recurrence: None,
            document_id: None,
            classification: None,
        }
    }

    fn consulting(amount: Money, due_date: NaiveDate) -> NewReceivable {
        NewReceivable {
            customer_id: CustomerId::new(),
            description: "Consulting retainer".to_string(),
            amount,
            category: RevenueCategory::Services,
            recorded_on: Some(date(2025, 5, 1)),
            due_date,
            recurrence: None,
            classification: None,
        }
    }

    async fn lock(h: &Harness, period: &str) {
        let lock = PeriodLock {
            company_id: h.ctx.company_id,
            period: period.parse::<YearMonth>().unwrap(),
            locked_at: Utc::now(),
            locked_by: h.ctx.user_id,
        };
        h.store.insert_lock(&h.ctx, &lock).await.unwrap();
    }

    #[tokio::test]
    async fn test_monthly_series_is_materialized_with_one_snapshot() {
        let h = harness().await;
        let mut request = rent(Money::new(dec!(1000), Currency::EUR));
        request.recurrence = Some(Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2025, 12, 31),
        });

        let series = h.service.create_payable(&h.ctx, request).await.unwrap();

        assert_eq!(series.len(), 12);
        let series_id = series[0].series.unwrap().series_id;
        assert!(series.iter().all(|p| p.series.unwrap().series_id == series_id));
        assert!(series.iter().all(|p| p.obligation.converted == series[0].obligation.converted));
        assert_eq!(series[0].obligation.converted.reporting_amount, dec!(1100.00));
        assert_eq!(series[11].obligation.due_date, date(2025, 12, 10));
        assert_eq!(series[11].obligation.recorded_on, date(2025, 12, 1));
        assert_eq!(
            h.audit.matching(AuditEntity::AccountPayable, AuditAction::Created).await.len(),
            12
        );
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_rejected() {
        let store = Arc::new(InMemoryLedger::new());
        let clock = Arc::new(FixedClock::on_date(date(2025, 6, 15)));
        let converter = Arc::new(CurrencyConverter::new(
            Arc::new(StaticRateProvider::new("empty")),
            ConversionConfig::default(),
        ));
        let service = LedgerService::new(
            LedgerPorts::in_memory(store.clone(), Arc::new(InMemoryDirectory::new())),
            converter,
            Arc::new(InMemoryAuditSink::new()),
            clock,
        );
        let ctx = TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new());

        let err = service
            .create_payable(&ctx, rent(Money::new(dec!(10), Currency::USD)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_missing_rate_blocks_the_write() {
        let h = harness().await;
        h.rates.remove_rate(Currency::EUR, Currency::USD).await;

        let err = h
            .service
            .create_payable(&h.ctx, rent(Money::new(dec!(50), Currency::EUR)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RateUnavailable);
        let stored = h.service.list_payables(&h.ctx, &ObligationQuery::default()).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_settlements_move_payable_to_partial_then_paid() {
        let h = harness().await;
        let payable = h
            .service
            .create_payable(&h.ctx, rent(Money::new(dec!(300), Currency::USD)))
            .await
            .unwrap()
            .remove(0);

        let partial = h
            .service
            .record_payable_settlement(
                &h.ctx,
                payable.id,
                SettlementRequest {
                    amount: dec!(100),
                    settled_on: date(2025, 2, 1),
                    reference: Some("TRX-1".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(partial.obligation.status, ObligationStatus::Partial);
        assert_eq!(partial.obligation.outstanding(), dec!(200));
        assert_eq!(partial.version, 2);

        let too_much = h
            .service
            .record_payable_settlement(
                &h.ctx,
                payable.id,
                SettlementRequest {
                    amount: dec!(250),
                    settled_on: date(2025, 2, 2),
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(too_much.kind(), ErrorKind::Validation);

        let paid = h
            .service
            .record_payable_settlement(
                &h.ctx,
                payable.id,
                SettlementRequest {
                    amount: dec!(200),
                    settled_on: date(2025, 3, 1),
                    reference: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.obligation.status, ObligationStatus::Paid);
        assert_eq!(paid.obligation.paid_on, Some(date(2025, 3, 1)));

        let err = h.service.cancel_payable(&h.ctx, payable.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    }

    #[tokio::test]
    async fn test_closed_period_refuses_dated_mutations() {
        let h = harness().await;
        let payable = h
            .service
            .create_payable(&h.ctx, rent(Money::new(dec!(300), Currency::USD)))
            .await
            .unwrap()
            .remove(0);
        lock(&h, "2025-02").await;

        let err = h
            .service
            .record_payable_settlement(
                &h.ctx,
                payable.id,
                SettlementRequest {
                    amount: dec!(100),
                    settled_on: date(2025, 2, 14),
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::PeriodClosed(p) if p.to_string() == "2025-02"));

        let mut backdated = rent(Money::new(dec!(10), Currency::USD));
        backdated.recorded_on = Some(date(2025, 2, 3));
        let err = h.service.create_payable(&h.ctx, backdated).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PeriodClosed);
    }

    #[tokio::test]
    async fn test_stale_version_surfaces_as_conflict() {
        let h = harness().await;
        let payable = h
            .service
            .create_payable(&h.ctx, rent(Money::new(dec!(300), Currency::USD)))
            .await
            .unwrap()
            .remove(0);
        h.service.cancel_payable(&h.ctx, payable.id).await.unwrap();

        let err: LedgerError = h
            .store
            .update_payable(&h.ctx, &payable, payable.version)
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::ConcurrencyConflict);
    }

    #[tokio::test]
    async fn test_invoice_receivable_is_created_once() {
        let h = harness().await;
        let amount = Money::new(dec!(239.00), Currency::USD);
        let request = InvoiceReceivable {
            invoice_id: InvoiceId::new(),
            customer_id: CustomerId::new(),
            description: "Invoice INV-2025000001".to_string(),
            amount,
            converted: domain_fx::ConvertedAmount::identity(&amount, Utc::now()),
            category: RevenueCategory::Services,
            recorded_on: date(2025, 6, 15),
            due_date: date(2025, 7, 15),
        };

        let first = h.service.create_receivable_for_invoice(&h.ctx, request.clone()).await.unwrap();
        let second = h.service.create_receivable_for_invoice(&h.ctx, request).await.unwrap();

        assert!(first.was_created());
        assert!(!second.was_created());
        assert_eq!(first.receivable().id, second.receivable().id);
        assert_eq!(h.store.receivable_count().await, 1);
        assert_eq!(
            h.audit.matching(AuditEntity::AccountReceivable, AuditAction::Created).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn test_existing_invoice_receivable_returned_after_close() {
        let h = harness().await;
        let amount = Money::new(dec!(239.00), Currency::USD);
        let request = InvoiceReceivable {
            invoice_id: InvoiceId::new(),
            customer_id: CustomerId::new(),
            description: "Invoice INV-2025000002".to_string(),
            amount,
            converted: domain_fx::ConvertedAmount::identity(&amount, Utc::now()),
            category: RevenueCategory::Services,
            recorded_on: date(2025, 6, 15),
            due_date: date(2025, 7, 15),
        };
        let first = h.service.create_receivable_for_invoice(&h.ctx, request.clone()).await.unwrap();
        lock(&h, "2025-06").await;

        let again = h.service.create_receivable_for_invoice(&h.ctx, request).await.unwrap();

        assert!(!again.was_created());
        assert_eq!(again.receivable().id, first.receivable().id);
        assert_eq!(h.store.receivable_count().await, 1);
    }

    #[tokio::test]
    async fn test_flagging_only_touches_outstanding_receivables() {
        let h = harness().await;
        let amount = Money::new(dec!(80), Currency::USD);
        let invoice_id = InvoiceId::new();
        let created = h
            .service
            .create_receivable_for_invoice(
                &h.ctx,
                InvoiceReceivable {
                    invoice_id,
                    customer_id: CustomerId::new(),
                    description: "Invoice".to_string(),
                    amount,
                    converted: domain_fx::ConvertedAmount::identity(&amount, Utc::now()),
                    category: RevenueCategory::Products,
                    recorded_on: date(2025, 6, 1),
                    due_date: date(2025, 6, 30),
                },
            )
            .await
            .unwrap()
            .into_receivable();

        let flagged = h
            .service
            .flag_invoice_receivable(&h.ctx, invoice_id, "invoice cancelled")
            .await
            .unwrap()
            .unwrap();
        assert!(flagged.needs_review());
        assert_eq!(h.service.list_flagged_receivables(&h.ctx).await.unwrap().len(), 1);

        let cleared = h.service.clear_review_flag(&h.ctx, created.id).await.unwrap();
        assert!(!cleared.needs_review());

        h.service
            .record_receivable_settlement(
                &h.ctx,
                created.id,
                SettlementRequest {
                    amount: dec!(80),
                    settled_on: date(2025, 6, 10),
                    reference: None,
                },
            )
            .await
            .unwrap();
        let none = h
            .service
            .flag_invoice_receivable(&h.ctx, invoice_id, "invoice cancelled")
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_overdue_listing_uses_as_of_date() {
        let h = harness().await;
        h.service
            .create_receivable(&h.ctx, consulting(Money::new(dec!(500), Currency::USD), date(2025, 6, 1)))
            .await
            .unwrap();
        h.service
            .create_receivable(&h.ctx, consulting(Money::new(dec!(700), Currency::USD), date(2025, 6, 20)))
            .await
            .unwrap();

        let today = h.service.list_overdue_receivables(&h.ctx, None).await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].obligation.amount.amount(), dec!(500));

        let later = h
            .service
            .list_overdue_receivables(&h.ctx, Some(date(2025, 7, 1)))
            .await
            .unwrap();
        assert_eq!(later.len(), 2);
    }

    #[tokio::test]
    async fn test_supersede_reverses_and_links_provisions() {
        let h = harness().await;
        let employee = EmployeeId::new();
        let original = h
            .service
            .create_provision(
                &h.ctx,
                NewProvision {
                    subject: ProvisionSubject::Employee(employee),
                    description: "Vacation accrual".to_string(),
                    amount: Money::new(dec!(1200), Currency::USD),
                    provision_date: date(2025, 5, 31),
                    classification: None,
                },
            )
            .await
            .unwrap();

        let (replacement, reversed) = h
            .service
            .supersede_provision(
                &h.ctx,
                original.id,
                SupersedeProvision {
                    amount: Money::new(dec!(1500), Currency::USD),
                    description: None,
                    provision_date: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(reversed.status, ProvisionStatus::Reversed);
        assert_eq!(reversed.superseded_by, Some(replacement.id));
        assert_eq!(replacement.supersedes, Some(original.id));
        assert_eq!(replacement.description, "Vacation accrual");
        assert_eq!(replacement.provision_date, date(2025, 6, 15));

        let err = h.service.reverse_provision(&h.ctx, original.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);

        let active = h
            .service
            .list_provisions(
                &h.ctx,
                &ProvisionQuery {
                    status: Some(ProvisionStatus::Active),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, replacement.id);
    }

    #[tokio::test]
    async fn test_failed_supersede_writes_nothing() {
        let h = harness().await;
        let original = h
            .service
            .create_provision(
                &h.ctx,
                NewProvision {
                    subject: ProvisionSubject::Employee(EmployeeId::new()),
                    description: "Vacation accrual".to_string(),
                    amount: Money::new(dec!(1200), Currency::USD),
                    provision_date: date(2025, 5, 31),
                    classification: None,
                },
            )
            .await
            .unwrap();

        let mut replacement = original.clone();
        replacement.id = ProvisionId::new_v7();
        replacement.supersedes = Some(original.id);
        let mut reversed = original.clone();
        reversed.reverse(Utc::now(), date(2025, 6, 15)).unwrap();
        reversed.superseded_by = Some(replacement.id);
        reversed.version += 1;

        // Another writer got there first
        let err = h
            .store
            .supersede_provision(&h.ctx, &reversed, original.version + 1, &replacement)
            .await
            .unwrap_err();
        assert_eq!(LedgerError::from(err).kind(), ErrorKind::ConcurrencyConflict);

        // Replacement id already taken
        let err = h
            .store
            .supersede_provision(&h.ctx, &reversed, original.version, &original)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let stored = h.service.get_provision(&h.ctx, original.id).await.unwrap();
        assert_eq!(stored.status, ProvisionStatus::Active);
        assert_eq!(stored.superseded_by, None);
        assert_eq!(stored.version, original.version);
        assert!(h.service.get_provision(&h.ctx, replacement.id).await.is_err());
        assert_eq!(h.service.list_provisions(&h.ctx, &ProvisionQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_equity_entries_require_positive_amounts() {
        let h = harness().await;
        let err = h
            .service
            .record_equity_entry(
                &h.ctx,
                NewEquityEntry {
                    kind: crate::equity::EquityKind::Contribution,
                    amount: Money::new(dec!(0), Currency::USD),
                    entry_date: date(2025, 1, 1),
                    description: "Seed capital".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        h.service
            .record_equity_entry(
                &h.ctx,
                NewEquityEntry {
                    kind: crate::equity::EquityKind::Contribution,
                    amount: Money::new(dec!(10000), Currency::USD),
                    entry_date: date(2025, 1, 1),
                    description: "Seed capital".to_string(),
                },
            )
            .await
            .unwrap();
        let entries = h.service.list_equity_entries(&h.ctx, Some(date(2025, 1, 31))).await.unwrap();
        assert_eq!(entries.len(), 1);
    }
}
