//! Invoice lifecycle service
//!
//! Creating an invoice allocates its number and freezes the conversion of
//! its total. Issuing it raises exactly one receivable through the ledger;
//! cancelling it leaves that receivable alone but flags it for review.

use chrono::NaiveDate;
use core_kernel::{
    AuditAction, AuditEntity, AuditEvent, AuditSink, Clock, InvoiceId, Money, ReceivableId, TenantContext,
};
use domain_fx::CurrencyConverter;
use domain_ledger::{
    AccountReceivable, CounterpartyDirectory, InvoiceReceivable, LedgerService, ObligationStatus, ReceivableInsert,
    SettlementRequest,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::InvoiceError;
use crate::invoice::{CreateInvoiceRequest, Invoice, InvoiceStatus};
use crate::line::{price_lines, InvoiceTotals, LineInput};
use crate::numbering::InvoiceNumberingService;
use crate::ports::{InvoicePort, InvoiceQuery};

pub struct InvoiceService {
    invoices: Arc<dyn InvoicePort>,
    numbering: InvoiceNumberingService,
    ledger: Arc<LedgerService>,
    converter: Arc<CurrencyConverter>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoicePort>,
        numbering: InvoiceNumberingService,
        ledger: Arc<LedgerService>,
        converter: Arc<CurrencyConverter>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            invoices,
            numbering,
            ledger,
            converter,
            audit,
            clock,
        }
    }

    async fn ensure_open(&self, ctx: &TenantContext, dates: &[NaiveDate]) -> Result<(), InvoiceError> {
        self.ledger
            .period_guard()
            .ensure_all_open(ctx, dates.iter().copied())
            .await?;
        Ok(())
    }

    /// Creates a draft invoice with the next number
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, customer_id = %request.customer_id))]
    pub async fn create_invoice(
        &self,
        ctx: &TenantContext,
        request: CreateInvoiceRequest,
    ) -> Result<Invoice, InvoiceError> {
        if request.due_date < request.issue_date {
            return Err(InvoiceError::validation(format!(
                "due date {} is before issue date {}",
                request.due_date, request.issue_date
            )));
        }
        let lines = price_lines(request.lines)?;
        let totals = InvoiceTotals::of(&lines);
        if let Some(declared) = &request.declared_totals {
            totals.check_declared(declared)?;
        }

        let directory = &self.ledger.ports().directory;
        if !directory.customer_exists(ctx, request.customer_id).await? {
            return Err(InvoiceError::not_found("Customer", request.customer_id));
        }
        if let Some(contract_id) = request.contract_id {
            if !directory.contract_exists(ctx, contract_id).await? {
                return Err(InvoiceError::not_found("Contract", contract_id));
            }
        }
        self.ensure_open(ctx, &[request.issue_date]).await?;

        let converted = self
            .converter
            .convert(&Money::new(totals.total, request.currency), None)
            .await?;
        let number = self.numbering.next_invoice_number(ctx).await?;
        let now = self.clock.now();

        let mut invoice = Invoice {
            id: InvoiceId::new_v7(),
            company_id: ctx.company_id,
            branch_id: ctx.branch_id,
            number,
            customer_id: request.customer_id,
            contract_id: request.contract_id,
            issue_date: request.issue_date,
            due_date: request.due_date,
            currency: request.currency,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total: totals.total,
            converted,
            status: InvoiceStatus::Draft,
            notes: request.notes,
            language: request.language,
            template_id: request.template_id,
            category: request.category,
            lines: Vec::new(),
            created_by: ctx.user_id,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        invoice.set_lines(lines);

        self.invoices.insert_invoice(ctx, &invoice).await?;
        self.audit
            .record(AuditEvent::new(ctx, AuditEntity::Invoice, invoice.id, AuditAction::Created).with_new(&invoice))
            .await;

        info!(invoice_id = %invoice.id, number = %invoice.number, total = %invoice.total, "invoice created");
        Ok(invoice)
    }

    /// Replaces the lines of a draft invoice and re-prices it
    #[instrument(skip(self, lines), fields(company_id = %ctx.company_id, invoice_id = %id))]
    pub async fn update_draft_lines(
        &self,
        ctx: &TenantContext,
        id: InvoiceId,
        lines: Vec<LineInput>,
    ) -> Result<Invoice, InvoiceError> {
        let mut invoice = self.invoices.get_invoice(ctx, id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(InvoiceError::transition(invoice.status, "edited"));
        }
        self.ensure_open(ctx, &[invoice.issue_date]).await?;

        let before = invoice.clone();
        invoice.set_lines(price_lines(lines)?);
        invoice.converted = self.converter.convert(&invoice.total_money(), None).await?;
        invoice.updated_at = self.clock.now();
        invoice.version += 1;

        self.invoices.update_invoice(ctx, &invoice, before.version).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Invoice, id, AuditAction::Updated)
                    .with_old(&before)
                    .with_new(&invoice),
            )
            .await;
        Ok(invoice)
    }

    /// Moves the invoice to `next`.
    ///
    /// Entering `issued` raises the receivable. Asking for `issued` again on
    /// an issued invoice changes nothing but makes sure the receivable exists.
    /// `paid` settles whatever is still outstanding on the receivable first;
    /// `partial` is only accepted once the receivable is partially settled.
    #[instrument(skip(self), fields(company_id = %ctx.company_id, invoice_id = %id, next = %next))]
    pub async fn transition_status(
        &self,
        ctx: &TenantContext,
        id: InvoiceId,
        next: InvoiceStatus,
    ) -> Result<Invoice, InvoiceError> {
        if next == InvoiceStatus::Cancelled {
            return self.cancel_invoice(ctx, id).await;
        }

        let invoice = self.invoices.get_invoice(ctx, id).await?;
        if next == InvoiceStatus::Issued && invoice.status == InvoiceStatus::Issued {
            self.ensure_receivable(ctx, &invoice).await?;
            return Ok(invoice);
        }
        if !invoice.status.can_transition_to(next) {
            return Err(InvoiceError::transition(invoice.status, next));
        }

        match next {
            InvoiceStatus::Paid | InvoiceStatus::Partial => self.settle_to(ctx, invoice, next).await,
            _ => self.apply_status(ctx, invoice, next).await,
        }
    }

    async fn apply_status(
        &self,
        ctx: &TenantContext,
        mut invoice: Invoice,
        next: InvoiceStatus,
    ) -> Result<Invoice, InvoiceError> {
        let before = invoice.clone();
        invoice.transition(next)?;
        let today = self.clock.today();
        if next == InvoiceStatus::Issued {
            if invoice.total.is_zero() {
                return Err(InvoiceError::validation(format!(
                    "invoice {} has a zero total and cannot be issued",
                    invoice.number
                )));
            }
            self.ensure_open(ctx, &[today, invoice.issue_date]).await?;
        } else {
            self.ensure_open(ctx, &[today]).await?;
        }
        invoice.updated_at = self.clock.now();
        invoice.version += 1;

        self.invoices.update_invoice(ctx, &invoice, before.version).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Invoice, invoice.id, AuditAction::StatusChanged)
                    .with_old(&before)
                    .with_new(&invoice),
            )
            .await;
        info!(from = %before.status, to = %invoice.status, "invoice status changed");

        if next == InvoiceStatus::Issued {
            self.ensure_receivable(ctx, &invoice).await?;
        }
        Ok(invoice)
    }

    /// Brings the receivable in line with a requested `paid` or `partial`
    async fn settle_to(
        &self,
        ctx: &TenantContext,
        invoice: Invoice,
        next: InvoiceStatus,
    ) -> Result<Invoice, InvoiceError> {
        let today = self.clock.today();
        self.ensure_open(ctx, &[today]).await?;
        let receivable = self.ensure_receivable(ctx, &invoice).await?.into_receivable();
        let outstanding = receivable.obligation.outstanding();

        let receivable = match next {
            InvoiceStatus::Paid if outstanding > Decimal::ZERO => {
                let settlement = SettlementRequest {
                    amount: outstanding,
                    settled_on: today,
                    reference: Some(format!("invoice {} marked paid", invoice.number)),
                };
                self.ledger
                    .record_receivable_settlement(ctx, receivable.id, settlement)
                    .await?
            }
            InvoiceStatus::Partial if receivable.obligation.status != ObligationStatus::Partial => {
                return Err(InvoiceError::validation(format!(
                    "invoice {} has no partial payment recorded against its receivable",
                    invoice.number
                )));
            }
            _ => receivable,
        };
        self.sync_with_receivable(ctx, invoice.id, &receivable).await
    }

    /// Moves the invoice to `partial` or `paid` to match its receivable
    async fn sync_with_receivable(
        &self,
        ctx: &TenantContext,
        id: InvoiceId,
        receivable: &AccountReceivable,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = self.invoices.get_invoice(ctx, id).await?;
        let target = match receivable.obligation.status {
            ObligationStatus::Paid => InvoiceStatus::Paid,
            ObligationStatus::Partial => InvoiceStatus::Partial,
            _ => return Ok(invoice),
        };
        if invoice.status == target || !invoice.status.can_transition_to(target) {
            return Ok(invoice);
        }
        self.apply_status(ctx, invoice, target).await
    }

    /// Records a payment against the invoice's receivable
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, invoice_id = %id))]
    pub async fn record_payment(
        &self,
        ctx: &TenantContext,
        id: InvoiceId,
        request: SettlementRequest,
    ) -> Result<Invoice, InvoiceError> {
        let invoice = self.invoices.get_invoice(ctx, id).await?;
        if !invoice.status.is_receivable() {
            return Err(InvoiceError::validation(format!(
                "invoice {} is {} and does not accept payments",
                invoice.number, invoice.status
            )));
        }
        let receivable = self.ensure_receivable(ctx, &invoice).await?.into_receivable();
        let receivable = self
            .ledger
            .record_receivable_settlement(ctx, receivable.id, request)
            .await?;
        self.sync_with_receivable(ctx, id, &receivable).await
    }

    /// Settles a receivable and carries the result over to its invoice, if any
    #[instrument(skip(self, request), fields(company_id = %ctx.company_id, receivable_id = %id))]
    pub async fn settle_receivable(
        &self,
        ctx: &TenantContext,
        id: ReceivableId,
        request: SettlementRequest,
    ) -> Result<AccountReceivable, InvoiceError> {
        let receivable = self.ledger.record_receivable_settlement(ctx, id, request).await?;
        if let Some(invoice_id) = receivable.invoice_id {
            self.sync_with_receivable(ctx, invoice_id, &receivable).await?;
        }
        Ok(receivable)
    }

    async fn ensure_receivable(&self, ctx: &TenantContext, invoice: &Invoice) -> Result<ReceivableInsert, InvoiceError> {
        let request = InvoiceReceivable {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            description: format!("Invoice {}", invoice.number),
            amount: invoice.total_money(),
            converted: invoice.converted.clone(),
            category: invoice.category,
            recorded_on: invoice.issue_date,
            due_date: invoice.due_date,
        };
        Ok(self.ledger.create_receivable_for_invoice(ctx, request).await?)
    }

    /// Cancels the invoice and flags its still-open receivable for review
    #[instrument(skip(self), fields(company_id = %ctx.company_id, invoice_id = %id))]
    pub async fn cancel_invoice(&self, ctx: &TenantContext, id: InvoiceId) -> Result<Invoice, InvoiceError> {
        let mut invoice = self.invoices.get_invoice(ctx, id).await?;
        let before = invoice.clone();
        invoice.transition(InvoiceStatus::Cancelled)?;
        self.ensure_open(ctx, &[self.clock.today()]).await?;
        invoice.updated_at = self.clock.now();
        invoice.version += 1;

        self.invoices.update_invoice(ctx, &invoice, before.version).await?;
        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::Invoice, id, AuditAction::Cancelled)
                    .with_old(&before)
                    .with_new(&invoice),
            )
            .await;
        info!(number = %invoice.number, "invoice cancelled");

        if before.status != InvoiceStatus::Draft {
            self.ledger
                .flag_invoice_receivable(ctx, id, format!("invoice {} was cancelled", invoice.number))
                .await?;
        }
        Ok(invoice)
    }

    pub async fn get_invoice(&self, ctx: &TenantContext, id: InvoiceId) -> Result<Invoice, InvoiceError> {
        Ok(self.invoices.get_invoice(ctx, id).await?)
    }

    pub async fn list_invoices(&self, ctx: &TenantContext, query: &InvoiceQuery) -> Result<Vec<Invoice>, InvoiceError> {
        Ok(self.invoices.find_invoices(ctx, query).await?)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
