//! Monthly close
//!
//! Summarizes a month and locks it. While the lock exists the ledger and
//! invoicing services refuse every mutation dated into that month.

use chrono::NaiveDate;
use core_kernel::{AuditAction, AuditEntity, AuditEvent, AuditSink, Clock, Currency, TenantContext, YearMonth};
use domain_invoicing::{Invoice, InvoiceStatus};
use domain_ledger::{AccountPayable, AccountReceivable, Obligation, PeriodLock, PeriodLockPort};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::ReportingError;
use crate::figures::Figure;
use crate::sources::ReportingSources;
use crate::statements::generate_profit_and_loss;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year_month: YearMonth,
    pub reporting_currency: Currency,
    /// Invoices issued in the month, drafts and cancellations excluded
    pub invoice_count: usize,
    pub total_revenue: Figure,
    pub total_open_ar: Figure,
    pub total_open_ap: Figure,
    pub net_income: Figure,
    pub is_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedMonth {
    pub summary: MonthlySummary,
    pub lock: PeriodLock,
}

fn open_balance<'a>(as_of: NaiveDate, records: impl Iterator<Item = &'a Obligation>) -> Figure {
    let mut figure = Figure::zero(true);
    for obligation in records {
        let native = obligation.outstanding_as_of(as_of);
        if !native.is_zero() {
            figure.add(
                obligation.amount.currency(),
                native,
                obligation.outstanding_reporting_as_of(as_of),
            );
        }
    }
    figure
}

/// Aggregates one month. Open balances are taken at the month's last day.
pub fn summarize_month(
    year_month: YearMonth,
    reporting_currency: Currency,
    is_closed: bool,
    invoices: &[Invoice],
    payables: &[AccountPayable],
    receivables: &[AccountReceivable],
) -> MonthlySummary {
    let counted: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| year_month.contains(i.issue_date))
        .filter(|i| !matches!(i.status, InvoiceStatus::Draft | InvoiceStatus::Cancelled))
        .collect();

    let mut total_revenue = Figure::zero(true);
    for invoice in &counted {
        total_revenue.add(invoice.currency, invoice.total, invoice.converted.reporting_amount);
    }

    let month_end = year_month.last_day();
    let pnl = generate_profit_and_loss(year_month.as_range(), true, reporting_currency, payables, receivables);

    MonthlySummary {
        year_month,
        reporting_currency,
        invoice_count: counted.len(),
        total_revenue,
        total_open_ar: open_balance(month_end, receivables.iter().map(|r| &r.obligation)),
        total_open_ap: open_balance(month_end, payables.iter().map(|p| &p.obligation)),
        net_income: pnl.net_income,
        is_closed,
    }
}

/// Summaries, locks and unlocks of calendar months
pub struct MonthlyCloseService {
    sources: ReportingSources,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    reporting_currency: Currency,
}

impl MonthlyCloseService {
    pub fn new(
        sources: ReportingSources,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        reporting_currency: Currency,
    ) -> Self {
        Self {
            sources,
            audit,
            clock,
            reporting_currency,
        }
    }

    fn locks(&self) -> &Arc<dyn PeriodLockPort> {
        &self.sources.ledger.period_locks
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id, period = %year_month))]
    pub async fn summarize_month(
        &self,
        ctx: &TenantContext,
        year_month: YearMonth,
    ) -> Result<MonthlySummary, ReportingError> {
        let month_end = year_month.last_day();
        let invoices = self
            .sources
            .invoices_issued_between(ctx, year_month.first_day(), month_end)
            .await?;
        let payables = self.sources.payables(ctx, Some(month_end)).await?;
        let receivables = self.sources.receivables(ctx, Some(month_end)).await?;
        let is_closed = self.locks().get_lock(ctx, year_month).await?.is_some();

        Ok(summarize_month(
            year_month,
            self.reporting_currency,
            is_closed,
            &invoices,
            &payables,
            &receivables,
        ))
    }

    /// Summarizes the month and locks it against further mutation
    #[instrument(skip(self), fields(company_id = %ctx.company_id, period = %year_month))]
    pub async fn close_month(&self, ctx: &TenantContext, year_month: YearMonth) -> Result<ClosedMonth, ReportingError> {
        let mut summary = self.summarize_month(ctx, year_month).await?;
        if summary.is_closed {
            return Err(ReportingError::AlreadyClosed(year_month));
        }

        let lock = PeriodLock {
            company_id: ctx.company_id,
            period: year_month,
            locked_at: self.clock.now(),
            locked_by: ctx.user_id,
        };
        self.locks().insert_lock(ctx, &lock).await.map_err(|e| {
            if e.is_conflict() {
                ReportingError::AlreadyClosed(year_month)
            } else {
                e.into()
            }
        })?;
        summary.is_closed = true;

        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::PeriodClose, year_month, AuditAction::Closed).with_new(&summary),
            )
            .await;
        info!(invoice_count = summary.invoice_count, "period closed");
        Ok(ClosedMonth { summary, lock })
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id, period = %year_month))]
    pub async fn reopen_month(&self, ctx: &TenantContext, year_month: YearMonth) -> Result<(), ReportingError> {
        let existing = self
            .locks()
            .get_lock(ctx, year_month)
            .await?
            .ok_or(ReportingError::NotClosed(year_month))?;
        if !self.locks().delete_lock(ctx, year_month).await? {
            return Err(ReportingError::NotClosed(year_month));
        }

        self.audit
            .record(
                AuditEvent::new(ctx, AuditEntity::PeriodClose, year_month, AuditAction::Reopened).with_old(&existing),
            )
            .await;
        info!("period reopened");
        Ok(())
    }

    pub async fn closed_periods(&self, ctx: &TenantContext) -> Result<Vec<PeriodLock>, ReportingError> {
        Ok(self.locks().list_locks(ctx).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::mock::InMemoryAuditSink;
    use core_kernel::{BranchId, CompanyId, CustomerId, ErrorKind, FixedClock, Money, SupplierId, UserId};
    use domain_fx::{ConversionConfig, CurrencyConverter, StaticRateProvider};
    use domain_invoicing::ports::mock::{InMemoryInvoiceStore, InMemorySequenceStore};
    use domain_invoicing::{CreateInvoiceRequest, InvoiceNumberingService, InvoiceService, LineInput};
    use domain_ledger::ports::mock::{InMemoryDirectory, InMemoryLedger};
    use domain_ledger::{ExpenseCategory, LedgerPorts, LedgerService, NewPayable, NewReceivable, RevenueCategory, SettlementRequest};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn june() -> YearMonth {
        "2025-06".parse().unwrap()
    }

    struct Harness {
        close: MonthlyCloseService,
        ledger: Arc<LedgerService>,
        invoicing: InvoiceService,
        audit: Arc<InMemoryAuditSink>,
        ctx: TenantContext,
    }

    async fn harness() -> Harness {
        let clock = Arc::new(FixedClock::on_date(date(2025, 6, 15)));
        let audit = Arc::new(InMemoryAuditSink::new());
        let rates = Arc::new(
            StaticRateProvider::with_rates("test-table", [(Currency::EUR, Currency::USD, dec!(1.10))]).await,
        );
        let converter = Arc::new(CurrencyConverter::with_clock(rates, ConversionConfig::default(), clock.clone()));
        let ports = LedgerPorts::in_memory(
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryDirectory::permissive()),
        );
        let ledger = Arc::new(LedgerService::new(ports.clone(), converter.clone(), audit.clone(), clock.clone()));
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let invoicing = InvoiceService::new(
            invoices.clone(),
            InvoiceNumberingService::new(Arc::new(InMemorySequenceStore::new()), clock.clone()),
            ledger.clone(),
            converter,
            audit.clone(),
            clock.clone(),
        );
        let close = MonthlyCloseService::new(
            ReportingSources::new(ports, invoices),
            audit.clone(),
            clock,
            Currency::USD,
        );
        Harness {
            close,
            ledger,
            invoicing,
            audit,
            ctx: TenantContext::new(CompanyId::new(), BranchId::new(), UserId::new()),
        }
    }

    fn invoice_request() -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            customer_id: CustomerId::new(),
            contract_id: None,
            issue_date: date(2025, 6, 10),
            due_date: date(2025, 7, 10),
            currency: Currency::USD,
            lines: vec![
                LineInput::new("Consulting", dec!(2), dec!(100.00))
                    .with_discount(dec!(10))
                    .with_tax(dec!(5)),
                LineInput::new("Travel", dec!(1), dec!(50.00)),
            ],
            declared_totals: None,
            notes: None,
            language: None,
            template_id: None,
            category: Default::default(),
        }
    }

    async fn seed_june(h: &Harness) {
        let issued = h.invoicing.create_invoice(&h.ctx, invoice_request()).await.unwrap();
        h.invoicing
            .transition_status(&h.ctx, issued.id, InvoiceStatus::Issued)
            .await
            .unwrap();
        // stays draft, not counted
        h.invoicing.create_invoice(&h.ctx, invoice_request()).await.unwrap();

        let payable = h
            .ledger
            .create_payable(
                &h.ctx,
                NewPayable {
                    supplier_id: SupplierId::new(),
                    description: "Office rent".to_string(),
                    amount: Money::new(dec!(500.00), Currency::USD),
                    category: ExpenseCategory::Rent,
                    recorded_on: Some(date(2025, 6, 1)),
                    due_date: date(2025, 6, 20),
                    recurrence: None,
                    document_id: None,
                    classification: None,
                },
            )
            .await
            .unwrap();
        h.ledger
            .record_payable_settlement(
                &h.ctx,
                payable[0].id,
                SettlementRequest {
                    amount: dec!(200.00),
                    settled_on: date(2025, 6, 12),
                    reference: None,
                },
            )
            .await
            .unwrap();

        let receivable = h
            .ledger
            .create_receivable(
                &h.ctx,
                NewReceivable {
                    customer_id: CustomerId::new(),
                    description: "Workshop".to_string(),
                    amount: Money::new(dec!(100.00), Currency::USD),
                    category: RevenueCategory::Services,
                    recorded_on: Some(date(2025, 6, 1)),
                    due_date: date(2025, 6, 30),
                    recurrence: None,
                    classification: None,
                },
            )
            .await
            .unwrap();
        h.ledger
            .record_receivable_settlement(
                &h.ctx,
                receivable[0].id,
                SettlementRequest {
                    amount: dec!(100.00),
                    settled_on: date(2025, 6, 5),
                    reference: Some("wire".to_string()),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_summary_aggregates_the_month() {
        let h = harness().await;
        seed_june(&h).await;

        let summary = h.close.summarize_month(&h.ctx, june()).await.unwrap();

        assert_eq!(summary.invoice_count, 1);
        assert_eq!(summary.total_revenue.native_total, dec!(239.00));
        assert_eq!(summary.total_revenue.reporting, Some(dec!(239.00)));
        assert_eq!(summary.total_open_ar.in_currency(Currency::USD), dec!(239.00));
        assert_eq!(summary.total_open_ap.in_currency(Currency::USD), dec!(300.00));
        assert_eq!(summary.net_income.native_total, dec!(100.00));
        assert!(!summary.is_closed);
    }

    #[tokio::test]
    async fn test_other_months_are_empty() {
        let h = harness().await;
        seed_june(&h).await;

        let may = h.close.summarize_month(&h.ctx, "2025-05".parse().unwrap()).await.unwrap();
        assert_eq!(may.invoice_count, 0);
        assert!(may.total_open_ar.by_currency.is_empty());
        assert!(may.total_open_ap.by_currency.is_empty());
    }

    #[tokio::test]
    async fn test_close_locks_the_month() {
        let h = harness().await;
        seed_june(&h).await;

        let closed = h.close.close_month(&h.ctx, june()).await.unwrap();
        assert!(closed.summary.is_closed);
        assert_eq!(closed.lock.period, june());
        assert_eq!(
            h.audit.matching(AuditEntity::PeriodClose, AuditAction::Closed).await.len(),
            1
        );

        let err = h
            .ledger
            .create_receivable(
                &h.ctx,
                NewReceivable {
                    customer_id: CustomerId::new(),
                    description: "Late entry".to_string(),
                    amount: Money::new(dec!(10.00), Currency::USD),
                    category: RevenueCategory::Other,
                    recorded_on: Some(date(2025, 6, 30)),
                    due_date: date(2025, 7, 30),
                    recurrence: None,
                    classification: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PeriodClosed);

        let summary = h.close.summarize_month(&h.ctx, june()).await.unwrap();
        assert!(summary.is_closed);
    }

    #[tokio::test]
    async fn test_closing_twice_is_rejected() {
        let h = harness().await;
        h.close.close_month(&h.ctx, june()).await.unwrap();

        let err = h.close.close_month(&h.ctx, june()).await.unwrap_err();
        assert!(matches!(err, ReportingError::AlreadyClosed(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    }

    #[tokio::test]
    async fn test_reopen_unlocks_the_month() {
        let h = harness().await;
        h.close.close_month(&h.ctx, june()).await.unwrap();
        assert_eq!(h.close.closed_periods(&h.ctx).await.unwrap().len(), 1);

        h.close.reopen_month(&h.ctx, june()).await.unwrap();
        assert!(h.close.closed_periods(&h.ctx).await.unwrap().is_empty());
        assert_eq!(
            h.audit.matching(AuditEntity::PeriodClose, AuditAction::Reopened).await.len(),
            1
        );

        let err = h.close.reopen_month(&h.ctx, june()).await.unwrap_err();
        assert!(matches!(err, ReportingError::NotClosed(_)));
    }
}
