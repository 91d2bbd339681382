//! Test Data Builders
//!
//! Request builders with sensible defaults, so tests only spell out the
//! fields they care about, and [`InMemoryBackOffice`], which wires every
//! service over the in-memory stores.

use std::sync::Arc;

use chrono::NaiveDate;
use core_kernel::audit::mock::InMemoryAuditSink;
use core_kernel::{
    Clock, ContractId, Currency, CustomerId, DocumentId, EmployeeId, FixedClock, Money, SupplierId,
};
use domain_fx::{ConversionConfig, CurrencyConverter, StaticRateProvider};
use domain_invoicing::ports::mock::{InMemoryInvoiceStore, InMemorySequenceStore};
use domain_invoicing::{CreateInvoiceRequest, InvoiceNumberingService, InvoiceService, InvoiceTotals, LineInput};
use domain_ledger::ports::mock::{InMemoryDirectory, InMemoryLedger};
use domain_ledger::{
    Classification, EquityKind, ExpenseCategory, LedgerPorts, LedgerService, NewEquityEntry, NewPayable,
    NewProvision, NewReceivable, ProvisionSubject, Recurrence, RecurrenceFrequency, RevenueCategory,
};
use domain_reporting::{MonthlyCloseService, ReportingService, ReportingSources};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{DateFixtures, RateFixtures, TenantFixtures};

/// Builder for invoice creation requests
pub struct InvoiceRequestBuilder {
    customer_id: CustomerId,
    contract_id: Option<ContractId>,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: Currency,
    lines: Vec<LineInput>,
    declared_totals: Option<InvoiceTotals>,
    category: RevenueCategory,
}

impl InvoiceRequestBuilder {
    /// One line of 10 x 100.00, issued today and due in thirty days
    pub fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            contract_id: None,
            issue_date: DateFixtures::today(),
            due_date: DateFixtures::in_thirty_days(),
            currency: Currency::USD,
            lines: vec![LineInput::new("Consulting hours", dec!(10), dec!(100.00))],
            declared_totals: None,
            category: RevenueCategory::Services,
        }
    }

    pub fn with_contract(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    pub fn with_dates(mut self, issue_date: NaiveDate, due_date: NaiveDate) -> Self {
        self.issue_date = issue_date;
        self.due_date = due_date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Replaces the default line set
    pub fn with_lines(mut self, lines: Vec<LineInput>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_line(mut self, line: LineInput) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_declared_totals(mut self, totals: InvoiceTotals) -> Self {
        self.declared_totals = Some(totals);
        self
    }

    pub fn with_category(mut self, category: RevenueCategory) -> Self {
        self.category = category;
        self
    }

    pub fn build(self) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            customer_id: self.customer_id,
            contract_id: self.contract_id,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency: self.currency,
            lines: self.lines,
            declared_totals: self.declared_totals,
            notes: None,
            language: None,
            template_id: None,
            category: self.category,
        }
    }
}

/// Builder for payables; defaults to a one-off supplier bill recorded today
pub struct PayableBuilder {
    request: NewPayable,
}

impl PayableBuilder {
    pub fn new(supplier_id: SupplierId, amount: Money) -> Self {
        Self {
            request: NewPayable {
                supplier_id,
                amount,
                description: "Supplier bill".to_string(),
                category: ExpenseCategory::Suppliers,
                recorded_on: Some(DateFixtures::today()),
                due_date: DateFixtures::in_thirty_days(),
                recurrence: None,
                document_id: None,
                classification: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.request.description = description.into();
        self
    }

    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.request.category = category;
        self
    }

    pub fn recorded_on(mut self, date: NaiveDate) -> Self {
        self.request.recorded_on = Some(date);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.request.due_date = date;
        self
    }

    pub fn monthly_until(mut self, end_date: NaiveDate) -> Self {
        self.request.recurrence = Some(Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date,
        });
        self
    }

    pub fn quarterly_until(mut self, end_date: NaiveDate) -> Self {
        self.request.recurrence = Some(Recurrence {
            frequency: RecurrenceFrequency::Quarterly,
            end_date,
        });
        self
    }

    pub fn with_document(mut self, document_id: DocumentId) -> Self {
        self.request.document_id = Some(document_id);
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.request.classification = Some(classification);
        self
    }

    pub fn build(self) -> NewPayable {
        self.request
    }
}

/// Builder for manually recorded receivables
pub struct ReceivableBuilder {
    request: NewReceivable,
}

impl ReceivableBuilder {
    pub fn new(customer_id: CustomerId, amount: Money) -> Self {
        Self {
            request: NewReceivable {
                customer_id,
                amount,
                description: "Service fee".to_string(),
                category: RevenueCategory::Services,
                recorded_on: Some(DateFixtures::today()),
                due_date: DateFixtures::in_thirty_days(),
                recurrence: None,
                classification: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.request.description = description.into();
        self
    }

    pub fn category(mut self, category: RevenueCategory) -> Self {
        self.request.category = category;
        self
    }

    pub fn recorded_on(mut self, date: NaiveDate) -> Self {
        self.request.recorded_on = Some(date);
        self
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.request.due_date = date;
        self
    }

    pub fn monthly_until(mut self, end_date: NaiveDate) -> Self {
        self.request.recurrence = Some(Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date,
        });
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.request.classification = Some(classification);
        self
    }

    pub fn build(self) -> NewReceivable {
        self.request
    }
}

/// Provision against an employee, dated today
pub fn employee_provision(employee_id: EmployeeId, amount: Money) -> NewProvision {
    NewProvision {
        subject: ProvisionSubject::Employee(employee_id),
        description: "Vacation accrual".to_string(),
        amount,
        provision_date: DateFixtures::today(),
        classification: None,
    }
}

pub fn equity_entry(kind: EquityKind, amount: Money, entry_date: NaiveDate) -> NewEquityEntry {
    NewEquityEntry {
        kind,
        amount,
        entry_date,
        description: match kind {
            EquityKind::Contribution => "Capital contribution".to_string(),
            EquityKind::Distribution => "Owner distribution".to_string(),
        },
    }
}

/// Every service wired over in-memory stores, a fixed clock, and a static
/// rate table quoted into USD
pub struct InMemoryBackOffice {
    pub clock: Arc<FixedClock>,
    pub ledger_store: Arc<InMemoryLedger>,
    pub directory: Arc<InMemoryDirectory>,
    pub invoice_store: Arc<InMemoryInvoiceStore>,
    pub sequences: Arc<InMemorySequenceStore>,
    pub rates: Arc<StaticRateProvider>,
    pub audit: Arc<InMemoryAuditSink>,
    pub converter: Arc<CurrencyConverter>,
    pub ledger: Arc<LedgerService>,
    pub invoices: Arc<InvoiceService>,
    pub reporting: ReportingService,
    pub close: MonthlyCloseService,
}

impl InMemoryBackOffice {
    /// Harness on [`DateFixtures::today`] that accepts any counterparty
    pub async fn new() -> Self {
        Self::build(DateFixtures::today(), Arc::new(InMemoryDirectory::permissive())).await
    }

    pub async fn on(today: NaiveDate) -> Self {
        Self::build(today, Arc::new(InMemoryDirectory::permissive())).await
    }

    /// Harness whose directory knows only the ids registered on it
    pub async fn strict() -> Self {
        Self::build(DateFixtures::today(), Arc::new(InMemoryDirectory::new())).await
    }

    async fn build(today: NaiveDate, directory: Arc<InMemoryDirectory>) -> Self {
        let clock = Arc::new(FixedClock::on_date(today));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let ledger_store = Arc::new(InMemoryLedger::new());
        let invoice_store = Arc::new(InMemoryInvoiceStore::new());
        let sequences = Arc::new(InMemorySequenceStore::new());
        let rates = Arc::new(StaticRateProvider::with_rates("static-test-rates", RateFixtures::usd_table()).await);
        let audit = Arc::new(InMemoryAuditSink::new());

        let config = ConversionConfig {
            reporting_currency: Currency::USD,
            max_attempts: 1,
            ..ConversionConfig::default()
        };
        let converter = Arc::new(CurrencyConverter::with_clock(rates.clone(), config, shared_clock.clone()));

        let ports = LedgerPorts::in_memory(ledger_store.clone(), directory.clone());
        let ledger = Arc::new(LedgerService::new(
            ports.clone(),
            converter.clone(),
            audit.clone(),
            shared_clock.clone(),
        ));
        let invoices = Arc::new(InvoiceService::new(
            invoice_store.clone(),
            InvoiceNumberingService::new(sequences.clone(), shared_clock.clone()),
            ledger.clone(),
            converter.clone(),
            audit.clone(),
            shared_clock.clone(),
        ));
        let sources = ReportingSources::new(ports, invoice_store.clone());
        let reporting = ReportingService::new(sources.clone(), Currency::USD, shared_clock.clone());
        let close = MonthlyCloseService::new(sources, audit.clone(), shared_clock, Currency::USD);

        Self {
            clock,
            ledger_store,
            directory,
            invoice_store,
            sequences,
            rates,
            audit,
            converter,
            ledger,
            invoices,
            reporting,
            close,
        }
    }

    /// Sets a rate and drops cached quotes so the next conversion sees it
    pub async fn set_rate(&self, base: Currency, rate: Decimal) {
        self.rates.set_rate(base, Currency::USD, rate).await;
        self.converter.clear_cache().await;
    }

    pub async fn remove_rate(&self, base: Currency) {
        self.rates.remove_rate(base, Currency::USD).await;
        self.converter.clear_cache().await;
    }

    /// Moves the clock to midday UTC of `date`
    pub fn advance_to(&self, date: NaiveDate) {
        if let Some(noon) = date.and_hms_opt(12, 0, 0) {
            self.clock.set(noon.and_utc());
        }
    }

    /// Registers fresh counterparties on a strict directory
    pub async fn register_customer(&self) -> CustomerId {
        let id = TenantFixtures::customer_id();
        self.directory.add_customer(id).await;
        id
    }

    pub async fn register_supplier(&self) -> SupplierId {
        let id = TenantFixtures::supplier_id();
        self.directory.add_supplier(id).await;
        id
    }
}
