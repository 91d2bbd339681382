//! Service wiring shared by every handler

use std::sync::Arc;

use core_kernel::{AuditSink, Clock, HealthCheckable, SystemClock};
use domain_fx::{CurrencyConverter, RateProvider};
use domain_invoicing::{InvoiceNumberingService, InvoicePort, InvoiceService, SequencePort};
use domain_ledger::{LedgerPorts, LedgerService};
use domain_reporting::{MonthlyCloseService, ReportingService, ReportingSources};
use infra_db::{
    DatabasePool, PostgresAuditSink, PostgresDirectory, PostgresInvoiceAdapter, PostgresLedgerAdapter,
    PostgresRateProvider, PostgresSequenceAdapter,
};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub clock: Arc<dyn Clock>,
    pub invoices: Arc<InvoiceService>,
    pub ledger: Arc<LedgerService>,
    pub reporting: Arc<ReportingService>,
    pub close: Arc<MonthlyCloseService>,
    /// Adapters probed by the readiness check
    pub health: Vec<Arc<dyn HealthCheckable>>,
}

/// Stores the services are built on
pub struct Stores {
    pub ledger: LedgerPorts,
    pub invoices: Arc<dyn InvoicePort>,
    pub sequences: Arc<dyn SequencePort>,
    pub rates: Arc<dyn RateProvider>,
    pub audit: Arc<dyn AuditSink>,
    pub health: Vec<Arc<dyn HealthCheckable>>,
}

impl Stores {
    /// Every store backed by PostgreSQL
    pub fn postgres(pool: DatabasePool) -> Self {
        let ledger = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
        let directory = Arc::new(PostgresDirectory::new(pool.clone()));
        let invoices = Arc::new(PostgresInvoiceAdapter::new(pool.clone()));
        let sequences = Arc::new(PostgresSequenceAdapter::new(pool.clone()));
        let rates = Arc::new(PostgresRateProvider::new(pool.clone()));
        let health: Vec<Arc<dyn HealthCheckable>> = vec![
            ledger.clone() as Arc<dyn HealthCheckable>,
            invoices.clone() as Arc<dyn HealthCheckable>,
            sequences.clone() as Arc<dyn HealthCheckable>,
            rates.clone() as Arc<dyn HealthCheckable>,
        ];

        Self {
            ledger: LedgerPorts {
                payables: ledger.clone(),
                receivables: ledger.clone(),
                provisions: ledger.clone(),
                equity: ledger.clone(),
                period_locks: ledger,
                directory,
            },
            invoices,
            sequences,
            rates,
            audit: Arc::new(PostgresAuditSink::new(pool)),
            health,
        }
    }
}

impl AppState {
    /// Builds the services over `stores` with the wall clock in the
    /// configured timezone
    pub fn new(config: ApiConfig, stores: Stores) -> Result<Self, ApiError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.timezone()?));
        Self::with_clock(config, stores, clock)
    }

    pub fn with_clock(config: ApiConfig, stores: Stores, clock: Arc<dyn Clock>) -> Result<Self, ApiError> {
        let conversion = config.conversion_config()?;
        let reporting_currency = conversion.reporting_currency;
        let converter = Arc::new(CurrencyConverter::with_clock(stores.rates, conversion, clock.clone()));

        let ledger = Arc::new(LedgerService::new(
            stores.ledger.clone(),
            converter.clone(),
            stores.audit.clone(),
            clock.clone(),
        ));
        let invoices = Arc::new(InvoiceService::new(
            stores.invoices.clone(),
            InvoiceNumberingService::new(stores.sequences, clock.clone()),
            ledger.clone(),
            converter,
            stores.audit.clone(),
            clock.clone(),
        ));
        let sources = ReportingSources::new(stores.ledger, stores.invoices);
        let reporting = Arc::new(ReportingService::new(sources.clone(), reporting_currency, clock.clone()));
        let close = Arc::new(MonthlyCloseService::new(sources, stores.audit, clock.clone(), reporting_currency));

        Ok(Self {
            config,
            clock,
            invoices,
            ledger,
            reporting,
            close,
            health: stores.health,
        })
    }
}
