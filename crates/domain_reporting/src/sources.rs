//! Read access to the records reports are built from

use chrono::NaiveDate;
use core_kernel::TenantContext;
use domain_invoicing::{Invoice, InvoicePort, InvoiceQuery};
use domain_ledger::{
    AccountPayable, AccountReceivable, EquityEntry, EquityPort, LedgerPorts, ObligationQuery, PayablePort,
    Provision, ProvisionPort, ProvisionQuery, ReceivablePort,
};
use std::sync::Arc;

use crate::error::ReportingError;

/// Stores the reports read from
#[derive(Clone)]
pub struct ReportingSources {
    pub ledger: LedgerPorts,
    pub invoices: Arc<dyn InvoicePort>,
}

impl ReportingSources {
    pub fn new(ledger: LedgerPorts, invoices: Arc<dyn InvoicePort>) -> Self {
        Self { ledger, invoices }
    }

    /// Payables recorded on or before `recorded_to` (all when `None`)
    pub async fn payables(
        &self,
        ctx: &TenantContext,
        recorded_to: Option<NaiveDate>,
    ) -> Result<Vec<AccountPayable>, ReportingError> {
        let query = ObligationQuery {
            recorded_to,
            ..Default::default()
        };
        Ok(self.ledger.payables.find_payables(ctx, &query).await?)
    }

    pub async fn receivables(
        &self,
        ctx: &TenantContext,
        recorded_to: Option<NaiveDate>,
    ) -> Result<Vec<AccountReceivable>, ReportingError> {
        let query = ObligationQuery {
            recorded_to,
            ..Default::default()
        };
        Ok(self.ledger.receivables.find_receivables(ctx, &query).await?)
    }

    pub async fn provisions(&self, ctx: &TenantContext, up_to: NaiveDate) -> Result<Vec<Provision>, ReportingError> {
        let query = ProvisionQuery {
            date_to: Some(up_to),
            ..Default::default()
        };
        Ok(self.ledger.provisions.find_provisions(ctx, &query).await?)
    }

    pub async fn equity_entries(&self, ctx: &TenantContext, up_to: NaiveDate) -> Result<Vec<EquityEntry>, ReportingError> {
        Ok(self.ledger.equity.find_equity_entries(ctx, Some(up_to)).await?)
    }

    pub async fn invoices_issued_between(
        &self,
        ctx: &TenantContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Invoice>, ReportingError> {
        let query = InvoiceQuery {
            issued_from: Some(from),
            issued_to: Some(to),
            ..Default::default()
        };
        Ok(self.invoices.find_invoices(ctx, &query).await?)
    }
}
