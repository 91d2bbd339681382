//! Report generation over stored records

use chrono::NaiveDate;
use core_kernel::{Clock, Currency, DateRange, TenantContext};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::aging::{generate_aging, AgingReport};
use crate::error::ReportingError;
use crate::sources::ReportingSources;
use crate::statements::{
    generate_balance_sheet, generate_cash_flow, generate_profit_and_loss, BalanceSheet, BalanceSheetInputs,
    CashFlowStatement, ProfitAndLoss,
};

/// Loads the records a report needs and hands them to the pure generators
pub struct ReportingService {
    sources: ReportingSources,
    reporting_currency: Currency,
    clock: Arc<dyn Clock>,
}

impl ReportingService {
    pub fn new(sources: ReportingSources, reporting_currency: Currency, clock: Arc<dyn Clock>) -> Self {
        Self {
            sources,
            reporting_currency,
            clock,
        }
    }

    pub fn reporting_currency(&self) -> Currency {
        self.reporting_currency
    }

    /// Aging of overdue AP and AR; `as_of` defaults to today
    #[instrument(skip(self), fields(company_id = %ctx.company_id))]
    pub async fn aging(
        &self,
        ctx: &TenantContext,
        as_of: Option<NaiveDate>,
        show_reporting_currency: bool,
    ) -> Result<AgingReport, ReportingError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let payables = self.sources.payables(ctx, Some(as_of)).await?;
        let receivables = self.sources.receivables(ctx, Some(as_of)).await?;
        debug!(payables = payables.len(), receivables = receivables.len(), %as_of, "aging inputs loaded");

        Ok(generate_aging(
            as_of,
            show_reporting_currency,
            self.reporting_currency,
            &payables,
            &receivables,
        ))
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id))]
    pub async fn profit_and_loss(
        &self,
        ctx: &TenantContext,
        period: DateRange,
        show_reporting_currency: bool,
    ) -> Result<ProfitAndLoss, ReportingError> {
        let payables = self.sources.payables(ctx, Some(period.end)).await?;
        let receivables = self.sources.receivables(ctx, Some(period.end)).await?;

        Ok(generate_profit_and_loss(
            period,
            show_reporting_currency,
            self.reporting_currency,
            &payables,
            &receivables,
        ))
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id))]
    pub async fn balance_sheet(
        &self,
        ctx: &TenantContext,
        as_of: Option<NaiveDate>,
        show_reporting_currency: bool,
    ) -> Result<BalanceSheet, ReportingError> {
        let as_of = as_of.unwrap_or_else(|| self.clock.today());
        let payables = self.sources.payables(ctx, Some(as_of)).await?;
        let receivables = self.sources.receivables(ctx, Some(as_of)).await?;
        let provisions = self.sources.provisions(ctx, as_of).await?;
        let equity_entries = self.sources.equity_entries(ctx, as_of).await?;

        let sheet = generate_balance_sheet(
            as_of,
            show_reporting_currency,
            self.reporting_currency,
            BalanceSheetInputs {
                payables: &payables,
                receivables: &receivables,
                provisions: &provisions,
                equity_entries: &equity_entries,
            },
        );
        if !sheet.is_balanced {
            warn!(%as_of, imbalance = %sheet.imbalance.native_total, "balance sheet does not balance");
        }
        Ok(sheet)
    }

    #[instrument(skip(self), fields(company_id = %ctx.company_id))]
    pub async fn cash_flow(
        &self,
        ctx: &TenantContext,
        window: DateRange,
        opening_balance: Decimal,
        show_reporting_currency: bool,
    ) -> Result<CashFlowStatement, ReportingError> {
        let payables = self.sources.payables(ctx, Some(window.end)).await?;
        let receivables = self.sources.receivables(ctx, Some(window.end)).await?;

        Ok(generate_cash_flow(
            window,
            opening_balance,
            show_reporting_currency,
            self.reporting_currency,
            &payables,
            &receivables,
        ))
    }
}
