//! Profit and loss on a cash-settled basis
//!
//! Revenue is the paid receivables and expense the paid payables whose
//! `paid_on` falls inside the period, each grouped by its own category.

use core_kernel::{Currency, DateRange};
use domain_ledger::{AccountPayable, AccountReceivable, ObligationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::figures::{Figure, StatementLine, StatementSection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub period: DateRange,
    pub reporting_currency: Option<Currency>,
    pub revenues: StatementSection,
    pub expenses: StatementSection,
    pub net_income: Figure,
}

pub fn generate_profit_and_loss(
    period: DateRange,
    show_reporting_currency: bool,
    reporting_currency: Currency,
    payables: &[AccountPayable],
    receivables: &[AccountReceivable],
) -> ProfitAndLoss {
    let paid_in_period = |status: ObligationStatus, paid_on: Option<chrono::NaiveDate>| {
        status == ObligationStatus::Paid && paid_on.map_or(false, |d| period.contains(d))
    };

    let mut revenue_lines = BTreeMap::new();
    for receivable in receivables
        .iter()
        .filter(|r| paid_in_period(r.obligation.status, r.obligation.paid_on))
    {
        let figure = revenue_lines
            .entry(receivable.category)
            .or_insert_with(|| Figure::zero(show_reporting_currency));
        figure.add(
            receivable.obligation.amount.currency(),
            receivable.obligation.amount.amount(),
            receivable.obligation.converted.reporting_amount,
        );
    }

    let mut expense_lines = BTreeMap::new();
    for payable in payables
        .iter()
        .filter(|p| paid_in_period(p.obligation.status, p.obligation.paid_on))
    {
        let figure = expense_lines
            .entry(payable.category)
            .or_insert_with(|| Figure::zero(show_reporting_currency));
        figure.add(
            payable.obligation.amount.currency(),
            payable.obligation.amount.amount(),
            payable.obligation.converted.reporting_amount,
        );
    }

    let revenues = StatementSection::from_lines(
        show_reporting_currency,
        revenue_lines
            .into_iter()
            .map(|(category, figure)| StatementLine::new(category.as_str(), category.label(), figure))
            .collect(),
    );
    let expenses = StatementSection::from_lines(
        show_reporting_currency,
        expense_lines
            .into_iter()
            .map(|(category, figure)| StatementLine::new(category.as_str(), category.label(), figure))
            .collect(),
    );
    let net_income = revenues.total.minus(&expenses.total);

    ProfitAndLoss {
        period,
        reporting_currency: show_reporting_currency.then_some(reporting_currency),
        revenues,
        expenses,
        net_income,
    }
}
