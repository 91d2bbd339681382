//! Monthly cash flow from settlement events
//!
//! Receipts are receivable settlements and payments are payable
//! settlements, bucketed by the calendar month of `settled_on`. Running
//! balances chain month to month from the caller's opening balance, in the
//! reporting currency when requested and as native sums otherwise.

use core_kernel::{Currency, DateRange, YearMonth};
use domain_ledger::{AccountPayable, AccountReceivable, Obligation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::figures::Figure;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowMonth {
    pub period: YearMonth,
    pub opening_balance: Decimal,
    pub receipts: Figure,
    pub payments: Figure,
    pub net: Figure,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    pub window: DateRange,
    pub reporting_currency: Option<Currency>,
    pub opening_balance: Decimal,
    pub months: Vec<CashFlowMonth>,
    pub total_receipts: Figure,
    pub total_payments: Figure,
    pub closing_balance: Decimal,
}

fn by_month<'a>(
    window: &DateRange,
    with_reporting: bool,
    records: impl Iterator<Item = &'a Obligation>,
) -> BTreeMap<YearMonth, Figure> {
    let mut months: BTreeMap<YearMonth, Figure> = BTreeMap::new();
    for obligation in records {
        for settlement in obligation.settlements_within(window) {
            months
                .entry(YearMonth::of(settlement.settled_on))
                .or_insert_with(|| Figure::zero(with_reporting))
                .add(
                    obligation.amount.currency(),
                    settlement.amount,
                    obligation.settlement_reporting(settlement),
                );
        }
    }
    months
}

/// Balance movement a figure contributes to the running cash position
fn movement(figure: &Figure) -> Decimal {
    figure.reporting.unwrap_or(figure.native_total)
}

pub fn generate_cash_flow(
    window: DateRange,
    opening_balance: Decimal,
    show_reporting_currency: bool,
    reporting_currency: Currency,
    payables: &[AccountPayable],
    receivables: &[AccountReceivable],
) -> CashFlowStatement {
    let with_reporting = show_reporting_currency;
    let mut receipts = by_month(&window, with_reporting, receivables.iter().map(|r| &r.obligation));
    let mut payments = by_month(&window, with_reporting, payables.iter().map(|p| &p.obligation));

    let mut months = Vec::new();
    let mut balance = opening_balance;
    for period in window.months() {
        let month_receipts = receipts.remove(&period).unwrap_or_else(|| Figure::zero(with_reporting));
        let month_payments = payments.remove(&period).unwrap_or_else(|| Figure::zero(with_reporting));
        let net = month_receipts.minus(&month_payments);
        let closing = balance + movement(&net);
        months.push(CashFlowMonth {
            period,
            opening_balance: balance,
            receipts: month_receipts,
            payments: month_payments,
            net,
            closing_balance: closing,
        });
        balance = closing;
    }

    let total_receipts = Figure::sum(with_reporting, months.iter().map(|m| &m.receipts));
    let total_payments = Figure::sum(with_reporting, months.iter().map(|m| &m.payments));

    CashFlowStatement {
        window,
        reporting_currency: show_reporting_currency.then_some(reporting_currency),
        opening_balance,
        months,
        total_receipts,
        total_payments,
        closing_balance: balance,
    }
}
