//! Balance sheet as of a date
//!
//! Equity is built from its own sources (capital entries and recognized
//! revenue and expense) instead of being solved from assets and
//! liabilities, so `assets == liabilities + equity` is checked rather than
//! assumed.

use chrono::NaiveDate;
use core_kernel::Currency;
use domain_ledger::{
    AccountPayable, AccountReceivable, Classification, EquityEntry, EquityKind, Obligation, Provision,
};
use serde::{Deserialize, Serialize};

use crate::figures::{Figure, StatementLine, StatementSection};

/// Current and non-current lines with their totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSection {
    pub current: StatementSection,
    pub non_current: StatementSection,
    pub total: Figure,
}

impl ClassifiedSection {
    fn new(with_reporting: bool, current: Vec<StatementLine>, non_current: Vec<StatementLine>) -> Self {
        let current = StatementSection::from_lines(with_reporting, current);
        let non_current = StatementSection::from_lines(with_reporting, non_current);
        let total = current.total.plus(&non_current.total);
        Self {
            current,
            non_current,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub reporting_currency: Option<Currency>,
    pub assets: ClassifiedSection,
    pub liabilities: ClassifiedSection,
    pub equity: StatementSection,
    /// `assets - liabilities - equity`
    pub imbalance: Figure,
    pub is_balanced: bool,
}

impl BalanceSheet {
    pub fn liabilities_and_equity(&self) -> Figure {
        self.liabilities.total.plus(&self.equity.total)
    }
}

/// Records the balance sheet is derived from
#[derive(Debug, Clone, Copy)]
pub struct BalanceSheetInputs<'a> {
    pub payables: &'a [AccountPayable],
    pub receivables: &'a [AccountReceivable],
    pub provisions: &'a [Provision],
    pub equity_entries: &'a [EquityEntry],
}

#[derive(Debug)]
struct Split {
    current: Figure,
    non_current: Figure,
}

impl Split {
    fn new(with_reporting: bool) -> Self {
        Self {
            current: Figure::zero(with_reporting),
            non_current: Figure::zero(with_reporting),
        }
    }

    fn side(&mut self, classification: Classification) -> &mut Figure {
        match classification {
            Classification::Current => &mut self.current,
            Classification::NonCurrent => &mut self.non_current,
        }
    }
}

fn split_outstanding<'a>(
    as_of: NaiveDate,
    with_reporting: bool,
    records: impl Iterator<Item = &'a Obligation>,
) -> Split {
    let mut split = Split::new(with_reporting);
    for obligation in records {
        let native = obligation.outstanding_as_of(as_of);
        if native.is_zero() {
            continue;
        }
        split.side(obligation.classification_as_of(as_of)).add(
            obligation.amount.currency(),
            native,
            obligation.outstanding_reporting_as_of(as_of),
        );
    }
    split
}

fn recognized<'a>(as_of: NaiveDate, with_reporting: bool, records: impl Iterator<Item = &'a Obligation>) -> Figure {
    let mut figure = Figure::zero(with_reporting);
    for obligation in records.filter(|o| o.is_recognized_by(as_of)) {
        figure.add(
            obligation.amount.currency(),
            obligation.recognized_as_of(as_of),
            obligation.recognized_reporting_as_of(as_of),
        );
    }
    figure
}

fn settled<'a>(as_of: NaiveDate, with_reporting: bool, records: impl Iterator<Item = &'a Obligation>) -> Figure {
    let mut figure = Figure::zero(with_reporting);
    for obligation in records {
        let native = obligation.settled_as_of(as_of);
        if !native.is_zero() {
            figure.add(obligation.amount.currency(), native, obligation.settled_reporting_as_of(as_of));
        }
    }
    figure
}

pub fn generate_balance_sheet(
    as_of: NaiveDate,
    show_reporting_currency: bool,
    reporting_currency: Currency,
    inputs: BalanceSheetInputs<'_>,
) -> BalanceSheet {
    let with_reporting = show_reporting_currency;
    let receivables = || inputs.receivables.iter().map(|r| &r.obligation);
    let payables = || inputs.payables.iter().map(|p| &p.obligation);

    let mut contributions = Figure::zero(with_reporting);
    let mut distributions = Figure::zero(with_reporting);
    for entry in inputs.equity_entries.iter().filter(|e| e.entry_date <= as_of) {
        let target = match entry.kind {
            EquityKind::Contribution => &mut contributions,
            EquityKind::Distribution => &mut distributions,
        };
        target.add(entry.amount.currency(), entry.amount.amount(), entry.converted.reporting_amount);
    }

    let cash = contributions
        .minus(&distributions)
        .plus(&settled(as_of, with_reporting, receivables()))
        .minus(&settled(as_of, with_reporting, payables()));
    let ar = split_outstanding(as_of, with_reporting, receivables());
    let ap = split_outstanding(as_of, with_reporting, payables());

    let mut provisions = Split::new(with_reporting);
    for provision in inputs.provisions.iter().filter(|p| p.is_active_as_of(as_of)) {
        provisions.side(provision.classification()).add(
            provision.amount.currency(),
            provision.amount.amount(),
            provision.converted.reporting_amount,
        );
    }
    let provision_expense = provisions.current.plus(&provisions.non_current);

    let retained_earnings = recognized(as_of, with_reporting, receivables())
        .minus(&recognized(as_of, with_reporting, payables()))
        .minus(&provision_expense);

    let assets = ClassifiedSection::new(
        with_reporting,
        vec![
            StatementLine::new("cash", "Cash", cash),
            StatementLine::new("accounts_receivable", "Accounts receivable", ar.current),
        ],
        vec![StatementLine::new(
            "accounts_receivable_long_term",
            "Long-term receivables",
            ar.non_current,
        )],
    );
    let liabilities = ClassifiedSection::new(
        with_reporting,
        vec![
            StatementLine::new("accounts_payable", "Accounts payable", ap.current),
            StatementLine::new("provisions", "Provisions", provisions.current),
        ],
        vec![
            StatementLine::new("accounts_payable_long_term", "Long-term payables", ap.non_current),
            StatementLine::new("provisions_long_term", "Long-term provisions", provisions.non_current),
        ],
    );
    let equity = StatementSection::from_lines(
        with_reporting,
        vec![
            StatementLine::new("contributed_capital", "Contributed capital", contributions),
            StatementLine::new("distributions", "Distributions", distributions.negated()),
            StatementLine::new("retained_earnings", "Retained earnings", retained_earnings),
        ],
    );

    let imbalance = assets.total.minus(&liabilities.total).minus(&equity.total);
    let is_balanced = imbalance.is_nil();

    BalanceSheet {
        as_of,
        reporting_currency: show_reporting_currency.then_some(reporting_currency),
        assets,
        liabilities,
        equity,
        imbalance,
        is_balanced,
    }
}
