//! Statement figures
//!
//! A [`Figure`] keeps the per-currency breakdown next to the naive sum of
//! native amounts and, when requested, the sum of the records' frozen
//! reporting-currency conversions. Only the breakdown and the reporting sum
//! are currency-safe; the native total mixes currencies.

use core_kernel::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tolerance for comparing reporting-currency sums
pub const REPORTING_TOLERANCE: Decimal = rust_decimal_macros::dec!(0.01);

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Figure {
    pub by_currency: BTreeMap<Currency, Decimal>,
    pub native_total: Decimal,
    #[serde(rename = "total_reporting_ccy", skip_serializing_if = "Option::is_none", default)]
    pub reporting: Option<Decimal>,
}

impl Figure {
    /// Zero figure; carries a reporting total when `with_reporting`
    pub fn zero(with_reporting: bool) -> Self {
        Self {
            by_currency: BTreeMap::new(),
            native_total: Decimal::ZERO,
            reporting: with_reporting.then_some(Decimal::ZERO),
        }
    }

    pub fn add(&mut self, currency: Currency, native: Decimal, reporting: Decimal) {
        *self.by_currency.entry(currency).or_insert(Decimal::ZERO) += native;
        self.native_total += native;
        if let Some(total) = self.reporting.as_mut() {
            *total += reporting;
        }
    }

    pub fn subtract(&mut self, currency: Currency, native: Decimal, reporting: Decimal) {
        self.add(currency, -native, -reporting);
    }

    pub fn plus(&self, other: &Figure) -> Figure {
        let mut result = self.clone();
        for (currency, amount) in &other.by_currency {
            *result.by_currency.entry(*currency).or_insert(Decimal::ZERO) += amount;
        }
        result.native_total += other.native_total;
        result.reporting = match (self.reporting, other.reporting) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        result
    }

    pub fn negated(&self) -> Figure {
        Figure {
            by_currency: self.by_currency.iter().map(|(c, a)| (*c, -a)).collect(),
            native_total: -self.native_total,
            reporting: self.reporting.map(|r| -r),
        }
    }

    pub fn minus(&self, other: &Figure) -> Figure {
        self.plus(&other.negated())
    }

    pub fn sum<'a>(with_reporting: bool, figures: impl IntoIterator<Item = &'a Figure>) -> Figure {
        figures
            .into_iter()
            .fold(Figure::zero(with_reporting), |acc, f| acc.plus(f))
    }

    /// Amount in one currency, zero when absent
    pub fn in_currency(&self, currency: Currency) -> Decimal {
        self.by_currency.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    /// Every currency nets to exactly zero and the reporting sum is within
    /// [`REPORTING_TOLERANCE`] of zero
    pub fn is_nil(&self) -> bool {
        self.by_currency.values().all(|a| a.is_zero())
            && self.reporting.map_or(true, |r| r.abs() <= REPORTING_TOLERANCE)
    }
}

/// Labelled statement line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub code: String,
    pub label: String,
    pub amount: Figure,
}

impl StatementLine {
    pub fn new(code: impl Into<String>, label: impl Into<String>, amount: Figure) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            amount,
        }
    }
}

/// Lines plus their total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSection {
    pub lines: Vec<StatementLine>,
    pub total: Figure,
}

impl StatementSection {
    pub fn from_lines(with_reporting: bool, lines: Vec<StatementLine>) -> Self {
        let total = Figure::sum(with_reporting, lines.iter().map(|l| &l.amount));
        Self { lines, total }
    }

    pub fn line(&self, code: &str) -> Option<&StatementLine> {
        self.lines.iter().find(|l| l.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_add_keeps_currencies_apart() {
        let mut figure = Figure::zero(true);
        figure.add(Currency::USD, dec!(100), dec!(100));
        figure.add(Currency::BRL, dec!(500), dec!(90));

        assert_eq!(figure.in_currency(Currency::USD), dec!(100));
        assert_eq!(figure.in_currency(Currency::BRL), dec!(500));
        assert_eq!(figure.native_total, dec!(600));
        assert_eq!(figure.reporting, Some(dec!(190)));
    }

    #[test]
    fn test_minus_self_is_nil() {
        let mut figure = Figure::zero(true);
        figure.add(Currency::EUR, dec!(12.34), dec!(13.57));
        assert!(figure.minus(&figure).is_nil());
    }

    #[test]
    fn test_native_only_figure_has_no_reporting() {
        let mut figure = Figure::zero(false);
        figure.add(Currency::EUR, dec!(1), dec!(1.1));
        assert_eq!(figure.reporting, None);
        let json = serde_json::to_value(&figure).unwrap();
        assert!(json.get("total_reporting_ccy").is_none());
    }
}
