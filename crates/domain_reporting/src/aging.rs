//! Aging of open payables and receivables
//!
//! A record qualifies when it is open or partially settled and due on or
//! before the reference date; records not yet due are left out. Each
//! qualifying record lands in exactly one bucket by whole days overdue.

use chrono::NaiveDate;
use core_kernel::Currency;
use domain_ledger::{AccountPayable, AccountReceivable, Obligation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `(label, min_days, max_days)`; the last band also takes anything older
pub const AGING_BANDS: [(&str, i64, i64); 5] = [
    ("Current", 0, 0),
    ("1-30 days", 1, 30),
    ("31-60 days", 31, 60),
    ("61-90 days", 61, 90),
    ("90+ days", 91, 999),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub label: String,
    pub min_days: i64,
    pub max_days: i64,
    /// Sum of native amounts regardless of currency
    pub total: Decimal,
    pub totals_by_currency: BTreeMap<Currency, Decimal>,
    #[serde(rename = "converted_total_reporting_ccy", skip_serializing_if = "Option::is_none", default)]
    pub converted_total: Option<Decimal>,
    pub count: usize,
}

impl AgingBucket {
    fn empty(label: &str, min_days: i64, max_days: i64, with_reporting: bool) -> Self {
        Self {
            label: label.to_string(),
            min_days,
            max_days,
            total: Decimal::ZERO,
            totals_by_currency: BTreeMap::new(),
            converted_total: with_reporting.then_some(Decimal::ZERO),
            count: 0,
        }
    }

    /// Whether `days` overdue belongs here. The oldest band is open-ended.
    pub fn holds(&self, days: i64, oldest: bool) -> bool {
        days >= self.min_days && (oldest || days <= self.max_days)
    }
}

/// The five buckets for one side of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSet {
    pub buckets: Vec<AgingBucket>,
}

impl BucketSet {
    fn new(with_reporting: bool) -> Self {
        Self {
            buckets: AGING_BANDS
                .iter()
                .map(|(label, min, max)| AgingBucket::empty(label, *min, *max, with_reporting))
                .collect(),
        }
    }

    fn place(&mut self, days: i64, currency: Currency, amount: Decimal, reporting: Decimal) {
        let last = self.buckets.len() - 1;
        if let Some(bucket) = self
            .buckets
            .iter_mut()
            .enumerate()
            .find(|(index, bucket)| bucket.holds(days, *index == last))
            .map(|(_, bucket)| bucket)
        {
            bucket.total += amount;
            *bucket.totals_by_currency.entry(currency).or_insert(Decimal::ZERO) += amount;
            if let Some(converted) = bucket.converted_total.as_mut() {
                *converted += reporting;
            }
            bucket.count += 1;
        }
    }

    pub fn bucket(&self, label: &str) -> Option<&AgingBucket> {
        self.buckets.iter().find(|b| b.label == label)
    }

    pub fn count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn total(&self) -> Decimal {
        self.buckets.iter().map(|b| b.total).sum()
    }

    pub fn converted_total(&self) -> Option<Decimal> {
        self.buckets.iter().map(|b| b.converted_total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingReport {
    pub as_of: NaiveDate,
    pub reporting_currency: Option<Currency>,
    pub payables: BucketSet,
    pub receivables: BucketSet,
}

/// Whether the record takes part in aging on `as_of`
pub fn qualifies(obligation: &Obligation, as_of: NaiveDate) -> bool {
    obligation.status.is_outstanding() && obligation.due_date <= as_of
}

fn age<'a>(as_of: NaiveDate, with_reporting: bool, records: impl Iterator<Item = &'a Obligation>) -> BucketSet {
    let mut set = BucketSet::new(with_reporting);
    for obligation in records.filter(|o| qualifies(o, as_of)) {
        let days = (as_of - obligation.due_date).num_days();
        set.place(
            days,
            obligation.amount.currency(),
            obligation.outstanding_as_of(as_of),
            obligation.outstanding_reporting_as_of(as_of),
        );
    }
    set
}

/// Buckets payables and receivables as of `as_of`.
///
/// Amounts are the balances outstanding on `as_of`. With
/// `show_reporting_currency` each bucket also sums the frozen conversions.
pub fn generate_aging(
    as_of: NaiveDate,
    show_reporting_currency: bool,
    reporting_currency: Currency,
    payables: &[AccountPayable],
    receivables: &[AccountReceivable],
) -> AgingReport {
    AgingReport {
        as_of,
        reporting_currency: show_reporting_currency.then_some(reporting_currency),
        payables: age(as_of, show_reporting_currency, payables.iter().map(|p| &p.obligation)),
        receivables: age(as_of, show_reporting_currency, receivables.iter().map(|r| &r.obligation)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_contiguous() {
        for pair in AGING_BANDS.windows(2) {
            assert_eq!(pair[0].2 + 1, pair[1].1);
        }
        assert_eq!(AGING_BANDS[0].1, 0);
    }

    #[test]
    fn test_oldest_band_is_open_ended() {
        let mut set = BucketSet::new(false);
        set.place(5000, Currency::USD, Decimal::ONE, Decimal::ONE);
        assert_eq!(set.bucket("90+ days").map(|b| b.count), Some(1));
    }
}
