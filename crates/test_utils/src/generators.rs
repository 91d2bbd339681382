//! Property-Based Test Generators
//!
//! Proptest strategies that produce data satisfying the domain's input
//! rules: positive two-decimal amounts, supported currencies, valid dates.

use chrono::{Days, NaiveDate};
use core_kernel::{Currency, Money, YearMonth};
use domain_invoicing::LineInput;
use domain_ledger::{Recurrence, RecurrenceFrequency};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Any supported currency
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    proptest::sample::select(Currency::ALL.to_vec())
}

/// Currencies the fixture rate table can convert into USD
pub fn convertible_currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::BRL),
        Just(Currency::GBP),
    ]
}

/// Positive amount with two decimal places, 0.01 to 10,000,000.00
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (positive_amount_strategy(), convertible_currency_strategy())
        .prop_map(|(amount, currency)| Money::new(amount, currency))
}

/// Exchange rate between 0.0001 and 100.0000
pub fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 4))
}

/// Percentage from 0.00 to 100.00
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Invoice line with a positive quantity and price
pub fn line_input_strategy() -> impl Strategy<Value = LineInput> {
    (
        (1i64..10_000i64).prop_map(|n| Decimal::new(n, 2)),
        (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2)),
        percentage_strategy(),
        (0i64..=3_000i64).prop_map(|n| Decimal::new(n, 2)),
    )
        .prop_map(|(quantity, unit_price, discount, tax)| {
            LineInput::new("Generated line", quantity, unit_price)
                .with_discount(discount)
                .with_tax(tax)
        })
}

pub fn line_inputs_strategy(max_lines: usize) -> impl Strategy<Value = Vec<LineInput>> {
    prop::collection::vec(line_input_strategy(), 1..=max_lines.max(1))
}

/// A date between 2020-01-01 and roughly 2030
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0u64..3_650u64).prop_map(|offset| {
        let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN);
        base.checked_add_days(Days::new(offset)).unwrap_or(base)
    })
}

/// `(start, end)` with `start <= end`, at most `max_days` apart
pub fn date_pair_strategy(max_days: u64) -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (date_strategy(), 0u64..=max_days).prop_map(|(start, span)| {
        let end = start.checked_add_days(Days::new(span)).unwrap_or(start);
        (start, end)
    })
}

pub fn year_month_strategy() -> impl Strategy<Value = YearMonth> {
    date_strategy().prop_map(YearMonth::of)
}

/// Recurrence ending within two years of `start`
pub fn recurrence_strategy(start: NaiveDate) -> impl Strategy<Value = Recurrence> {
    (
        prop_oneof![
            Just(RecurrenceFrequency::Monthly),
            Just(RecurrenceFrequency::Quarterly)
        ],
        0u64..730u64,
    )
        .prop_map(move |(frequency, span)| Recurrence {
            frequency,
            end_date: start.checked_add_days(Days::new(span)).unwrap_or(start),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_amounts_are_positive_cents(amount in positive_amount_strategy()) {
            prop_assert!(amount > Decimal::ZERO);
            prop_assert_eq!(amount, amount.round_dp(2));
        }

        #[test]
        fn prop_date_pairs_are_ordered((start, end) in date_pair_strategy(400)) {
            prop_assert!(start <= end);
        }

        #[test]
        fn prop_lines_have_positive_quantities(lines in line_inputs_strategy(5)) {
            prop_assert!(!lines.is_empty());
            for line in &lines {
                prop_assert!(line.quantity > Decimal::ZERO);
                prop_assert!(line.unit_price > Decimal::ZERO);
            }
        }
    }
}
