//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than a bare `assert_eq!`.

use core_kernel::Money;
use domain_fx::ConvertedAmount;
use domain_invoicing::Invoice;
use domain_ledger::Obligation;
use domain_reporting::{BalanceSheet, CashFlowStatement, Figure, REPORTING_TOLERANCE};
use rust_decimal::Decimal;

/// Asserts that two decimals differ by at most `tolerance`
pub fn assert_decimal_approx_eq(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Decimals differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that two Money values share a currency and are within `tolerance`
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );
    assert_decimal_approx_eq(actual.amount(), expected.amount(), tolerance);
}

/// Asserts that a decimal carries at most two fractional digits
pub fn assert_two_decimal_places(value: Decimal) {
    assert_eq!(
        value,
        value.round_dp(2),
        "Expected at most two decimal places, got {}",
        value
    );
}

/// Asserts `reporting_amount == round2(amount * rate_used)` within a cent
pub fn assert_conversion_consistent(converted: &ConvertedAmount, amount: Decimal) {
    assert!(
        converted.rate_used > Decimal::ZERO,
        "Conversion rate must be positive, got {}",
        converted.rate_used
    );
    assert!(
        converted.is_consistent_with(amount),
        "Reporting amount {} is not {} x {} (source {})",
        converted.reporting_amount,
        amount,
        converted.rate_used,
        converted.rate_source
    );
}

/// Asserts that invoice totals equal the sum of their rounded lines
pub fn assert_invoice_totals_consistent(invoice: &Invoice) {
    let subtotal: Decimal = invoice.lines.iter().map(|l| l.net_amount).sum();
    let tax: Decimal = invoice.lines.iter().map(|l| l.tax_amount).sum();
    let total: Decimal = invoice.lines.iter().map(|l| l.line_total).sum();

    assert_eq!(invoice.subtotal, subtotal, "subtotal of {}", invoice.number);
    assert_eq!(invoice.tax_amount, tax, "tax of {}", invoice.number);
    assert_eq!(invoice.total, total, "total of {}", invoice.number);
    assert_eq!(invoice.total, invoice.subtotal + invoice.tax_amount);
}

/// Asserts that settlements never exceed the obligation amount
pub fn assert_not_overpaid(obligation: &Obligation) {
    assert!(
        obligation.settled_total() <= obligation.amount.amount(),
        "Settled {} exceeds amount {}",
        obligation.settled_total(),
        obligation.amount.amount()
    );
    assert!(obligation.outstanding() >= Decimal::ZERO);
}

/// Asserts that the reporting total of a figure is present and as expected
pub fn assert_reporting_total(figure: &Figure, expected: Decimal) {
    match figure.reporting {
        Some(actual) => assert_decimal_approx_eq(actual, expected, REPORTING_TOLERANCE),
        None => panic!("Figure has no reporting total; was show_reporting_currency set?"),
    }
}

/// Asserts `assets = liabilities + equity` in the reporting currency
pub fn assert_balance_sheet_balances(sheet: &BalanceSheet) {
    assert!(
        sheet.is_balanced,
        "Balance sheet as of {} is unbalanced by {:?}",
        sheet.as_of,
        sheet.imbalance.reporting
    );
    if let (Some(assets), Some(other_side)) = (
        sheet.assets.total.reporting,
        sheet.liabilities_and_equity().reporting,
    ) {
        assert_decimal_approx_eq(assets, other_side, REPORTING_TOLERANCE);
    }
}

/// Asserts that each month opens at the previous month's close
pub fn assert_cash_flow_chains(statement: &CashFlowStatement) {
    let mut expected_opening = statement.opening_balance;
    for month in &statement.months {
        assert_eq!(
            month.opening_balance, expected_opening,
            "{} should open at {}",
            month.period, expected_opening
        );
        expected_opening = month.closing_balance;
    }
    assert_eq!(statement.closing_balance, expected_opening);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_approx_eq_within_tolerance() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(100.01), Currency::USD);
        assert_money_approx_eq(&a, &b, dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_money_approx_eq_rejects_currency_mismatch() {
        let a = Money::new(dec!(100.00), Currency::USD);
        let b = Money::new(dec!(100.00), Currency::EUR);
        assert_money_approx_eq(&a, &b, dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "two decimal places")]
    fn test_two_decimal_places_rejects_mills() {
        assert_two_decimal_places(dec!(1.005));
    }

    #[test]
    fn test_reporting_total_on_figure() {
        let mut figure = Figure::zero(true);
        figure.add(Currency::EUR, dec!(100), dec!(110));
        assert_reporting_total(&figure, dec!(110));
    }
}
