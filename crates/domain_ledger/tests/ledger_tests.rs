//! Integration tests for ledger records: recurrence, settlement math, and
//! the as-of views used by the statements

use chrono::{NaiveDate, TimeZone, Utc};
use core_kernel::{Currency, Money, SettlementId};
use domain_fx::ConvertedAmount;
use domain_ledger::{
    Classification, ExpenseCategory, LedgerError, Obligation, ObligationStatus, Recurrence,
    RecurrenceFrequency, RevenueCategory, Settlement,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn obligation(amount: Decimal, recorded_on: NaiveDate, due_date: NaiveDate) -> Obligation {
    let money = Money::new(amount, Currency::USD);
    Obligation::new(money, ConvertedAmount::identity(&money, Utc::now()), recorded_on, due_date)
}

/// EUR obligation converted at 1.10 into USD
fn euro_obligation(amount: Decimal, recorded_on: NaiveDate, due_date: NaiveDate) -> Obligation {
    let money = Money::new(amount, Currency::EUR);
    let quote = domain_fx::RateQuote {
        base: Currency::EUR,
        quote: Currency::USD,
        rate: dec!(1.10),
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        source: "ecb".to_string(),
    };
    Obligation::new(money, ConvertedAmount::from_quote(&money, &quote).unwrap(), recorded_on, due_date)
}

fn settlement(amount: Decimal, on: NaiveDate) -> Settlement {
    Settlement {
        id: SettlementId::new(),
        amount,
        settled_on: on,
        reference: None,
        recorded_at: Utc::now(),
    }
}

// ============================================================================
// Recurrence Tests
// ============================================================================

mod recurrence_tests {
    use super::*;

    #[test]
    fn test_quarterly_series_until_end_date() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Quarterly,
            end_date: date(2025, 12, 31),
        };
        let schedule = recurrence.schedule(date(2025, 1, 1), date(2025, 1, 15)).unwrap();

        let dues: Vec<NaiveDate> = schedule.iter().map(|o| o.due_date).collect();
        assert_eq!(
            dues,
            vec![date(2025, 1, 15), date(2025, 4, 15), date(2025, 7, 15), date(2025, 10, 15)]
        );
        assert_eq!(schedule[3].number, 4);
    }

    #[test]
    fn test_month_end_does_not_drift() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2025, 5, 31),
        };
        let schedule = recurrence.schedule(date(2025, 1, 31), date(2025, 1, 31)).unwrap();

        let dues: Vec<NaiveDate> = schedule.iter().map(|o| o.due_date).collect();
        assert_eq!(
            dues,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30),
                date(2025, 5, 31)
            ]
        );
    }

    #[test]
    fn test_end_before_first_due_is_rejected() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2024, 12, 31),
        };
        let result = recurrence.schedule(date(2025, 1, 1), date(2025, 1, 10));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_series_is_capped() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2040, 1, 1),
        };
        let result = recurrence.schedule(date(2025, 1, 1), date(2025, 1, 1));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }
}

// ============================================================================
// Settlement Tests
// ============================================================================

mod settlement_tests {
    use super::*;

    #[test]
    fn test_settlement_before_record_date_is_rejected() {
        let mut ob = obligation(dec!(100), date(2025, 3, 1), date(2025, 3, 31));
        let result = ob.apply_settlement("AccountPayable", settlement(dec!(10), date(2025, 2, 28)));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(ob.status, ObligationStatus::Open);
    }

    #[test]
    fn test_cancelled_record_cannot_be_settled() {
        let mut ob = obligation(dec!(100), date(2025, 3, 1), date(2025, 3, 31));
        ob.cancel("AccountReceivable", date(2025, 3, 5)).unwrap();

        let result = ob.apply_settlement("AccountReceivable", settlement(dec!(10), date(2025, 3, 6)));
        assert!(matches!(result, Err(LedgerError::InvalidStateTransition { action: "settle", .. })));
    }

    #[test]
    fn test_reporting_settlements_sum_to_converted_amount() {
        let mut ob = euro_obligation(dec!(100), date(2025, 1, 1), date(2025, 2, 1));
        ob.apply_settlement("AccountPayable", settlement(dec!(33.33), date(2025, 1, 10)))
            .unwrap();
        ob.apply_settlement("AccountPayable", settlement(dec!(33.33), date(2025, 1, 20)))
            .unwrap();
        ob.apply_settlement("AccountPayable", settlement(dec!(33.34), date(2025, 1, 30)))
            .unwrap();

        assert_eq!(ob.status, ObligationStatus::Paid);
        assert_eq!(ob.settled_reporting_as_of(date(2025, 12, 31)), dec!(110.00));
        assert_eq!(ob.outstanding_reporting(), Decimal::ZERO);
    }
}

// ============================================================================
// As-Of View Tests
// ============================================================================

mod as_of_tests {
    use super::*;

    #[test]
    fn test_outstanding_as_of_ignores_later_settlements() {
        let mut ob = obligation(dec!(500), date(2025, 1, 1), date(2025, 1, 31));
        ob.apply_settlement("AccountReceivable", settlement(dec!(200), date(2025, 2, 10)))
            .unwrap();

        assert_eq!(ob.outstanding_as_of(date(2024, 12, 31)), Decimal::ZERO);
        assert_eq!(ob.outstanding_as_of(date(2025, 1, 31)), dec!(500));
        assert_eq!(ob.outstanding_as_of(date(2025, 2, 28)), dec!(300));
    }

    #[test]
    fn test_cancellation_keeps_only_settled_recognition() {
        let mut ob = obligation(dec!(500), date(2025, 1, 1), date(2025, 1, 31));
        ob.apply_settlement("AccountReceivable", settlement(dec!(200), date(2025, 1, 15)))
            .unwrap();
        ob.cancel("AccountReceivable", date(2025, 2, 1)).unwrap();

        assert_eq!(ob.recognized_as_of(date(2025, 1, 31)), dec!(500));
        assert_eq!(ob.recognized_as_of(date(2025, 2, 1)), dec!(200));
        assert_eq!(ob.outstanding_as_of(date(2025, 2, 1)), Decimal::ZERO);
    }

    #[test]
    fn test_classification_horizon_and_override() {
        let near = obligation(dec!(1), date(2025, 1, 1), date(2026, 1, 1));
        let far = obligation(dec!(1), date(2025, 1, 1), date(2026, 1, 2));
        assert_eq!(near.classification_as_of(date(2025, 1, 1)), Classification::Current);
        assert_eq!(far.classification_as_of(date(2025, 1, 1)), Classification::NonCurrent);

        let mut forced = far.clone();
        forced.classification = Some(Classification::Current);
        assert_eq!(forced.classification_as_of(date(2025, 1, 1)), Classification::Current);
    }
}

// ============================================================================
// Category Tests
// ============================================================================

mod category_tests {
    use super::*;

    #[test]
    fn test_category_codes_round_trip() {
        for category in [
            ExpenseCategory::Payroll,
            ExpenseCategory::Rent,
            ExpenseCategory::ProfessionalServices,
        ] {
            assert_eq!(category.as_str().parse::<ExpenseCategory>().unwrap(), category);
        }
        assert_eq!("interest".parse::<RevenueCategory>().unwrap(), RevenueCategory::Interest);
        assert!("bogus".parse::<RevenueCategory>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(RevenueCategory::default(), RevenueCategory::Services);
        assert_eq!(ExpenseCategory::default(), ExpenseCategory::Other);
    }
}
