//! Shared state of payables and receivables
//!
//! Stored status is one of open, partial, paid or cancelled. Overdue is
//! never stored: it is derived from the due date whenever a record is read.
//! The `*_as_of` views let the balance sheet look at a record as it stood
//! on a past date.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{add_months, DateRange, Money, SettlementId};
use domain_fx::ConvertedAmount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::Classification;
use crate::error::LedgerError;

/// Months ahead of the reporting date within which a due date is current
pub const CURRENT_HORIZON_MONTHS: u32 = 12;

/// Persisted lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Open,
    Partial,
    Paid,
    Cancelled,
}

impl ObligationStatus {
    /// Open or partially settled
    pub fn is_outstanding(&self) -> bool {
        matches!(self, ObligationStatus::Open | ObligationStatus::Partial)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObligationStatus::Open => "open",
            ObligationStatus::Partial => "partial",
            ObligationStatus::Paid => "paid",
            ObligationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObligationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ObligationStatus::Open),
            "partial" => Ok(ObligationStatus::Partial),
            "paid" => Ok(ObligationStatus::Paid),
            "cancelled" => Ok(ObligationStatus::Cancelled),
            _ => Err(format!("unknown obligation status: {}", s)),
        }
    }
}

/// Status shown to users, including the derived overdue state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Open,
    Partial,
    Overdue,
    Paid,
    Cancelled,
}

/// A receipt or payment applied to a record, in the record's currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub amount: Decimal,
    pub settled_on: NaiveDate,
    pub reference: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub amount: Decimal,
    pub settled_on: NaiveDate,
    pub reference: Option<String>,
}

/// Amount, conversion, dates and settlements of a payable or receivable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    pub amount: Money,
    pub converted: ConvertedAmount,
    /// Accrual date; the record is recognized from this date on
    pub recorded_on: NaiveDate,
    pub due_date: NaiveDate,
    pub status: ObligationStatus,
    pub settlements: Vec<Settlement>,
    pub paid_on: Option<NaiveDate>,
    pub cancelled_on: Option<NaiveDate>,
    /// Overrides the due-date horizon rule on the balance sheet
    pub classification: Option<Classification>,
}

impl Obligation {
    pub fn new(
        amount: Money,
        converted: ConvertedAmount,
        recorded_on: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            converted,
            recorded_on,
            due_date,
            status: ObligationStatus::Open,
            settlements: Vec::new(),
            paid_on: None,
            cancelled_on: None,
            classification: None,
        }
    }

    pub fn settled_total(&self) -> Decimal {
        self.settlements.iter().map(|s| s.amount).sum()
    }

    /// Remaining balance in the record's currency; zero once cancelled
    pub fn outstanding(&self) -> Decimal {
        if self.status == ObligationStatus::Cancelled {
            return Decimal::ZERO;
        }
        self.amount.amount() - self.settled_total()
    }

    /// Remaining balance at the frozen reporting rate
    pub fn outstanding_reporting(&self) -> Decimal {
        if self.status == ObligationStatus::Cancelled {
            return Decimal::ZERO;
        }
        self.converted.reporting_amount
            - self
                .settlements
                .iter()
                .map(|s| self.settlement_reporting(s))
                .sum::<Decimal>()
    }

    /// Reporting-currency value of one settlement.
    ///
    /// Valued as the step in the cumulative converted total, so the
    /// settlements of a paid record add up to its converted amount exactly.
    pub fn settlement_reporting(&self, settlement: &Settlement) -> Decimal {
        let whole = self.amount.amount();
        let mut before = Decimal::ZERO;
        for recorded in &self.settlements {
            if recorded.id == settlement.id {
                let after = before + recorded.amount;
                return self.converted.portion(after, whole) - self.converted.portion(before, whole);
            }
            before += recorded.amount;
        }
        self.converted.portion(settlement.amount, whole)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_outstanding() && self.due_date < today
    }

    pub fn display_status(&self, today: NaiveDate) -> DisplayStatus {
        match self.status {
            _ if self.is_overdue(today) => DisplayStatus::Overdue,
            ObligationStatus::Open => DisplayStatus::Open,
            ObligationStatus::Partial => DisplayStatus::Partial,
            ObligationStatus::Paid => DisplayStatus::Paid,
            ObligationStatus::Cancelled => DisplayStatus::Cancelled,
        }
    }

    /// Applies a settlement, moving the record to partial or paid
    pub fn apply_settlement(
        &mut self,
        entity: &'static str,
        settlement: Settlement,
    ) -> Result<(), LedgerError> {
        if !self.status.is_outstanding() {
            return Err(LedgerError::InvalidStateTransition {
                entity,
                status: self.status.to_string(),
                action: "settle",
            });
        }
        if settlement.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("settlement amount must be positive"));
        }
        let outstanding = self.outstanding();
        if settlement.amount > outstanding {
            return Err(LedgerError::validation(format!(
                "settlement {} exceeds outstanding balance {}",
                settlement.amount, outstanding
            )));
        }
        if settlement.settled_on < self.recorded_on {
            return Err(LedgerError::validation(format!(
                "settlement date {} precedes the record date {}",
                settlement.settled_on, self.recorded_on
            )));
        }

        let settled_on = settlement.settled_on;
        self.settlements.push(settlement);
        if self.outstanding().is_zero() {
            self.status = ObligationStatus::Paid;
            self.paid_on = Some(settled_on);
        } else {
            self.status = ObligationStatus::Partial;
        }
        Ok(())
    }

    pub fn cancel(&mut self, entity: &'static str, on: NaiveDate) -> Result<(), LedgerError> {
        if !self.status.is_outstanding() {
            return Err(LedgerError::InvalidStateTransition {
                entity,
                status: self.status.to_string(),
                action: "cancel",
            });
        }
        self.status = ObligationStatus::Cancelled;
        self.cancelled_on = Some(on);
        Ok(())
    }

    /// Settlements dated inside `range`
    pub fn settlements_within<'a>(&'a self, range: &'a DateRange) -> impl Iterator<Item = &'a Settlement> + 'a {
        self.settlements.iter().filter(move |s| range.contains(s.settled_on))
    }

    pub fn is_recognized_by(&self, as_of: NaiveDate) -> bool {
        self.recorded_on <= as_of
    }

    pub fn is_cancelled_by(&self, as_of: NaiveDate) -> bool {
        self.cancelled_on.map_or(false, |on| on <= as_of)
    }

    pub fn settled_as_of(&self, as_of: NaiveDate) -> Decimal {
        self.settlements
            .iter()
            .filter(|s| s.settled_on <= as_of)
            .map(|s| s.amount)
            .sum()
    }

    pub fn settled_reporting_as_of(&self, as_of: NaiveDate) -> Decimal {
        self.settlements
            .iter()
            .filter(|s| s.settled_on <= as_of)
            .map(|s| self.settlement_reporting(s))
            .sum()
    }

    /// Balance still owed on `as_of`
    pub fn outstanding_as_of(&self, as_of: NaiveDate) -> Decimal {
        if !self.is_recognized_by(as_of) || self.is_cancelled_by(as_of) {
            return Decimal::ZERO;
        }
        self.amount.amount() - self.settled_as_of(as_of)
    }

    pub fn outstanding_reporting_as_of(&self, as_of: NaiveDate) -> Decimal {
        if !self.is_recognized_by(as_of) || self.is_cancelled_by(as_of) {
            return Decimal::ZERO;
        }
        self.converted.reporting_amount - self.settled_reporting_as_of(as_of)
    }

    /// Revenue or expense this record contributes by `as_of`.
    ///
    /// The full amount while the record stands; only what was actually
    /// settled once it has been cancelled.
    pub fn recognized_as_of(&self, as_of: NaiveDate) -> Decimal {
        if !self.is_recognized_by(as_of) {
            Decimal::ZERO
        } else if self.is_cancelled_by(as_of) {
            self.settled_as_of(as_of)
        } else {
            self.amount.amount()
        }
    }

    pub fn recognized_reporting_as_of(&self, as_of: NaiveDate) -> Decimal {
        if !self.is_recognized_by(as_of) {
            Decimal::ZERO
        } else if self.is_cancelled_by(as_of) {
            self.settled_reporting_as_of(as_of)
        } else {
            self.converted.reporting_amount
        }
    }

    /// Current when due within twelve months of `as_of` (or already due),
    /// unless the record carries an explicit classification.
    pub fn classification_as_of(&self, as_of: NaiveDate) -> Classification {
        if let Some(explicit) = self.classification {
            return explicit;
        }
        match add_months(as_of, CURRENT_HORIZON_MONTHS) {
            Ok(horizon) if self.due_date > horizon => Classification::NonCurrent,
            _ => Classification::Current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn obligation(amount: Decimal, rate: Decimal) -> Obligation {
        let money = Money::new(amount, Currency::EUR);
        let converted = ConvertedAmount {
            reporting_currency: Currency::USD,
            reporting_amount: core_kernel::round_money(amount * rate),
            rate_used: rate,
            rate_source: "test".into(),
            rate_timestamp: Utc::now(),
        };
        Obligation::new(money, converted, date(2025, 1, 10), date(2025, 2, 10))
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

    #[test]
    fn test_partial_then_paid() {
        let mut ob = obligation(dec!(100.00), dec!(1.1));
        ob.apply_settlement("payable", settlement(dec!(40.00), date(2025, 2, 1))).unwrap();
        assert_eq!(ob.status, ObligationStatus::Partial);
        assert_eq!(ob.outstanding(), dec!(60.00));

        ob.apply_settlement("payable", settlement(dec!(60.00), date(2025, 2, 20))).unwrap();
        assert_eq!(ob.status, ObligationStatus::Paid);
        assert_eq!(ob.paid_on, Some(date(2025, 2, 20)));
        assert_eq!(ob.outstanding_reporting(), dec!(0));
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut ob = obligation(dec!(100.00), dec!(1));
        let err = ob
            .apply_settlement("payable", settlement(dec!(100.01), date(2025, 2, 1)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ob.status, ObligationStatus::Open);
    }

    #[test]
    fn test_settlement_before_record_date_rejected() {
        let mut ob = obligation(dec!(100.00), dec!(1));
        assert!(ob
            .apply_settlement("payable", settlement(dec!(1), date(2025, 1, 9)))
            .is_err());
    }

    #[test]
    fn test_overdue_is_derived() {
        let ob = obligation(dec!(100.00), dec!(1));
        assert_eq!(ob.display_status(date(2025, 2, 10)), DisplayStatus::Open);
        assert_eq!(ob.display_status(date(2025, 2, 11)), DisplayStatus::Overdue);
        assert_eq!(ob.status, ObligationStatus::Open);
    }

    #[test]
    fn test_paid_is_never_overdue() {
        let mut ob = obligation(dec!(10.00), dec!(1));
        ob.apply_settlement("receivable", settlement(dec!(10.00), date(2025, 1, 15))).unwrap();
        assert_eq!(ob.display_status(date(2026, 1, 1)), DisplayStatus::Paid);
    }

    #[test]
    fn test_cancel_only_outstanding() {
        let mut ob = obligation(dec!(10.00), dec!(1));
        ob.cancel("receivable", date(2025, 1, 20)).unwrap();
        assert_eq!(ob.outstanding(), dec!(0));
        assert!(matches!(
            ob.cancel("receivable", date(2025, 1, 21)),
            Err(LedgerError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_as_of_views() {
        let mut ob = obligation(dec!(100.00), dec!(2));
        ob.apply_settlement("receivable", settlement(dec!(30.00), date(2025, 2, 5))).unwrap();
        ob.cancel("receivable", date(2025, 3, 1)).unwrap();

        // before recognition
        assert_eq!(ob.outstanding_as_of(date(2025, 1, 1)), dec!(0));
        assert_eq!(ob.recognized_as_of(date(2025, 1, 1)), dec!(0));
        // standing, partly settled
        assert_eq!(ob.outstanding_as_of(date(2025, 2, 15)), dec!(70.00));
        assert_eq!(ob.outstanding_reporting_as_of(date(2025, 2, 15)), dec!(140.00));
        assert_eq!(ob.recognized_as_of(date(2025, 2, 15)), dec!(100.00));
        // after cancellation only the settled part remains recognized
        assert_eq!(ob.outstanding_as_of(date(2025, 3, 31)), dec!(0));
        assert_eq!(ob.recognized_as_of(date(2025, 3, 31)), dec!(30.00));
        assert_eq!(ob.recognized_reporting_as_of(date(2025, 3, 31)), dec!(60.00));
    }

    #[test]
    fn test_classification_horizon() {
        let mut ob = obligation(dec!(10), dec!(1));
        ob.due_date = date(2026, 1, 10);
        assert_eq!(ob.classification_as_of(date(2025, 1, 10)), Classification::Current);
        assert_eq!(ob.classification_as_of(date(2025, 1, 9)), Classification::NonCurrent);

        ob.classification = Some(Classification::Current);
        assert_eq!(ob.classification_as_of(date(2024, 1, 1)), Classification::Current);
    }
}
