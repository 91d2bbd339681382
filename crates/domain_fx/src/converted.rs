//! Frozen conversion snapshots

use chrono::{DateTime, Utc};
use core_kernel::{round_money, Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FxError;
use crate::provider::RateQuote;

/// Rate source recorded when no conversion was needed
pub const IDENTITY_RATE_SOURCE: &str = "identity";

/// Tolerance allowed between `amount * rate_used` and the stored figure
const CONVERSION_TOLERANCE: Decimal = dec!(0.01);

/// The reporting-currency value of an original amount, with provenance.
///
/// `reporting_amount == round2(amount * rate_used)`. Computed once when the
/// owning record is created and stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedAmount {
    pub reporting_currency: Currency,
    #[serde(rename = "amount_reporting_ccy")]
    pub reporting_amount: Decimal,
    pub rate_used: Decimal,
    pub rate_source: String,
    pub rate_timestamp: DateTime<Utc>,
}

impl ConvertedAmount {
    /// Conversion of an amount already in the reporting currency
    pub fn identity(money: &Money, at: DateTime<Utc>) -> Self {
        Self {
            reporting_currency: money.currency(),
            reporting_amount: round_money(money.amount()),
            rate_used: Decimal::ONE,
            rate_source: IDENTITY_RATE_SOURCE.to_string(),
            rate_timestamp: at,
        }
    }

    /// Applies a provider quote to an amount in the quote's base currency
    pub fn from_quote(money: &Money, quote: &RateQuote) -> Result<Self, FxError> {
        let product = money.amount().checked_mul(quote.rate).ok_or_else(|| {
            FxError::InvalidAmount(format!(
                "{} at rate {} is too large to convert",
                money, quote.rate
            ))
        })?;
        Ok(Self {
            reporting_currency: quote.quote,
            reporting_amount: round_money(product),
            rate_used: quote.rate,
            rate_source: quote.source.clone(),
            rate_timestamp: quote.timestamp,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.rate_source == IDENTITY_RATE_SOURCE
    }

    /// Checks the stored figure against the original amount
    pub fn is_consistent_with(&self, amount: Decimal) -> bool {
        (round_money(amount * self.rate_used) - self.reporting_amount).abs() <= CONVERSION_TOLERANCE
    }

    /// Reporting value of `part` of the original `whole`, at the frozen rate.
    ///
    /// The full amount maps to the stored figure exactly, so summing the
    /// portions of a fully settled record never drifts from its snapshot.
    pub fn portion(&self, part: Decimal, whole: Decimal) -> Decimal {
        if part == whole {
            self.reporting_amount
        } else {
            round_money(part * self.rate_used)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(rate: Decimal) -> RateQuote {
        RateQuote {
            base: Currency::BRL,
            quote: Currency::USD,
            rate,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            source: "static".to_string(),
        }
    }

    #[test]
    fn test_identity_conversion() {
        let money = Money::new(dec!(125.40), Currency::USD);
        let converted = ConvertedAmount::identity(&money, Utc::now());
        assert_eq!(converted.rate_used, Decimal::ONE);
        assert_eq!(converted.reporting_amount, dec!(125.40));
        assert!(converted.is_identity());
    }

    #[test]
    fn test_quote_conversion_rounds_half_up() {
        let money = Money::new(dec!(100.00), Currency::BRL);
        let converted = ConvertedAmount::from_quote(&money, &quote(dec!(0.18125))).unwrap();
        assert_eq!(converted.reporting_amount, dec!(18.13));
        assert_eq!(converted.rate_source, "static");
        assert!(converted.is_consistent_with(dec!(100.00)));
        assert!(!converted.is_consistent_with(dec!(120.00)));
    }

    #[test]
    fn test_portion_of_whole_is_exact() {
        let money = Money::new(dec!(333.33), Currency::BRL);
        let converted = ConvertedAmount::from_quote(&money, &quote(dec!(0.2))).unwrap();
        assert_eq!(converted.portion(dec!(333.33), dec!(333.33)), converted.reporting_amount);
        assert_eq!(converted.portion(dec!(100.00), dec!(333.33)), dec!(20.00));
    }

    #[test]
    fn test_overflowing_product_is_an_error() {
        let money = Money::new(Decimal::MAX, Currency::BRL);
        let err = ConvertedAmount::from_quote(&money, &quote(dec!(5000))).unwrap_err();
        assert!(matches!(err, FxError::InvalidAmount(_)));
    }

    #[test]
    fn test_serializes_reporting_suffix() {
        let money = Money::new(dec!(10), Currency::USD);
        let json = serde_json::to_value(ConvertedAmount::identity(&money, Utc::now())).unwrap();
        assert!(json.get("amount_reporting_ccy").is_some());
        assert!(json.get("rate_used").is_some());
    }
}
