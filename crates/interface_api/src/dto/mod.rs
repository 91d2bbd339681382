//! Request and response bodies
//!
//! Request bodies are validated with `validator` before they are turned into
//! domain requests; responses wrap domain records with the derived fields
//! (display status, outstanding balance) clients need.

pub mod close;
pub mod invoices;
pub mod ledger;
pub mod reports;

use core_kernel::{Currency, Money, MAX_AMOUNT};
use domain_invoicing::MAX_QUANTITY;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::ApiError;

/// Money on the wire: `{ "amount": "100.00", "currency": "EUR" }`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MoneyBody {
    #[validate(custom(function = "amount_in_range"))]
    pub amount: Decimal,
    #[validate(length(equal = 3, message = "must be an ISO 4217 code"))]
    pub currency: String,
}

impl MoneyBody {
    pub fn to_money(&self) -> Result<Money, ApiError> {
        Ok(Money::new(self.amount, parse_currency(&self.currency)?))
    }
}

fn bounded(value: &Decimal, max: Decimal, code: &'static str) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > max {
        let mut error = ValidationError::new(code);
        error.message = Some(format!("must be between 0 and {}", max).into());
        return Err(error);
    }
    Ok(())
}

pub fn amount_in_range(value: &Decimal) -> Result<(), ValidationError> {
    bounded(value, MAX_AMOUNT, "amount_range")
}

pub fn quantity_in_range(value: &Decimal) -> Result<(), ValidationError> {
    bounded(value, MAX_QUANTITY, "quantity_range")
}

pub fn percent_in_range(value: &Decimal) -> Result<(), ValidationError> {
    bounded(value, Decimal::ONE_HUNDRED, "percent_range")
}

pub fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    code.parse::<Currency>()
        .map_err(|e| ApiError::validation(e.to_string()))
}

/// Splits a comma-separated filter (`?status=open,partial`)
pub fn parse_list<T>(raw: Option<&str>) -> Result<Vec<T>, ApiError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<T>().map_err(|e| ApiError::validation(e.to_string())))
            .collect()
    })
    .unwrap_or_else(|| Ok(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::ObligationStatus;

    #[test]
    fn test_parse_list() {
        let statuses: Vec<ObligationStatus> = parse_list(Some("open, partial")).unwrap();
        assert_eq!(statuses, vec![ObligationStatus::Open, ObligationStatus::Partial]);
        assert!(parse_list::<ObligationStatus>(None).unwrap().is_empty());
        assert!(parse_list::<ObligationStatus>(Some("open,lost")).is_err());
    }

    #[test]
    fn test_money_body() {
        let body = MoneyBody {
            amount: Decimal::ONE_HUNDRED,
            currency: "eur".to_string(),
        };
        assert_eq!(body.to_money().unwrap().currency(), Currency::EUR);
    }

    #[test]
    fn test_amount_bounds() {
        let too_big = MoneyBody {
            amount: MAX_AMOUNT + Decimal::ONE,
            currency: "USD".to_string(),
        };
        assert!(too_big.validate().is_err());
        assert!(amount_in_range(&MAX_AMOUNT).is_ok());
        assert!(amount_in_range(&Decimal::NEGATIVE_ONE).is_err());
        assert!(percent_in_range(&Decimal::from(101)).is_err());
        assert!(quantity_in_range(&MAX_QUANTITY).is_ok());
    }
}
