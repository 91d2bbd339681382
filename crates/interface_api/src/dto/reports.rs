//! Report query parameters

use chrono::NaiveDate;
use core_kernel::DateRange;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct AsOfParams {
    /// Defaults to today
    pub as_of: Option<NaiveDate>,
    #[serde(default)]
    pub show_reporting_currency: bool,
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(default)]
    pub show_reporting_currency: bool,
}

impl PeriodParams {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        DateRange::new(self.from, self.to).map_err(|e| ApiError::validation(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct CashFlowParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Cash at the start of the first month; required, never assumed
    pub opening_balance: Decimal,
    #[serde(default)]
    pub show_reporting_currency: bool,
}

impl CashFlowParams {
    pub fn range(&self) -> Result<DateRange, ApiError> {
        DateRange::new(self.from, self.to).map_err(|e| ApiError::validation(e.to_string()))
    }
}
