//! Monthly close DTOs

use core_kernel::YearMonth;
use domain_ledger::PeriodLock;
use serde::Serialize;

use crate::error::ApiError;

/// Parses the `:year_month` path segment (`2025-06`)
pub fn parse_year_month(raw: &str) -> Result<YearMonth, ApiError> {
    raw.parse::<YearMonth>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[derive(Debug, Serialize)]
pub struct ReopenedResponse {
    pub year_month: YearMonth,
    pub is_closed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClosedPeriodsResponse {
    pub periods: Vec<PeriodLock>,
}
