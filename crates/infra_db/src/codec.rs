//! Row types shared by the adapters and their mapping to domain values
//!
//! Enums are stored as their `snake_case` names, currencies as ISO codes,
//! and settlements as a JSONB array on the owning record.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{AdapterHealth, Currency, HealthCheckResult, Money, SeriesId};
use domain_fx::ConvertedAmount;
use domain_ledger::{Obligation, Recurrence, SeriesRef, Settlement};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, QueryBuilder};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DatabaseError;

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Parses a stored enum or code back into its domain type
pub(crate) fn parse<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e| DatabaseError::decode(column, e))
}

pub(crate) fn parse_opt<T>(column: &str, value: Option<&str>) -> Result<Option<T>, DatabaseError>
where
    T: FromStr,
    T::Err: Display,
{
    value.map(|v| parse(column, v)).transpose()
}

pub(crate) fn to_u32(column: &str, value: i32) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|e| DatabaseError::decode(column, e))
}

pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, DatabaseError> {
    i32::try_from(value).map_err(|e| DatabaseError::decode(column, e))
}

/// Reporting-currency snapshot columns
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ConversionRow {
    pub reporting_currency: String,
    pub amount_reporting_ccy: Decimal,
    pub rate_used: Decimal,
    pub rate_source: String,
    pub rate_timestamp: DateTime<Utc>,
}

impl ConversionRow {
    pub fn into_converted(self) -> Result<ConvertedAmount, DatabaseError> {
        Ok(ConvertedAmount {
            reporting_currency: parse("reporting_currency", &self.reporting_currency)?,
            reporting_amount: self.amount_reporting_ccy,
            rate_used: self.rate_used,
            rate_source: self.rate_source,
            rate_timestamp: self.rate_timestamp,
        })
    }
}

/// Binds the five snapshot columns in table order
pub(crate) fn bind_conversion<'q>(query: PgQuery<'q>, converted: &'q ConvertedAmount) -> PgQuery<'q> {
    query
        .bind(converted.reporting_currency.code())
        .bind(converted.reporting_amount)
        .bind(converted.rate_used)
        .bind(converted.rate_source.as_str())
        .bind(converted.rate_timestamp)
}

pub(crate) fn money(column: &str, amount: Decimal, currency: &str) -> Result<Money, DatabaseError> {
    Ok(Money::new(amount, parse::<Currency>(column, currency)?))
}

/// Columns common to payables and receivables
pub(crate) const OBLIGATION_COLUMNS: &str = "amount, currency, reporting_currency, amount_reporting_ccy, \
    rate_used, rate_source, rate_timestamp, recorded_on, due_date, status, settlements, paid_on, \
    cancelled_on, classification, recurrence_frequency, recurrence_end, series_id, occurrence";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ObligationRow {
    pub amount: Decimal,
    pub currency: String,
    #[sqlx(flatten)]
    pub conversion: ConversionRow,
    pub recorded_on: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub settlements: Json<Vec<Settlement>>,
    pub paid_on: Option<NaiveDate>,
    pub cancelled_on: Option<NaiveDate>,
    pub classification: Option<String>,
    pub recurrence_frequency: Option<String>,
    pub recurrence_end: Option<NaiveDate>,
    pub series_id: Option<Uuid>,
    pub occurrence: Option<i32>,
}

pub(crate) struct ObligationParts {
    pub obligation: Obligation,
    pub recurrence: Option<Recurrence>,
    pub series: Option<SeriesRef>,
}

impl ObligationRow {
    pub fn into_parts(self) -> Result<ObligationParts, DatabaseError> {
        let recurrence = match (self.recurrence_frequency.as_deref(), self.recurrence_end) {
            (Some(frequency), Some(end_date)) => Some(Recurrence {
                frequency: parse("recurrence_frequency", frequency)?,
                end_date,
            }),
            _ => None,
        };
        let series = match (self.series_id, self.occurrence) {
            (Some(series_id), Some(occurrence)) => Some(SeriesRef {
                series_id: SeriesId::from_uuid(series_id),
                occurrence: to_u32("occurrence", occurrence)?,
            }),
            _ => None,
        };

        Ok(ObligationParts {
            obligation: Obligation {
                amount: money("currency", self.amount, &self.currency)?,
                converted: self.conversion.into_converted()?,
                recorded_on: self.recorded_on,
                due_date: self.due_date,
                status: parse("status", &self.status)?,
                settlements: self.settlements.0,
                paid_on: self.paid_on,
                cancelled_on: self.cancelled_on,
                classification: parse_opt("classification", self.classification.as_deref())?,
            },
            recurrence,
            series,
        })
    }
}

/// Binds [`OBLIGATION_COLUMNS`] in order
pub(crate) fn bind_obligation<'q>(
    query: PgQuery<'q>,
    obligation: &'q Obligation,
    recurrence: Option<&'q Recurrence>,
    series: Option<&'q SeriesRef>,
) -> Result<PgQuery<'q>, DatabaseError> {
    let occurrence = series.map(|s| to_i32("occurrence", s.occurrence)).transpose()?;
    let query = query
        .bind(obligation.amount.amount())
        .bind(obligation.amount.currency().code());
    Ok(bind_conversion(query, &obligation.converted)
        .bind(obligation.recorded_on)
        .bind(obligation.due_date)
        .bind(obligation.status.as_str())
        .bind(Json(&obligation.settlements))
        .bind(obligation.paid_on)
        .bind(obligation.cancelled_on)
        .bind(obligation.classification.map(|c| c.as_str()))
        .bind(recurrence.map(|r| r.frequency.as_str()))
        .bind(recurrence.map(|r| r.end_date))
        .bind(series.map(|s| *s.series_id.as_uuid()))
        .bind(occurrence))
}

/// `$first, $first+1, ...` for `count` placeholders
pub(crate) fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|n| format!("${}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Appends ` LIMIT .. OFFSET ..` when set
pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, limit: Option<usize>, offset: Option<usize>) {
    if let Some(limit) = limit {
        builder.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if let Some(offset) = offset {
        builder.push(" OFFSET ").push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
    }
}

/// `SELECT 1` round trip reported as a health check
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();
    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::new(adapter_id, AdapterHealth::Healthy, latency_ms),
        Err(e) => HealthCheckResult::new(adapter_id, AdapterHealth::Unhealthy, latency_ms)
            .with_message(format!("Database error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{Classification, ObligationStatus, RecurrenceFrequency};
    use rust_decimal_macros::dec;

    fn row() -> ObligationRow {
        ObligationRow {
            amount: dec!(1000.00),
            currency: "EUR".to_string(),
            conversion: ConversionRow {
                reporting_currency: "USD".to_string(),
                amount_reporting_ccy: dec!(1100.00),
                rate_used: dec!(1.10),
                rate_source: "ecb".to_string(),
                rate_timestamp: Utc::now(),
            },
            recorded_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            status: "partial".to_string(),
            settlements: Json(Vec::new()),
            paid_on: None,
            cancelled_on: None,
            classification: Some("non_current".to_string()),
            recurrence_frequency: Some("monthly".to_string()),
            recurrence_end: NaiveDate::from_ymd_opt(2025, 12, 31),
            series_id: Some(Uuid::new_v4()),
            occurrence: Some(3),
        }
    }

    #[test]
    fn test_obligation_row_maps_to_domain() {
        let parts = row().into_parts().unwrap();
        assert_eq!(parts.obligation.amount.currency(), Currency::EUR);
        assert_eq!(parts.obligation.status, ObligationStatus::Partial);
        assert_eq!(parts.obligation.converted.reporting_amount, dec!(1100.00));
        assert_eq!(parts.obligation.classification, Some(Classification::NonCurrent));
        assert_eq!(parts.recurrence.map(|r| r.frequency), Some(RecurrenceFrequency::Monthly));
        assert_eq!(parts.series.map(|s| s.occurrence), Some(3));
    }

    #[test]
    fn test_unknown_status_is_a_decode_error() {
        let mut bad = row();
        bad.status = "lost".to_string();
        let err = bad.into_parts().err().unwrap();
        assert!(matches!(err, DatabaseError::Decode { ref column, .. } if column == "status"));
    }

    #[test]
    fn test_half_recorded_recurrence_is_ignored() {
        let mut partial = row();
        partial.recurrence_end = None;
        partial.occurrence = None;
        let parts = partial.into_parts().unwrap();
        assert!(parts.recurrence.is_none());
        assert!(parts.series.is_none());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3, 3), "$3, $4, $5");
    }
}
