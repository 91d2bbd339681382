//! Recurring obligations
//!
//! A recurring payable or receivable is materialized as its full series when
//! it is created: one record per period up to and including the end date,
//! all sharing a [`SeriesId`] and the conversion snapshot taken at creation.

use chrono::NaiveDate;
use core_kernel::{add_months, SeriesId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::LedgerError;

/// Longest series accepted in one creation call
pub const MAX_OCCURRENCES: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Monthly,
    Quarterly,
}

impl RecurrenceFrequency {
    pub fn months(&self) -> u32 {
        match self {
            RecurrenceFrequency::Monthly => 1,
            RecurrenceFrequency::Quarterly => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Monthly => "monthly",
            RecurrenceFrequency::Quarterly => "quarterly",
        }
    }
}

impl FromStr for RecurrenceFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(RecurrenceFrequency::Monthly),
            "quarterly" => Ok(RecurrenceFrequency::Quarterly),
            _ => Err(format!("unknown recurrence frequency: {}", s)),
        }
    }
}

/// Recurrence descriptor captured on the first record of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    pub end_date: NaiveDate,
}

/// Position of a record inside its series (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRef {
    pub series_id: SeriesId,
    pub occurrence: u32,
}

/// Dates of one occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub number: u32,
    pub recorded_on: NaiveDate,
    pub due_date: NaiveDate,
}

impl Recurrence {
    /// Expands the series starting at `first_recorded`/`first_due`.
    ///
    /// Each occurrence is offset from the first one (not from its
    /// predecessor) so that month-end clamping does not drift.
    pub fn schedule(
        &self,
        first_recorded: NaiveDate,
        first_due: NaiveDate,
    ) -> Result<Vec<Occurrence>, LedgerError> {
        if self.end_date < first_due {
            return Err(LedgerError::validation(format!(
                "recurrence end date {} is before the first due date {}",
                self.end_date, first_due
            )));
        }

        let step = self.frequency.months();
        let mut occurrences = Vec::new();
        for index in 0u32.. {
            let due_date = add_months(first_due, index * step)?;
            if due_date > self.end_date {
                break;
            }
            if occurrences.len() == MAX_OCCURRENCES {
                return Err(LedgerError::validation(format!(
                    "recurrence would create more than {} records",
                    MAX_OCCURRENCES
                )));
            }
            occurrences.push(Occurrence {
                number: index + 1,
                recorded_on: add_months(first_recorded, index * step)?,
                due_date,
            });
        }
        Ok(occurrences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_series_clamps_month_end() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2025, 4, 30),
        };
        let schedule = recurrence.schedule(date(2025, 1, 1), date(2025, 1, 31)).unwrap();
        let dues: Vec<NaiveDate> = schedule.iter().map(|o| o.due_date).collect();
        assert_eq!(
            dues,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31), date(2025, 4, 30)]
        );
        assert_eq!(schedule[3].number, 4);
        assert_eq!(schedule[3].recorded_on, date(2025, 4, 1));
    }

    #[test]
    fn test_quarterly_series_includes_end_date() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Quarterly,
            end_date: date(2025, 12, 10),
        };
        let schedule = recurrence.schedule(date(2025, 3, 1), date(2025, 3, 10)).unwrap();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[3].due_date, date(2025, 12, 10));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2024, 12, 31),
        };
        assert!(recurrence.schedule(date(2025, 1, 1), date(2025, 1, 15)).is_err());
    }

    #[test]
    fn test_series_length_is_capped() {
        let recurrence = Recurrence {
            frequency: RecurrenceFrequency::Monthly,
            end_date: date(2040, 1, 1),
        };
        assert!(recurrence.schedule(date(2025, 1, 1), date(2025, 1, 1)).is_err());
    }
}
