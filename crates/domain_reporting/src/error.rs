//! Reporting domain errors

use core_kernel::{ErrorKind, PortError, TemporalError, YearMonth};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Period {0} is already closed")]
    AlreadyClosed(YearMonth),

    #[error("Period {0} is not closed")]
    NotClosed(YearMonth),

    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    #[error("Store error: {0}")]
    Store(PortError),
}

impl ReportingError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReportingError::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportingError::Validation(_) => ErrorKind::Validation,
            ReportingError::AlreadyClosed(_) | ReportingError::NotClosed(_) => {
                ErrorKind::InvalidStateTransition
            }
            ReportingError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            ReportingError::Store(PortError::NotFound { .. }) => ErrorKind::NotFound,
            ReportingError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<PortError> for ReportingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Conflict { message } => ReportingError::ConcurrencyConflict(message),
            PortError::Validation { message, .. } => ReportingError::Validation(message),
            other => ReportingError::Store(other),
        }
    }
}

impl From<TemporalError> for ReportingError {
    fn from(error: TemporalError) -> Self {
        ReportingError::Validation(error.to_string())
    }
}
