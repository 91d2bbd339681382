//! Core error types used across the system

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::money::MoneyError;
use crate::temporal::TemporalError;

/// Error taxonomy shared by every domain crate.
///
/// Domain errors map themselves onto one of these kinds so the interface
/// layer can choose status codes and "try again" hints uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidStateTransition,
    RateUnavailable,
    ConcurrencyConflict,
    PeriodClosed,
    Internal,
}

impl ErrorKind {
    /// Retrying the whole operation once may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateUnavailable | ErrorKind::ConcurrencyConflict)
    }
}

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        CoreError::InvalidStateTransition(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Money(MoneyError::UnknownCurrency(_)) => ErrorKind::NotFound,
            CoreError::Money(_) | CoreError::Temporal(_) | CoreError::Validation(_) => {
                ErrorKind::Validation
            }
            CoreError::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Configuration(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_currency_is_not_found() {
        let err = CoreError::from(MoneyError::UnknownCurrency("XYZ".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::RateUnavailable.is_retryable());
        assert!(ErrorKind::ConcurrencyConflict.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
    }
}
