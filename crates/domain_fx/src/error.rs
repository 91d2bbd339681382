//! Conversion errors

use core_kernel::{Currency, ErrorKind};
use thiserror::Error;

/// Errors that can occur while converting to the reporting currency
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FxError {
    /// The amount cannot be converted (negative original amounts)
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// No usable rate could be obtained. Never replaced by a default rate.
    #[error("Exchange rate unavailable for {base}/{quote}: {reason}")]
    RateUnavailable {
        base: Currency,
        quote: Currency,
        reason: String,
    },
}

impl FxError {
    pub fn unavailable(base: Currency, quote: Currency, reason: impl Into<String>) -> Self {
        FxError::RateUnavailable {
            base,
            quote,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FxError::InvalidAmount(_) => ErrorKind::Validation,
            FxError::RateUnavailable { .. } => ErrorKind::RateUnavailable,
        }
    }
}
