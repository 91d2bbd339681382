//! Ledger domain errors

use core_kernel::{ErrorKind, MoneyError, PortError, TemporalError, YearMonth};
use domain_fx::FxError;
use thiserror::Error;

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed input; nothing was persisted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced record or counterparty does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The record's current status does not allow the operation
    #[error("Invalid state transition for {entity}: cannot {action} when {status}")]
    InvalidStateTransition {
        entity: &'static str,
        status: String,
        action: &'static str,
    },

    /// The mutation is dated into a closed month
    #[error("Period {0} is closed")]
    PeriodClosed(YearMonth),

    /// Conversion to the reporting currency failed
    #[error(transparent)]
    Fx(#[from] FxError),

    /// The record changed underneath this operation
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// The store failed
    #[error("Store error: {0}")]
    Store(PortError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            LedgerError::PeriodClosed(_) => ErrorKind::PeriodClosed,
            LedgerError::Fx(e) => e.kind(),
            LedgerError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            LedgerError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<PortError> for LedgerError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => LedgerError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => LedgerError::ConcurrencyConflict(message),
            PortError::Validation { message, .. } => LedgerError::Validation(message),
            other => LedgerError::Store(other),
        }
    }
}

impl From<MoneyError> for LedgerError {
    fn from(error: MoneyError) -> Self {
        match error {
            MoneyError::UnknownCurrency(code) => LedgerError::not_found("Currency", code),
            other => LedgerError::Validation(other.to_string()),
        }
    }
}

impl From<TemporalError> for LedgerError {
    fn from(error: TemporalError) -> Self {
        LedgerError::Validation(error.to_string())
    }
}
