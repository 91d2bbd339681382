//! Invoicing domain errors

use core_kernel::{ErrorKind, PortError, YearMonth};
use domain_fx::FxError;
use domain_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur in the invoicing domain
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Invalid input; nothing was persisted
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Transition not allowed by the invoice state machine
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Period {0} is closed")]
    PeriodClosed(YearMonth),

    #[error(transparent)]
    Fx(#[from] FxError),

    /// The invoice changed underneath this operation
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// Failure raised while maintaining the linked receivable
    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Store error: {0}")]
    Store(PortError),
}

impl InvoiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        InvoiceError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        InvoiceError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        InvoiceError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            InvoiceError::Validation(_) => ErrorKind::Validation,
            InvoiceError::NotFound { .. } => ErrorKind::NotFound,
            InvoiceError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            InvoiceError::PeriodClosed(_) => ErrorKind::PeriodClosed,
            InvoiceError::Fx(e) => e.kind(),
            InvoiceError::ConcurrencyConflict(_) => ErrorKind::ConcurrencyConflict,
            InvoiceError::Ledger(e) => e.kind(),
            InvoiceError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<PortError> for InvoiceError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => InvoiceError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => InvoiceError::ConcurrencyConflict(message),
            PortError::Validation { message, .. } => InvoiceError::Validation(message),
            other => InvoiceError::Store(other),
        }
    }
}

impl From<LedgerError> for InvoiceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::PeriodClosed(period) => InvoiceError::PeriodClosed(period),
            LedgerError::Fx(e) => InvoiceError::Fx(e),
            LedgerError::NotFound { entity, id } => InvoiceError::NotFound { entity, id },
            LedgerError::ConcurrencyConflict(message) => InvoiceError::ConcurrencyConflict(message),
            other => InvoiceError::Ledger(other),
        }
    }
}
