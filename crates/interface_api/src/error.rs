//! API error handling
//!
//! Domain errors reach the wire through their [`ErrorKind`]: the kind picks
//! the status code, and retryable kinds carry a "try again" hint plus a
//! `Retry-After` header.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use core_kernel::{CoreError, ErrorKind};
use domain_fx::FxError;
use domain_invoicing::InvoiceError;
use domain_ledger::LedgerError;
use domain_reporting::ReportingError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use crate::auth::AuthError;

const RETRY_HINT: &str = "try again";

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    #[error("Period closed: {0}")]
    PeriodClosed(String),

    #[error("Exchange rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Validation error: {message}")]
    Validation { message: String, details: Vec<String> },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Maps a domain failure onto the shared taxonomy
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => ApiError::validation(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::InvalidStateTransition => ApiError::InvalidState(message),
            ErrorKind::RateUnavailable => ApiError::RateUnavailable(message),
            ErrorKind::ConcurrencyConflict => ApiError::Conflict(message),
            ErrorKind::PeriodClosed => ApiError::PeriodClosed(message),
            ErrorKind::Internal => ApiError::Internal(message),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Conflict(_) | ApiError::RateUnavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) | ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::PeriodClosed(_) => StatusCode::LOCKED,
            ApiError::RateUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Conflict(_) => "concurrency_conflict",
            ApiError::InvalidState(_) => "invalid_state_transition",
            ApiError::PeriodClosed(_) => "period_closed",
            ApiError::RateUnavailable(_) => "rate_unavailable",
            ApiError::Validation { .. } => "validation_error",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retryable = self.is_retryable();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
        }

        let (message, details) = match &self {
            ApiError::Validation { message, details } if !details.is_empty() => {
                (message.clone(), Some(details.clone()))
            }
            ApiError::Validation { message, .. } => (message.clone(), None),
            ApiError::Unauthorized => ("Unauthorized".to_string(), None),
            ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Forbidden(m)
            | ApiError::Conflict(m)
            | ApiError::InvalidState(m)
            | ApiError::PeriodClosed(m)
            | ApiError::RateUnavailable(m)
            | ApiError::Internal(m) => (m.clone(), None),
        };

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message,
            details,
            retryable,
            hint: retryable.then(|| RETRY_HINT.to_string()),
        };

        if retryable {
            (status, [(header::RETRY_AFTER, "1")], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

macro_rules! from_domain_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ApiError {
                fn from(err: $error) -> Self {
                    ApiError::from_kind(err.kind(), err.to_string())
                }
            }
        )*
    };
}

from_domain_error!(CoreError, FxError, LedgerError, InvoiceError, ReportingError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingPermission(_) => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Unauthorized,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        details.sort();
        ApiError::Validation {
            message: "request validation failed".to_string(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::YearMonth;

    #[test]
    fn test_kind_to_status() {
        let cases = [
            (ErrorKind::Validation, StatusCode::UNPROCESSABLE_ENTITY),
            (ErrorKind::NotFound, StatusCode::NOT_FOUND),
            (ErrorKind::InvalidStateTransition, StatusCode::CONFLICT),
            (ErrorKind::RateUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (ErrorKind::ConcurrencyConflict, StatusCode::CONFLICT),
            (ErrorKind::PeriodClosed, StatusCode::LOCKED),
            (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, status) in cases {
            assert_eq!(ApiError::from_kind(kind, String::new()).status(), status, "{:?}", kind);
        }
    }

    #[test]
    fn test_retryable_response_carries_hint() {
        let response = ApiError::RateUnavailable("EUR/USD".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");

        let response = ApiError::InvalidState("paid".to_string()).into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_reporting_error_maps_through_kind() {
        let period: YearMonth = "2025-06".parse().unwrap();
        let err: ApiError = ReportingError::AlreadyClosed(period).into();
        assert!(matches!(err, ApiError::InvalidState(_)));
    }
}
