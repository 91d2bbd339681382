//! Error taxonomy shared by the domain crates

use core_kernel::{CoreError, ErrorKind, MoneyError, PortError, TemporalError};

#[test]
fn test_money_errors_are_validation_except_unknown_currency() {
    let mismatch = CoreError::from(MoneyError::CurrencyMismatch("USD".into(), "EUR".into()));
    assert_eq!(mismatch.kind(), ErrorKind::Validation);

    let unknown = CoreError::from(MoneyError::UnknownCurrency("ZZZ".into()));
    assert_eq!(unknown.kind(), ErrorKind::NotFound);
}

#[test]
fn test_temporal_errors_are_validation() {
    let err = CoreError::from(TemporalError::InvalidYearMonth("2025-13".into()));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("2025-13"));
}

#[test]
fn test_constructor_kinds() {
    assert_eq!(CoreError::validation("x").kind(), ErrorKind::Validation);
    assert_eq!(
        CoreError::invalid_state("draft -> paid").kind(),
        ErrorKind::InvalidStateTransition
    );
    assert_eq!(CoreError::not_found("invoice").kind(), ErrorKind::NotFound);
    assert_eq!(
        CoreError::Configuration("missing".into()).kind(),
        ErrorKind::Internal
    );
}

#[test]
fn test_only_rate_and_conflict_are_retryable() {
    let retryable: Vec<ErrorKind> = [
        ErrorKind::Validation,
        ErrorKind::NotFound,
        ErrorKind::InvalidStateTransition,
        ErrorKind::RateUnavailable,
        ErrorKind::ConcurrencyConflict,
        ErrorKind::PeriodClosed,
        ErrorKind::Internal,
    ]
    .into_iter()
    .filter(ErrorKind::is_retryable)
    .collect();

    assert_eq!(
        retryable,
        vec![ErrorKind::RateUnavailable, ErrorKind::ConcurrencyConflict]
    );
}

#[test]
fn test_error_kind_serializes_snake_case() {
    let json = serde_json::to_string(&ErrorKind::PeriodClosed).unwrap();
    assert_eq!(json, "\"period_closed\"");
}

#[test]
fn test_port_error_classification() {
    let missing = PortError::not_found("Invoice", "IVC-1");
    assert!(missing.is_not_found());
    assert!(!missing.is_transient());
    assert_eq!(missing.to_string(), "Not found: Invoice with id IVC-1");

    assert!(PortError::conflict("version 3 expected").is_conflict());
    assert!(PortError::connection("pool closed").is_transient());
}
