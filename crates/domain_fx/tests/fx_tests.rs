//! Integration tests for the currency conversion service

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{
    AdapterHealth, Currency, DomainPort, HealthCheckResult, HealthCheckable, Money, PortError,
};
use domain_fx::{ConversionConfig, CurrencyConverter, FxError, RateProvider, RateQuote, StaticRateProvider};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test providers
// ============================================================================

/// Fails the first `failures` calls, then quotes `rate`
struct FlakyProvider {
    failures: u32,
    calls: AtomicU32,
    rate: Decimal,
    delay: Duration,
    permanent: bool,
}

impl FlakyProvider {
    fn failing(failures: u32, rate: Decimal) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            rate,
            delay: Duration::ZERO,
            permanent: false,
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            failures: 0,
            calls: AtomicU32::new(0),
            rate: dec!(1),
            delay,
            permanent: false,
        }
    }

    fn unknown_pair() -> Self {
        Self {
            failures: u32::MAX,
            calls: AtomicU32::new(0),
            rate: dec!(1),
            delay: Duration::ZERO,
            permanent: true,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for FlakyProvider {}

#[async_trait]
impl HealthCheckable for FlakyProvider {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::new("flaky", AdapterHealth::Degraded, 0)
    }
}

#[async_trait]
impl RateProvider for FlakyProvider {
    fn provider_id(&self) -> &str {
        "flaky"
    }

    async fn get_rate(
        &self,
        base: Currency,
        quote: Currency,
        _as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, PortError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.permanent {
            return Err(PortError::not_found("ExchangeRate", format!("{}/{}", base, quote)));
        }
        if call < self.failures {
            return Err(PortError::ServiceUnavailable {
                service: "rates".to_string(),
            });
        }
        Ok(RateQuote {
            base,
            quote,
            rate: self.rate,
            timestamp: Utc::now(),
            source: "flaky".to_string(),
        })
    }
}

fn fast_config() -> ConversionConfig {
    ConversionConfig {
        reporting_currency: Currency::USD,
        timeout: Duration::from_millis(50),
        max_attempts: 2,
        retry_backoff: Duration::from_millis(1),
        cache_ttl: Duration::from_secs(60),
    }
}

// ============================================================================
// Conversion behaviour
// ============================================================================

mod conversion_tests {
    use super::*;

    #[tokio::test]
    async fn test_converts_with_provider_rate_and_provenance() {
        let provider = Arc::new(
            StaticRateProvider::with_rates("manual", [(Currency::BRL, Currency::USD, dec!(0.19))]).await,
        );
        let converter = CurrencyConverter::new(provider, fast_config());

        let converted = converter
            .convert(&Money::new(dec!(1000.00), Currency::BRL), None)
            .await
            .unwrap();

        assert_eq!(converted.reporting_currency, Currency::USD);
        assert_eq!(converted.reporting_amount, dec!(190.00));
        assert_eq!(converted.rate_used, dec!(0.19));
        assert_eq!(converted.rate_source, "manual");
    }

    #[tokio::test]
    async fn test_frozen_snapshot_survives_rate_change() {
        let provider = Arc::new(
            StaticRateProvider::with_rates("manual", [(Currency::EUR, Currency::USD, dec!(1.10))]).await,
        );
        let mut config = fast_config();
        config.cache_ttl = Duration::ZERO;
        let converter = CurrencyConverter::new(provider.clone(), config);

        let amount = Money::new(dec!(250.00), Currency::EUR);
        let snapshot = converter.convert(&amount, None).await.unwrap();

        provider.set_rate(Currency::EUR, Currency::USD, dec!(1.30)).await;
        let fresh = converter.convert(&amount, None).await.unwrap();

        assert_eq!(snapshot.reporting_amount, dec!(275.00));
        assert_eq!(snapshot.reporting_amount, amount.amount() * snapshot.rate_used);
        assert_eq!(fresh.reporting_amount, dec!(325.00));
    }

    #[tokio::test]
    async fn test_amount_too_large_for_rate_is_rejected() {
        let provider = Arc::new(
            StaticRateProvider::with_rates("manual", [(Currency::JPY, Currency::USD, dec!(9000))]).await,
        );
        let converter = CurrencyConverter::new(provider, fast_config());

        let err = converter
            .convert(&Money::new(Decimal::MAX, Currency::JPY), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FxError::InvalidAmount(_)));
        assert!(!err.kind().is_retryable());
    }

    #[tokio::test]
    async fn test_missing_rate_is_unavailable_not_defaulted() {
        let provider = Arc::new(StaticRateProvider::new("manual"));
        let converter = CurrencyConverter::new(provider, fast_config());

        let err = converter
            .convert(&Money::new(dec!(10), Currency::GBP), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FxError::RateUnavailable { base: Currency::GBP, .. }));
        assert!(err.kind().is_retryable());
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let provider = Arc::new(
            StaticRateProvider::with_rates("manual", [(Currency::MXN, Currency::USD, dec!(0))]).await,
        );
        let converter = CurrencyConverter::new(provider, fast_config());

        let err = converter
            .convert(&Money::new(dec!(10), Currency::MXN), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FxError::RateUnavailable { .. }));
    }
}

// ============================================================================
// Retry, timeout and caching
// ============================================================================

mod resilience_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_transient_failure_is_retried() {
        let provider = Arc::new(FlakyProvider::failing(1, dec!(0.5)));
        let converter = CurrencyConverter::new(provider.clone(), fast_config());

        let converted = converter
            .convert(&Money::new(dec!(10), Currency::CHF), None)
            .await
            .unwrap();
        assert_eq!(converted.reporting_amount, dec!(5.00));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_two_attempts() {
        let provider = Arc::new(FlakyProvider::failing(5, dec!(0.5)));
        let converter = CurrencyConverter::new(provider.clone(), fast_config());

        let err = converter
            .convert(&Money::new(dec!(10), Currency::CHF), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FxError::RateUnavailable { .. }));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let provider = Arc::new(FlakyProvider::unknown_pair());
        let converter = CurrencyConverter::new(provider.clone(), fast_config());

        let result = converter.convert(&Money::new(dec!(10), Currency::CHF), None).await;
        assert!(result.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(FlakyProvider::slow(Duration::from_millis(500)));
        let converter = CurrencyConverter::new(provider.clone(), fast_config());

        let err = converter
            .convert(&Money::new(dec!(10), Currency::JPY), None)
            .await
            .unwrap_err();
        match err {
            FxError::RateUnavailable { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_quotes_are_cached_within_ttl() {
        let provider = Arc::new(FlakyProvider::failing(0, dec!(2)));
        let converter = CurrencyConverter::new(provider.clone(), fast_config());

        let amounts = vec![
            Money::new(dec!(1), Currency::AUD),
            Money::new(dec!(2), Currency::AUD),
            Money::new(dec!(3), Currency::AUD),
        ];
        let converted = converter.convert_many(&amounts, None).await.unwrap();

        assert_eq!(converted.len(), 3);
        assert_eq!(converted[2].reporting_amount, dec!(6.00));
        assert_eq!(provider.calls(), 1);

        converter.clear_cache().await;
        converter.convert(&amounts[0], None).await.unwrap();
        assert_eq!(provider.calls(), 2);
    }
}

// ============================================================================
// Properties
// ============================================================================

mod property_tests {
    use super::*;
    use domain_fx::ConvertedAmount;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn converted_amount_matches_rate(
            minor in 0i64..10_000_000_000i64,
            rate_micro in 1i64..50_000_000i64
        ) {
            let money = Money::from_minor(minor, Currency::EUR);
            let quote = RateQuote {
                base: Currency::EUR,
                quote: Currency::USD,
                rate: Decimal::new(rate_micro, 6),
                timestamp: Utc::now(),
                source: "prop".to_string(),
            };
            let converted = ConvertedAmount::from_quote(&money, &quote).unwrap();

            prop_assert!(converted.is_consistent_with(money.amount()));
            prop_assert!((converted.reporting_amount - money.amount() * quote.rate).abs() <= dec!(0.005));
        }
    }
}
