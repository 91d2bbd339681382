//! Conversion to the reporting currency
//!
//! Provider calls are bounded by a timeout and retried a small number of
//! times with exponential backoff. Quotes are cached briefly per currency
//! pair; converted amounts themselves are never cached or recomputed.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{Clock, Currency, Money, SystemClock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::converted::ConvertedAmount;
use crate::error::FxError;
use crate::provider::{RateProvider, RateQuote};

/// Converter settings
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Currency every record is converted into
    pub reporting_currency: Currency,
    /// Upper bound for a single provider call
    pub timeout: Duration,
    /// Total provider attempts per lookup (at least one)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt
    pub retry_backoff: Duration,
    /// How long a fetched quote may be reused
    pub cache_ttl: Duration,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            reporting_currency: Currency::USD,
            timeout: Duration::from_secs(3),
            max_attempts: 2,
            retry_backoff: Duration::from_millis(200),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RateKey {
    base: Currency,
    quote: Currency,
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
struct CachedQuote {
    quote: RateQuote,
    fetched_at: Instant,
}

/// Converts money into the configured reporting currency
pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
    config: ConversionConfig,
    clock: Arc<dyn Clock>,
    cache: RwLock<HashMap<RateKey, CachedQuote>>,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>, config: ConversionConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock::default()))
    }

    pub fn with_clock(
        provider: Arc<dyn RateProvider>,
        config: ConversionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            config,
            clock,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn reporting_currency(&self) -> Currency {
        self.config.reporting_currency
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Converts `money` into the reporting currency.
    ///
    /// Same-currency amounts use rate 1 with source `"identity"`. Otherwise
    /// the provider's rate is used, or `RateUnavailable` is returned; a stale
    /// or default rate is never substituted.
    #[instrument(skip(self), fields(currency = %money.currency(), reporting = %self.config.reporting_currency))]
    pub async fn convert(
        &self,
        money: &Money,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<ConvertedAmount, FxError> {
        if money.is_negative() {
            return Err(FxError::InvalidAmount(format!(
                "cannot convert negative amount {}",
                money
            )));
        }

        if money.currency() == self.config.reporting_currency {
            return Ok(ConvertedAmount::identity(money, self.clock.now()));
        }

        let quote = self.quote(money.currency(), as_of).await?;
        ConvertedAmount::from_quote(money, &quote)
    }

    /// Converts several amounts; lookups for a shared currency hit the cache
    pub async fn convert_many(
        &self,
        amounts: &[Money],
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<ConvertedAmount>, FxError> {
        let mut converted = Vec::with_capacity(amounts.len());
        for money in amounts {
            converted.push(self.convert(money, as_of).await?);
        }
        Ok(converted)
    }

    /// Drops every cached quote
    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    async fn quote(
        &self,
        base: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, FxError> {
        let key = RateKey {
            base,
            quote: self.config.reporting_currency,
            as_of: as_of.map(|ts| ts.date_naive()),
        };

        if let Some(cached) = self.cache.read().await.get(&key) {
            if cached.fetched_at.elapsed() < self.config.cache_ttl {
                debug!(%base, "using cached rate");
                return Ok(cached.quote.clone());
            }
        }

        let quote = self.fetch_with_retry(key.base, key.quote, as_of).await?;
        if quote.rate <= rust_decimal::Decimal::ZERO {
            return Err(FxError::unavailable(
                key.base,
                key.quote,
                format!("provider returned non-positive rate {}", quote.rate),
            ));
        }

        self.cache.write().await.insert(
            key,
            CachedQuote {
                quote: quote.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(quote)
    }

    async fn fetch_with_retry(
        &self,
        base: Currency,
        quote: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, FxError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=attempts {
            let call = self.provider.get_rate(base, quote, as_of);
            match tokio::time::timeout(self.config.timeout, call).await {
                Ok(Ok(rate)) => return Ok(rate),
                Ok(Err(error)) if error.is_transient() => {
                    warn!(%base, %quote, attempt, %error, "rate provider failed");
                    last_failure = error.to_string();
                }
                Ok(Err(error)) => {
                    return Err(FxError::unavailable(base, quote, error.to_string()));
                }
                Err(_) => {
                    warn!(%base, %quote, attempt, timeout_ms = self.config.timeout.as_millis() as u64, "rate provider timed out");
                    last_failure = format!(
                        "{} timed out after {}ms",
                        self.provider.provider_id(),
                        self.config.timeout.as_millis()
                    );
                }
            }

            if attempt < attempts {
                let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(FxError::unavailable(base, quote, last_failure))
    }
}
