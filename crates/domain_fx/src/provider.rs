//! Exchange rate provider port
//!
//! The converter depends only on [`RateProvider`]; the PostgreSQL-backed
//! rate table lives in `infra_db`, and [`StaticRateProvider`] serves
//! manually maintained rates and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_kernel::{AdapterHealth, Currency, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A rate returned by a provider: `1 base = rate quote`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub base: Currency,
    pub quote: Currency,
    pub rate: Decimal,
    /// Fetch time, or the rate's effective time for historical lookups
    pub timestamp: DateTime<Utc>,
    /// Provider identifier recorded as the rate source
    pub source: String,
}

/// Port for obtaining exchange rates
#[async_trait]
pub trait RateProvider: DomainPort + HealthCheckable {
    /// Identifier recorded in `rate_source`
    fn provider_id(&self) -> &str;

    /// Latest rate for `base -> quote`, or the rate effective at `as_of`
    /// when the provider keeps history.
    ///
    /// Returns `PortError::NotFound` when the pair is unknown and a
    /// transient `PortError` when the provider cannot be reached.
    async fn get_rate(
        &self,
        base: Currency,
        quote: Currency,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, PortError>;
}

/// In-memory rate table, quoted at fetch time
#[derive(Debug)]
pub struct StaticRateProvider {
    source: String,
    rates: RwLock<HashMap<(Currency, Currency), Decimal>>,
}

impl StaticRateProvider {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rates: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a provider pre-populated with `(base, quote, rate)` triples
    pub async fn with_rates(
        source: impl Into<String>,
        rates: impl IntoIterator<Item = (Currency, Currency, Decimal)>,
    ) -> Self {
        let provider = Self::new(source);
        for (base, quote, rate) in rates {
            provider.set_rate(base, quote, rate).await;
        }
        provider
    }

    /// Inserts or replaces a rate
    pub async fn set_rate(&self, base: Currency, quote: Currency, rate: Decimal) {
        self.rates.write().await.insert((base, quote), rate);
    }

    pub async fn remove_rate(&self, base: Currency, quote: Currency) {
        self.rates.write().await.remove(&(base, quote));
    }
}

impl DomainPort for StaticRateProvider {}

#[async_trait]
impl HealthCheckable for StaticRateProvider {
    async fn health_check(&self) -> HealthCheckResult {
        let pairs = self.rates.read().await.len();
        HealthCheckResult::new(self.source.clone(), AdapterHealth::Healthy, 0)
            .with_message(format!("{} rate pairs loaded", pairs))
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    fn provider_id(&self) -> &str {
        &self.source
    }

    async fn get_rate(
        &self,
        base: Currency,
        quote: Currency,
        _as_of: Option<DateTime<Utc>>,
    ) -> Result<RateQuote, PortError> {
        let rates = self.rates.read().await;
        let rate = match rates.get(&(base, quote)) {
            Some(rate) => *rate,
            None => match rates.get(&(quote, base)) {
                Some(inverse) if !inverse.is_zero() => Decimal::ONE / *inverse,
                _ => return Err(PortError::not_found("ExchangeRate", format!("{}/{}", base, quote))),
            },
        };

        Ok(RateQuote {
            base,
            quote,
            rate,
            timestamp: Utc::now(),
            source: self.source.clone(),
        })
    }
}
