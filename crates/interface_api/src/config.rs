//! API configuration

use core_kernel::{CoreError, Currency, Timezone};
use domain_fx::ConversionConfig;
use serde::Deserialize;
use std::time::Duration;

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable
/// (`API_PORT`, `API_REPORTING_CURRENCY`, ...); unset fields keep their
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// ISO code every record is converted into
    pub reporting_currency: String,
    /// IANA zone used to derive "today"
    pub timezone: String,
    pub fx_timeout_ms: u64,
    pub fx_max_attempts: u32,
    pub fx_retry_backoff_ms: u64,
    pub fx_cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/back_office".to_string(),
            log_level: "info".to_string(),
            reporting_currency: "USD".to_string(),
            timezone: "UTC".to_string(),
            fx_timeout_ms: 3000,
            fx_max_attempts: 2,
            fx_retry_backoff_ms: 200,
            fx_cache_ttl_secs: 300,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reporting_currency(&self) -> Result<Currency, CoreError> {
        Ok(self.reporting_currency.parse::<Currency>()?)
    }

    pub fn timezone(&self) -> Result<Timezone, CoreError> {
        Ok(self.timezone.parse::<Timezone>()?)
    }

    /// Converter settings derived from the `fx_*` fields
    pub fn conversion_config(&self) -> Result<ConversionConfig, CoreError> {
        if self.fx_max_attempts == 0 {
            return Err(CoreError::Configuration("fx_max_attempts must be at least 1".to_string()));
        }
        Ok(ConversionConfig {
            reporting_currency: self.reporting_currency()?,
            timeout: Duration::from_millis(self.fx_timeout_ms),
            max_attempts: self.fx_max_attempts,
            retry_backoff: Duration::from_millis(self.fx_retry_backoff_ms),
            cache_ttl: Duration::from_secs(self.fx_cache_ttl_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.reporting_currency().unwrap(), Currency::USD);

        let fx = config.conversion_config().unwrap();
        assert_eq!(fx.timeout, Duration::from_millis(3000));
        assert_eq!(fx.max_attempts, 2);
        assert_eq!(fx.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_unknown_reporting_currency_is_rejected() {
        let config = ApiConfig {
            reporting_currency: "XYZ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.conversion_config().is_err());
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let config = ApiConfig {
            fx_max_attempts: 0,
            ..ApiConfig::default()
        };
        assert!(matches!(config.conversion_config(), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_timezone_parses() {
        let config = ApiConfig {
            timezone: "America/Sao_Paulo".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.timezone().is_ok());
    }
}
