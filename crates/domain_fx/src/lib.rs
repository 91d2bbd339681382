//! Currency conversion domain
//!
//! Converts amounts into the single reporting currency and records the rate,
//! its source and its timestamp next to the converted value. Converted
//! amounts are snapshots: callers embed them in the record being created and
//! never recompute them.

pub mod converted;
pub mod converter;
pub mod error;
pub mod provider;

pub use converted::{ConvertedAmount, IDENTITY_RATE_SOURCE};
pub use converter::{ConversionConfig, CurrencyConverter};
pub use error::FxError;
pub use provider::{RateProvider, RateQuote, StaticRateProvider};
