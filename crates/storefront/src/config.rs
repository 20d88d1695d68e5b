//! Environment-based configuration.
//!
//! Values come from the process environment, then a `.env` file, then the
//! defaults below.

use std::path::PathBuf;

use thiserror::Error;

use atelier_core::PriceRounding;
use atelier_infra::RefreshPolicy;
use atelier_observability::{LogConfig, LogFormat};
use atelier_pricing::ResolutionStrategy;

pub const PRICE_ROUNDING: &str = "ATELIER_PRICE_ROUNDING";
pub const DISCOUNT_STRATEGY: &str = "ATELIER_DISCOUNT_STRATEGY";
pub const DISCOUNT_CACHE_TTL_SECS: &str = "ATELIER_DISCOUNT_CACHE_TTL_SECS";
pub const DISCOUNT_FEED: &str = "ATELIER_DISCOUNT_FEED";
pub const LOG_FORMAT: &str = "ATELIER_LOG_FORMAT";
pub const LOG_LEVEL: &str = "ATELIER_LOG_LEVEL";

const DEFAULT_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub rounding: PriceRounding,
    pub strategy: ResolutionStrategy,
    pub cache_refresh: RefreshPolicy,
    /// Optional JSON discounts feed merged with the discounts managed in the back office.
    pub discount_feed: Option<PathBuf>,
    pub log: LogConfig,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            rounding: PriceRounding::default(),
            strategy: ResolutionStrategy::default(),
            cache_refresh: RefreshPolicy::from_secs(DEFAULT_CACHE_TTL_SECS),
            discount_feed: None,
            log: LogConfig::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load `.env` (if present) and read the `ATELIER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let rounding = match get(PRICE_ROUNDING) {
            Some(v) => parse(PRICE_ROUNDING, v)?,
            None => defaults.rounding,
        };
        let strategy = match get(DISCOUNT_STRATEGY) {
            Some(v) => parse(DISCOUNT_STRATEGY, v)?,
            None => defaults.strategy,
        };
        let cache_refresh = match get(DISCOUNT_CACHE_TTL_SECS) {
            Some(v) => RefreshPolicy::from_secs(parse::<u64>(DISCOUNT_CACHE_TTL_SECS, v)?),
            None => defaults.cache_refresh,
        };
        let format = match get(LOG_FORMAT) {
            Some(v) => parse::<LogFormat>(LOG_FORMAT, v)?,
            None => defaults.log.format,
        };
        let level = get(LOG_LEVEL)
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.log.level);

        Ok(Self {
            rounding,
            strategy,
            cache_refresh,
            discount_feed: get(DISCOUNT_FEED).map(|v| PathBuf::from(v.trim())),
            log: LogConfig { format, level },
        })
    }

    pub fn init_logging(&self) {
        atelier_observability::init(&self.log);
    }
}

fn parse<T: core::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
