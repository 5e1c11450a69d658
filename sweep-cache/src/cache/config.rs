//! Configuration for the cache system

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable names read by [`CacheConfig::from_env`] and [`RedisConfig::from_env`]
pub mod env {
    pub const REDIS_URL: &str = "REDIS_URL";
    pub const REDIS_CONNECT_TIMEOUT_MS: &str = "REDIS_CONNECT_TIMEOUT_MS";
    pub const REDIS_RECONNECT_COOLDOWN_MS: &str = "REDIS_RECONNECT_COOLDOWN_MS";
    pub const BALANCES_TTL_SECS: &str = "CACHE_BALANCES_TTL_SECS";
    pub const PRICE_TTL_SECS: &str = "CACHE_PRICE_TTL_SECS";
    pub const IMAGE_TTL_SECS: &str = "CACHE_IMAGE_TTL_SECS";
    pub const SCAN_COUNT: &str = "CACHE_SCAN_COUNT";
    pub const MAX_SCAN_ITERATIONS: &str = "CACHE_MAX_SCAN_ITERATIONS";
    pub const TTL_JITTER: &str = "CACHE_TTL_JITTER";
}

/// Configuration for the read-through cache
///
/// TTL conventions used by the read routes:
/// - wallet balance pages: 5 minutes
/// - token prices: 10 minutes
/// - token images: no expiration (zero)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for wallet token-balance pages
    pub balances_ttl: Duration,

    /// TTL for token price lookups
    pub price_ttl: Duration,

    /// TTL for token image lookups; zero stores without expiration
    pub image_ttl: Duration,

    /// Page size hint passed as `COUNT` to each `SCAN` step
    pub scan_count: usize,

    /// Upper bound on `SCAN` round-trips for a single pattern invalidation
    pub max_scan_iterations: usize,

    /// TTL jitter factor (0.0 - 1.0) applied to expiring entries
    /// Zero keeps TTLs exact
    pub ttl_jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            balances_ttl: Duration::from_secs(300),
            price_ttl: Duration::from_secs(600),
            image_ttl: Duration::ZERO,
            scan_count: 100,
            max_scan_iterations: 10_000,
            ttl_jitter: 0.0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the process environment (and `.env` if present)
    ///
    /// Unset variables fall back to the defaults; malformed ones are rejected.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            balances_ttl: env_secs(env::BALANCES_TTL_SECS)?.unwrap_or(defaults.balances_ttl),
            price_ttl: env_secs(env::PRICE_TTL_SECS)?.unwrap_or(defaults.price_ttl),
            image_ttl: env_secs(env::IMAGE_TTL_SECS)?.unwrap_or(defaults.image_ttl),
            scan_count: env_parse(env::SCAN_COUNT)?.unwrap_or(defaults.scan_count),
            max_scan_iterations: env_parse(env::MAX_SCAN_ITERATIONS)?
                .unwrap_or(defaults.max_scan_iterations),
            ttl_jitter: env_parse(env::TTL_JITTER)?.unwrap_or(defaults.ttl_jitter),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.scan_count == 0 {
            return Err(CacheError::Config(
                "scan_count must be greater than 0".to_string(),
            ));
        }

        if self.max_scan_iterations == 0 {
            return Err(CacheError::Config(
                "max_scan_iterations must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::Config(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    ///
    /// A zero TTL means "no expiration" and is returned unchanged.
    pub fn ttl_with_jitter(&self, ttl: Duration) -> Duration {
        if self.ttl_jitter == 0.0 || ttl.is_zero() {
            return ttl;
        }

        let base_secs = ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs(final_secs.round() as u64)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    balances_ttl: Option<Duration>,
    price_ttl: Option<Duration>,
    image_ttl: Option<Duration>,
    scan_count: Option<usize>,
    max_scan_iterations: Option<usize>,
    ttl_jitter: Option<f64>,
}

impl CacheConfigBuilder {
    /// Set TTL for wallet balance pages
    pub fn balances_ttl(mut self, ttl: Duration) -> Self {
        self.balances_ttl = Some(ttl);
        self
    }

    /// Set TTL for token prices
    pub fn price_ttl(mut self, ttl: Duration) -> Self {
        self.price_ttl = Some(ttl);
        self
    }

    /// Set TTL for token images
    pub fn image_ttl(mut self, ttl: Duration) -> Self {
        self.image_ttl = Some(ttl);
        self
    }

    /// Set the `SCAN` page size
    pub fn scan_count(mut self, count: usize) -> Self {
        self.scan_count = Some(count);
        self
    }

    /// Set the cap on `SCAN` round-trips per pattern invalidation
    pub fn max_scan_iterations(mut self, max: usize) -> Self {
        self.max_scan_iterations = Some(max);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            balances_ttl: self.balances_ttl.unwrap_or(defaults.balances_ttl),
            price_ttl: self.price_ttl.unwrap_or(defaults.price_ttl),
            image_ttl: self.image_ttl.unwrap_or(defaults.image_ttl),
            scan_count: self.scan_count.unwrap_or(defaults.scan_count),
            max_scan_iterations: self
                .max_scan_iterations
                .unwrap_or(defaults.max_scan_iterations),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
        }
    }
}

/// Connection settings for the Redis backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,

    /// Timeout for establishing the shared connection
    pub connection_timeout: Duration,

    /// After a failed connect, operations fail immediately for this long
    /// instead of dialing again
    pub reconnect_cooldown: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connection_timeout: Duration::from_secs(5),
            reconnect_cooldown: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create a config for the given URL with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load connection settings from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            url: std::env::var(env::REDIS_URL).unwrap_or(defaults.url),
            connection_timeout: env_parse::<u64>(env::REDIS_CONNECT_TIMEOUT_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.connection_timeout),
            reconnect_cooldown: env_parse::<u64>(env::REDIS_RECONNECT_COOLDOWN_MS)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_cooldown),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CacheError::Config(format!("invalid value for {}: {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

fn env_secs(name: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(name)?.map(Duration::from_secs))
}
