//! Error types for cache operations
//!
//! Backend errors surface from the [`KeyValueStore`](crate::cache::KeyValueStore)
//! adapters. The read-through engine and the invalidation engine catch them and
//! degrade to safe defaults, so most callers never see a `CacheError` directly.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error - the store could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Redis command failure (wrapper)
    #[error("Redis error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    Timeout { timeout_ms: u64, context: String },

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
