//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Cache key type - composed by [`crate::cache::keys`]
pub type CacheKey = String;

/// Cache value type - JSON-serialized payload as stored in the backend
pub type CacheValue = String;

/// Per-call cache options
///
/// A `ttl` of `None` or `Some(0)` stores the entry without expiration; it
/// persists until explicitly invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Time to live in seconds
    pub ttl: Option<u64>,

    /// Optional namespace prefix for the key
    pub namespace: Option<String>,
}

impl CacheOptions {
    /// Options for an entry expiring after `secs` seconds
    pub fn ttl(secs: u64) -> Self {
        Self {
            ttl: Some(secs),
            namespace: None,
        }
    }

    /// Options for an entry that never expires
    pub fn persistent() -> Self {
        Self::default()
    }

    /// Place the key under a namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Effective expiry, `None` when the entry should persist
    pub fn expiry(&self) -> Option<Duration> {
        match self.ttl {
            Some(secs) if secs > 0 => Some(Duration::from_secs(secs)),
            _ => None,
        }
    }
}

/// Remaining lifetime of a stored entry, as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryTtl {
    /// Key exists without an expiration (Redis `TTL` reply `-1`)
    Persistent,

    /// Key expires in the given number of seconds
    Expiring(u64),
}

impl EntryTtl {
    /// Decode a raw Redis `TTL` reply; `-2` (missing key) maps to `None`
    pub fn from_redis_reply(reply: i64) -> Option<Self> {
        match reply {
            -1 => Some(EntryTtl::Persistent),
            n if n >= 0 => Some(EntryTtl::Expiring(n as u64)),
            _ => None,
        }
    }

    /// Encode back to the Redis convention (`-1` for persistent entries)
    pub fn as_secs_i64(&self) -> i64 {
        match self {
            EntryTtl::Persistent => -1,
            EntryTtl::Expiring(secs) => *secs as i64,
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, EntryTtl::Persistent)
    }
}

impl fmt::Display for EntryTtl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryTtl::Persistent => write!(f, "no expiration"),
            EntryTtl::Expiring(secs) => write!(f, "{}m {}s", secs / 60, secs % 60),
        }
    }
}

/// Which backend a cache is running against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Remote Redis server
    Redis,

    /// In-process store (tests, local development)
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Redis => write!(f, "redis"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend: {}", other)),
        }
    }
}
