//! Stored entries for the in-memory backend

use crate::cache::types::{CacheValue, EntryTtl};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored value with its optional expiration
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: CacheValue,

    /// When the entry expires; `None` persists until deleted
    pub expires_at: Option<DateTime<Utc>>,

    /// Insertion sequence number, used as a stable scan position
    pub seq: u64,
}

impl CacheEntry {
    /// Create a new entry; `ttl` of `None` never expires
    pub fn new(value: CacheValue, ttl: Option<Duration>, seq: u64) -> Self {
        let expires_at = ttl.map(|ttl| {
            Utc::now()
                + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500))
        });

        Self {
            value,
            expires_at,
            seq,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let expires_at = self.expires_at?;
        (expires_at - Utc::now()).to_std().ok()
    }

    /// Remaining lifetime in whole seconds, rounded up
    pub fn remaining_ttl(&self) -> EntryTtl {
        match self.time_until_expiration() {
            None if self.expires_at.is_none() => EntryTtl::Persistent,
            None => EntryTtl::Expiring(0),
            Some(left) => {
                let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
                EntryTtl::Expiring(secs)
            }
        }
    }
}
