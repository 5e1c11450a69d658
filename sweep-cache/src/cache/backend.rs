//! Key-value store adapter
//!
//! The narrow contract the cache depends on. Keys are literal strings except in
//! [`KeyValueStore::scan`], where `pattern` uses Redis glob syntax.

use crate::cache::types::{BackendKind, CacheValue, EntryTtl};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// One page of a cursor-driven key scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the traversal is complete
    pub cursor: u64,

    /// Keys matched in this page
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Async key-value store with expiry, scan and pipelined delete
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Store `value`, expiring after `ttl` or never when `ttl` is `None`
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key in one batched round-trip; returns one flag per key
    async fn delete_many(&self, keys: &[String]) -> Result<Vec<bool>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime of `key`, `None` if it does not exist
    async fn ttl(&self, key: &str) -> Result<Option<EntryTtl>>;

    /// One step of a cursor scan; start with cursor `0`
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;

    fn kind(&self) -> BackendKind;
}
