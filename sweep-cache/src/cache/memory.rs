//! In-process [`KeyValueStore`] with Redis-compatible semantics
//!
//! Matches Redis where the cache depends on it: `TTL` replies, glob `MATCH`
//! and cursor-based `SCAN`. Cursors are insertion sequence numbers, so keys
//! deleted between scan steps never cause the remaining keys to be skipped.

use crate::cache::backend::{KeyValueStore, ScanPage};
use crate::cache::entry::CacheEntry;
use crate::cache::types::{BackendKind, CacheValue, EntryTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory key-value store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Main storage: key -> entry
    entries: HashMap<String, CacheEntry>,

    /// Scan order: insertion sequence -> key
    order: BTreeMap<u64, String>,

    /// Last sequence number handed out
    next_seq: u64,
}

impl MemoryInner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// Live entry lookup, evicting it lazily if expired
    fn live(&mut self, key: &str) -> Option<&CacheEntry> {
        if self.entries.get(key).is_some_and(CacheEntry::is_expired) {
            debug!("Memory store entry expired: {}", key);
            self.remove(key);
        }
        self.entries.get(key)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.entries.values().filter(|e| !e.is_expired()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All live keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut inner = self.inner.write().await;
        Ok(inner.live(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        // Overwrites keep their scan position
        let seq = match inner.entries.get(key).map(|e| e.seq) {
            Some(seq) => seq,
            None => {
                inner.next_seq += 1;
                let seq = inner.next_seq;
                inner.order.insert(seq, key.to_string());
                seq
            }
        };

        inner
            .entries
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl, seq));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove(key).is_some_and(|e| !e.is_expired()))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        let mut inner = self.inner.write().await;
        Ok(keys
            .iter()
            .map(|key| inner.remove(key).is_some_and(|e| !e.is_expired()))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.live(key).is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<EntryTtl>> {
        let mut inner = self.inner.write().await;
        Ok(inner.live(key).map(CacheEntry::remaining_ttl))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let matcher = Pattern::new(pattern)
            .map_err(|e| CacheError::Other(format!("invalid scan pattern {:?}: {}", pattern, e)))?;
        let inner = self.inner.read().await;

        let mut examined = 0;
        let mut last_seq = cursor;
        let mut keys = Vec::new();

        for (seq, key) in inner.order.range(cursor + 1..) {
            if examined == count.max(1) {
                break;
            }
            examined += 1;
            last_seq = *seq;

            let live = inner.entries.get(key).is_some_and(|e| !e.is_expired());
            if live && matcher.matches_with(key, MATCH_OPTIONS) {
                keys.push(key.clone());
            }
        }

        let exhausted = inner.order.range(last_seq + 1..).next().is_none();
        let cursor = if exhausted { 0 } else { last_seq };

        Ok(ScanPage { cursor, keys })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}
