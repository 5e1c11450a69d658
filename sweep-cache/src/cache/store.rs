//! Read-through cache engine
//!
//! Every public operation is fail-soft: backend errors are logged and turned
//! into a safe default, so a cache outage degrades reads to "always fetch
//! fresh" instead of failing requests. Errors from caller-supplied fetchers are
//! never swallowed.

use crate::cache::{
    backend::KeyValueStore,
    config::CacheConfig,
    keys,
    types::{BackendKind, CacheOptions, EntryTtl},
};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-through cache over a shared [`KeyValueStore`]
///
/// Holds no entry state of its own; everything lives in the store, which is
/// shared across concurrent requests without client-side locking.
#[derive(Clone)]
pub struct ReadThroughCache {
    /// Cache configuration
    pub(crate) config: CacheConfig,

    /// Backing store
    pub(crate) store: Arc<dyn KeyValueStore>,
}

impl ReadThroughCache {
    /// Create a new cache over the given store
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        info!(
            "Initializing read-through cache on {} backend with config: {:?}",
            store.kind(),
            config
        );

        Self { config, store }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    /// Return the cached value for `key`, or run `fetcher` and cache its result
    ///
    /// - Hit: the stored JSON is decoded and returned; `fetcher` is not called.
    /// - Miss: `fetcher` runs exactly once and its value is stored with
    ///   `options.ttl` (zero or `None` stores without expiration).
    /// - Backend failure on read is treated as a miss; failure on write is
    ///   logged and the fetched value is still returned.
    /// - An error from `fetcher` propagates unchanged.
    ///
    /// There is no single-flight guarantee: concurrent callers that miss on
    /// the same key each run their own fetcher and each write the result,
    /// last write wins. Callers that need at-most-once fetching must add
    /// their own locking.
    pub async fn get_or_set<T, F, Fut, E>(
        &self,
        key: &str,
        fetcher: F,
        options: &CacheOptions,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cache_key = keys::namespaced(key, options.namespace.as_deref());

        match self.store.get(&cache_key).await {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("Cache hit for key: {}", cache_key);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry {}: {}", cache_key, e);
                }
            },
            Ok(_) => debug!("Cache miss for key: {}", cache_key),
            Err(e) => warn!("Cache read failed for key {}, fetching fresh: {}", cache_key, e),
        }

        let fresh = fetcher().await?;
        self.store_value(&cache_key, &fresh, options).await;
        Ok(fresh)
    }

    /// Read and decode a cached value; `None` on miss, backend error or bad payload
    pub async fn get<T: DeserializeOwned>(&self, key: &str, namespace: Option<&str>) -> Option<T> {
        let cache_key = keys::namespaced(key, namespace);

        match self.store.get(&cache_key).await {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Error decoding cache entry {}: {}", cache_key, e);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                warn!("Error getting from cache for key {}: {}", cache_key, e);
                None
            }
        }
    }

    /// Store a value; returns whether the write succeeded
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, options: &CacheOptions) -> bool {
        let cache_key = keys::namespaced(key, options.namespace.as_deref());
        self.store_value(&cache_key, value, options).await
    }

    /// Whether `key` is currently cached; `false` on backend error
    pub async fn exists(&self, key: &str, namespace: Option<&str>) -> bool {
        let cache_key = keys::namespaced(key, namespace);

        self.store.exists(&cache_key).await.unwrap_or_else(|e| {
            warn!("Error checking cache existence for key {}: {}", cache_key, e);
            false
        })
    }

    /// Remaining lifetime of `key`; `None` on miss or backend error
    pub async fn ttl(&self, key: &str, namespace: Option<&str>) -> Option<EntryTtl> {
        let cache_key = keys::namespaced(key, namespace);

        self.store.ttl(&cache_key).await.unwrap_or_else(|e| {
            warn!("Error getting TTL for key {}: {}", cache_key, e);
            None
        })
    }

    /// Serialize and write an already-namespaced key
    async fn store_value<T: Serialize>(
        &self,
        cache_key: &str,
        value: &T,
        options: &CacheOptions,
    ) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Error serializing value for key {}: {}", cache_key, e);
                return false;
            }
        };

        let expiry = options.expiry().map(|ttl| self.config.ttl_with_jitter(ttl));

        match self.store.set(cache_key, &raw, expiry).await {
            Ok(()) => {
                match expiry {
                    Some(ttl) => debug!(
                        "Cached data for key: {} with TTL: {}s",
                        cache_key,
                        ttl.as_secs()
                    ),
                    None => debug!("Cached data for key: {} without expiration", cache_key),
                }
                true
            }
            Err(e) => {
                warn!("Error setting cache for key {}: {}", cache_key, e);
                false
            }
        }
    }
}
