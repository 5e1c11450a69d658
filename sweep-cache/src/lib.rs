//! # Sweep Cache (sweep-cache)
//!
//! Shared read-through cache for the Wallet Sweep API: wallet token balances,
//! token prices and token images, stored in Redis with glob-pattern
//! invalidation.
//!
//! ## Features
//!
//! - Async-first design using tokio
//! - One lazily-created, auto-reconnecting Redis connection per process
//! - Fail-soft reads and writes: a Redis outage never fails a request
//! - Cursor-driven pattern invalidation with pipelined deletes
//! - In-memory backend with the same contract for tests and local runs
//!
//! ## Read-Through
//!
//! ```no_run
//! use sweep_cache::{CacheConfig, CacheOptions, ReadThroughCache, RedisConfig, RedisStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::new(RedisConfig::new("redis://127.0.0.1:6379"))?;
//!     let cache = ReadThroughCache::new(Arc::new(store), CacheConfig::from_env()?);
//!
//!     let price: f64 = cache
//!         .get_or_set(
//!             &sweep_cache::keys::price_key("0x4200000000000000000000000000000000000006"),
//!             || async { Ok::<_, anyhow::Error>(3120.55) },
//!             &CacheOptions::ttl(600),
//!         )
//!         .await?;
//!     println!("price: {}", price);
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidation
//!
//! ```no_run
//! use sweep_cache::{CacheConfig, MemoryStore, ReadThroughCache};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = ReadThroughCache::new(Arc::new(MemoryStore::new()), CacheConfig::default());
//!
//!     // Every balance page cached for the wallet
//!     let removed = cache.invalidate_wallet("0xAbC0000000000000000000000000000000000001").await;
//!
//!     // Every cached token image
//!     let images = cache.clear_namespace("token_image").await;
//!     println!("removed {} balance entries and {} images", removed, images);
//! }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    keys, BackendKind, CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheOptions,
    CacheParams, CacheValue, EntryTtl, InvalidationReason, KeyBuilder, KeySpace, KeyValueStore,
    MemoryStore, ReadThroughCache, RedisConfig, RedisStore, ScanPage, SweepReport,
};
pub use error::{CacheError, Result};
