//! # Read-Through Cache Layer
//!
//! Caches wallet token balances, token prices and token images in a shared
//! key-value store, with bulk invalidation by glob pattern.
//!
//! ## Features
//!
//! - **Read-through**: `get_or_set` returns a cached value or runs a fetcher and stores its result
//! - **TTL policy**: per-call TTL in seconds, where zero means "persist until invalidated"
//! - **Fail-soft**: backend outages degrade to fetching fresh data, never to request failures
//! - **Pattern invalidation**: cursor-driven `SCAN` with a pipelined delete per page
//! - **Collision-free keys**: sorted, percent-encoded parameters folded into the key
//!
//! ## Architecture
//!
//! - [`KeyValueStore`]: narrow async adapter ([`RedisStore`], [`MemoryStore`])
//! - [`keys`]: pure key and pattern composition
//! - [`ReadThroughCache`]: read path plus the invalidation operations
//!
//! ## Example
//!
//! ```rust
//! use sweep_cache::cache::{keys, CacheConfig, CacheOptions, MemoryStore, ReadThroughCache};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache = ReadThroughCache::new(Arc::new(MemoryStore::new()), CacheConfig::default());
//!
//! let key = keys::tokens_key("0xABC", None);
//! let balances: Vec<String> = cache
//!     .get_or_set(
//!         &key,
//!         || async { Ok::<_, anyhow::Error>(vec!["USDC".to_string()]) },
//!         &CacheOptions::ttl(300),
//!     )
//!     .await?;
//! assert_eq!(balances, vec!["USDC".to_string()]);
//!
//! // After a sell, drop every cached page for the wallet
//! let removed = cache.invalidate_wallet("0xABC").await;
//! assert_eq!(removed, 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod entry;
pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;
pub mod types;

pub use backend::{KeyValueStore, ScanPage};
pub use config::{CacheConfig, CacheConfigBuilder, RedisConfig};
pub use entry::CacheEntry;
pub use invalidation::{InvalidationReason, SweepReport};
pub use keys::{CacheParams, KeyBuilder, KeySpace};
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::ReadThroughCache;
pub use types::{BackendKind, CacheKey, CacheOptions, CacheValue, EntryTtl};
