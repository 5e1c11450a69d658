//! Cache invalidation
//!
//! Single-key, batched and pattern-based eviction on top of
//! [`ReadThroughCache`]. Pattern invalidation walks the key space with a cursor
//! scan and pipelines one delete per page; it never issues an unbounded `KEYS`.
//!
//! Like the read path, every operation here is fail-soft and reports `false` or
//! `0` when the backend errors.

use crate::cache::{keys, store::ReadThroughCache};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Reason for cache invalidation, recorded in logs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Single key removed by request
    Manual,

    /// Explicit list of keys
    Batch,

    /// Glob pattern sweep
    Pattern { pattern: String },

    /// Every key under a namespace
    Namespace { namespace: String },

    /// Every cached variant for a wallet, typically after a sell
    Wallet { wallet: String },
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::Manual => write!(f, "manual invalidation"),
            InvalidationReason::Batch => write!(f, "batch invalidation"),
            InvalidationReason::Pattern { pattern } => write!(f, "pattern match: {}", pattern),
            InvalidationReason::Namespace { namespace } => {
                write!(f, "namespace clear: {}", namespace)
            }
            InvalidationReason::Wallet { wallet } => write!(f, "wallet refresh: {}", wallet),
        }
    }
}

/// Outcome of a pattern sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys that existed and were removed
    pub deleted: usize,

    /// `SCAN` round-trips performed
    pub iterations: usize,

    /// Whether the sweep stopped at the iteration cap before the cursor wrapped
    pub truncated: bool,
}

impl ReadThroughCache {
    /// Delete one key; returns whether a key was actually removed
    pub async fn invalidate(&self, key: &str, namespace: Option<&str>) -> bool {
        let cache_key = keys::namespaced(key, namespace);

        match self.store.delete(&cache_key).await {
            Ok(removed) => {
                debug!(
                    "Invalidated cache for key: {} ({}, removed: {})",
                    cache_key,
                    InvalidationReason::Manual,
                    removed
                );
                removed
            }
            Err(e) => {
                warn!("Error invalidating cache for key {}: {}", cache_key, e);
                false
            }
        }
    }

    /// Delete a batch of keys in one pipeline; returns how many existed
    pub async fn invalidate_many<S: AsRef<str>>(
        &self,
        batch: &[S],
        namespace: Option<&str>,
    ) -> usize {
        if batch.is_empty() {
            return 0;
        }

        let cache_keys: Vec<String> = batch
            .iter()
            .map(|key| keys::namespaced(key.as_ref(), namespace))
            .collect();

        match self.store.delete_many(&cache_keys).await {
            Ok(flags) => {
                let deleted = flags.into_iter().filter(|removed| *removed).count();
                info!("Invalidated {} cache entries ({})", deleted, InvalidationReason::Batch);
                deleted
            }
            Err(e) => {
                warn!("Error invalidating multiple cache entries: {}", e);
                0
            }
        }
    }

    /// Delete every key matching a glob `pattern`, optionally under a namespace
    ///
    /// Returns the number of keys removed, `0` on backend error.
    pub async fn invalidate_by_pattern(&self, pattern: &str, namespace: Option<&str>) -> usize {
        let search_pattern = keys::namespaced(pattern, namespace);
        let reason = InvalidationReason::Pattern {
            pattern: search_pattern.clone(),
        };
        self.sweep_logged(&search_pattern, reason).await
    }

    /// Delete every key under `namespace`
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        let reason = InvalidationReason::Namespace {
            namespace: namespace.to_string(),
        };
        self.sweep_logged(&keys::namespace_pattern(namespace), reason)
            .await
    }

    /// Evict every cached balance page and variant for a wallet
    ///
    /// Sweeps `tokens:<wallet>:*` and also drops the bare `tokens:<wallet>`
    /// entry that holds the default page, so the next balance read misses.
    pub async fn invalidate_wallet(&self, wallet: &str) -> usize {
        let reason = InvalidationReason::Wallet {
            wallet: wallet.to_lowercase(),
        };
        let variants = self.sweep_logged(&keys::wallet_pattern(wallet), reason).await;
        let bare = usize::from(self.invalidate(&keys::tokens_key(wallet, None), None).await);

        variants + bare
    }

    async fn sweep_logged(&self, pattern: &str, reason: InvalidationReason) -> usize {
        match self.sweep(pattern).await {
            Ok(report) => {
                if report.truncated {
                    warn!(
                        "Pattern sweep for {} stopped after {} scan iterations, keys may remain",
                        pattern, report.iterations
                    );
                }
                info!(
                    "Invalidated {} cache entries matching pattern: {} ({})",
                    report.deleted, pattern, reason
                );
                report.deleted
            }
            Err(e) => {
                warn!("Error invalidating cache by pattern {}: {}", pattern, e);
                0
            }
        }
    }

    /// Cursor-driven scan plus pipelined delete, one batch per page
    ///
    /// Terminates when the cursor returns to `0` or after
    /// `max_scan_iterations` round-trips, whichever comes first.
    pub async fn sweep(&self, pattern: &str) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let mut cursor = 0u64;

        loop {
            if report.iterations >= self.config.max_scan_iterations {
                report.truncated = true;
                break;
            }

            let page = self
                .store
                .scan(cursor, pattern, self.config.scan_count)
                .await?;
            report.iterations += 1;

            if !page.keys.is_empty() {
                let flags = self.store.delete_many(&page.keys).await?;
                report.deleted += flags.into_iter().filter(|removed| *removed).count();
            }

            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }

        Ok(report)
    }
}
