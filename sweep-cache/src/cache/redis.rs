//! Redis [`KeyValueStore`] backend
//!
//! Holds one long-lived [`ConnectionManager`], created lazily on first use and
//! shared by every request. The manager reconnects on its own after a dropped
//! connection; each operation clones the handle, which is cheap.
//!
//! A failed connect starts a cooldown (`RedisConfig::reconnect_cooldown`).
//! Until it elapses every operation returns [`CacheError::Connection`] at once,
//! so an outage costs one connect timeout rather than one per call.

use crate::cache::backend::{KeyValueStore, ScanPage};
use crate::cache::config::RedisConfig;
use crate::cache::types::{BackendKind, CacheValue, EntryTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Redis-backed key-value store
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
    conn: OnceCell<ConnectionManager>,
    last_failure: Mutex<Option<Instant>>,
}

impl RedisStore {
    /// Create a store for the configured URL
    ///
    /// Only the URL is validated here; the connection is opened on first use,
    /// so a server that is down at startup degrades reads instead of failing boot.
    pub fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Config(format!("invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            config,
            conn: OnceCell::new(),
            last_failure: Mutex::new(None),
        })
    }

    /// Create a store from `REDIS_URL` and friends
    pub fn from_env() -> Result<Self> {
        Self::new(RedisConfig::from_env()?)
    }

    /// Shared connection, initialized once
    async fn connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }
        self.ensure_cooled_down()?;

        let conn = self
            .conn
            .get_or_try_init(|| async {
                // Callers queued behind a failed attempt see its cooldown here
                self.ensure_cooled_down()?;

                let result = self.connect().await;
                if let Err(e) = &result {
                    warn!("Redis connect failed: {}", e);
                    self.record_failure();
                }
                result
            })
            .await?;

        Ok(conn.clone())
    }

    async fn connect(&self) -> Result<ConnectionManager> {
        let timeout = self.config.connection_timeout;
        info!("Connecting to Redis (timeout: {:?})", timeout);

        let manager = tokio::time::timeout(timeout, ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|_| CacheError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
                context: "Redis connect".to_string(),
            })?
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        info!("Successfully connected to Redis");
        Ok(manager)
    }

    fn ensure_cooled_down(&self) -> Result<()> {
        let last_failure = self.last_failure.lock().ok().and_then(|at| *at);
        match last_failure {
            Some(at) if at.elapsed() < self.config.reconnect_cooldown => {
                let remaining = self.config.reconnect_cooldown.saturating_sub(at.elapsed());
                Err(CacheError::Connection(format!(
                    "Redis unavailable, next connect attempt in {}ms",
                    remaining.as_millis()
                )))
            }
            _ => Ok(()),
        }
    }

    fn record_failure(&self) {
        if let Ok(mut last_failure) = self.last_failure.lock() {
            *last_failure = Some(Instant::now());
        }
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;

        match ttl {
            Some(ttl) if ttl.as_secs() > 0 => {
                let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
            }
            _ => {
                let _: () = conn.set(key, value).await?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<Vec<bool>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.del(key);
        }

        let replies: Vec<i64> = pipe.query_async(&mut conn).await?;
        debug!("Pipelined DEL of {} keys", keys.len());
        Ok(replies.into_iter().map(|n| n > 0).collect())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists: i64 = conn.exists(key).await?;
        Ok(exists > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<EntryTtl>> {
        let mut conn = self.connection().await?;
        let reply: i64 = conn.ttl(key).await?;
        Ok(EntryTtl::from_redis_reply(reply))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let mut conn = self.connection().await?;

        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        Ok(ScanPage { cursor, keys })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.conn.initialized())
            .field("connection_timeout", &self.config.connection_timeout)
            .field("reconnect_cooldown", &self.config.reconnect_cooldown)
            .finish()
    }
}
