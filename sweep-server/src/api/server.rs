//! API server for the Wallet Sweep cache service

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use sweep_cache::{
    BackendKind, CacheConfig, KeyValueStore, MemoryStore, ReadThroughCache, RedisConfig,
    RedisStore,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::cache_admin::{cache_action, cache_status};
use super::routes::{health_check, token_image, token_price, wallet_tokens, AppState};
use crate::upstream::{CoinGeckoClient, ThirdwebClient};

/// Configuration for the API server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
    pub cache_backend: BackendKind,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    /// Thirdweb client id for wallet balances
    pub thirdweb_client_id: Option<String>,
    /// Lower-cased token address -> image URL
    pub image_overrides: HashMap<String, String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cache_backend: BackendKind::Redis,
            redis: RedisConfig::default(),
            cache: CacheConfig::default(),
            thirdweb_client_id: std::env::var("THIRDWEB_CLIENT_ID").ok(),
            image_overrides: HashMap::new(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig) -> Self {
        Self { config }
    }

    /// Create a new API server with default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: ApiServerConfig::default(),
        }
    }

    /// Build the shared state: one store, one cache, HTTP upstream clients
    pub fn build_state(&self) -> Result<Arc<AppState>> {
        self.config
            .cache
            .validate()
            .context("invalid cache configuration")?;

        let store: Arc<dyn KeyValueStore> = match self.config.cache_backend {
            BackendKind::Redis => Arc::new(
                RedisStore::new(self.config.redis.clone()).context("failed to create Redis store")?,
            ),
            BackendKind::Memory => {
                warn!("Using in-memory cache backend; entries are not shared between processes");
                Arc::new(MemoryStore::new())
            }
        };

        if self.config.thirdweb_client_id.is_none() {
            warn!("THIRDWEB_CLIENT_ID is not set; balance requests will fail");
        }

        let cache = ReadThroughCache::new(store, self.config.cache.clone());
        let coingecko = Arc::new(CoinGeckoClient::new());
        let state = AppState::new(
            cache,
            Arc::new(ThirdwebClient::new(self.config.thirdweb_client_id.clone())),
            coingecko.clone(),
            coingecko,
        )
        .with_image_overrides(self.config.image_overrides.clone());

        Ok(Arc::new(state))
    }

    /// Build the router over an existing state
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/cache", post(cache_action).get(cache_status))
            .route("/api/tokens/:address", get(wallet_tokens))
            .route("/api/prices/:token", get(token_price))
            .route("/api/token-images", get(token_image))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
    }

    /// Serve on an already-bound listener
    pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
        axum::serve(listener, Self::router(state)).await?;
        Ok(())
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        let state = self.build_state()?;

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!(
            "Starting API server on {} ({} cache backend)",
            addr, self.config.cache_backend
        );

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        Self::serve(listener, state).await
    }
}
