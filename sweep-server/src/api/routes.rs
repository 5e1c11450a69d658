//! Cached read routes for the Wallet Sweep API

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use sweep_cache::{keys, BackendKind, CacheOptions, CacheParams, ReadThroughCache};
use tracing::{error, info};

use super::error::ApiError;
use crate::upstream::{
    fetch_all_tokens, process_tokens, BalanceSource, ImageSource, PriceSource, ProcessedToken,
    UpstreamError, BASE_CHAIN_ID, FETCH_ALL_PAGE_DELAY, UNKNOWN_TOKEN_IMAGE,
};

const DEFAULT_PAGE: u32 = 0;
const DEFAULT_LIMIT: u32 = 50;

/// Application state
pub struct AppState {
    pub cache: ReadThroughCache,
    pub balances: Arc<dyn BalanceSource>,
    pub prices: Arc<dyn PriceSource>,
    pub images: Arc<dyn ImageSource>,
    /// Lower-cased token address -> image URL, checked before the cache
    pub image_overrides: HashMap<String, String>,
    /// Pause between upstream pages when `fetchAll` is requested
    pub page_delay: Duration,
}

impl AppState {
    pub fn new(
        cache: ReadThroughCache,
        balances: Arc<dyn BalanceSource>,
        prices: Arc<dyn PriceSource>,
        images: Arc<dyn ImageSource>,
    ) -> Self {
        Self {
            cache,
            balances,
            prices,
            images,
            image_overrides: HashMap::new(),
            page_delay: FETCH_ALL_PAGE_DELAY,
        }
    }

    pub fn with_image_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.image_overrides = overrides
            .into_iter()
            .map(|(address, url)| (address.to_lowercase(), url))
            .collect();
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// Health check response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache_backend: BackendKind,
}

/// Wallet balances query parameters
#[derive(Debug, Default, Deserialize)]
pub struct TokensQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(rename = "fetchAll")]
    pub fetch_all: Option<String>,
}

impl TokensQuery {
    fn is_empty(&self) -> bool {
        self.page.is_none() && self.limit.is_none() && self.fetch_all.is_none()
    }

    fn fetch_all(&self) -> bool {
        self.fetch_all.as_deref() == Some("true")
    }
}

/// Wallet balances response, cached as a whole
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalancesResponse {
    pub success: bool,
    pub address: String,
    pub chain_id: u64,
    pub tokens: Vec<ProcessedToken>,
    pub total_usd_value: f64,
    pub timestamp: String,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    pub token_address: String,
    pub price_usd: f64,
}

#[derive(Serialize)]
pub struct PriceResponse {
    pub success: bool,
    pub data: TokenPrice,
}

#[derive(Debug, Deserialize)]
pub struct TokenImageQuery {
    pub chain: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenImage {
    pub image: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_backend: state.cache.backend(),
    })
}

/// Wallet token balances, read through the cache for `balances_ttl`
pub async fn wallet_tokens(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<TokensQuery>,
) -> Result<Json<TokenBalancesResponse>, ApiError> {
    if !is_valid_address(&address) {
        return Err(ApiError::bad_request("Invalid wallet address format"));
    }

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let fetch_all = query.fetch_all();

    let cache_key = if query.is_empty() {
        keys::tokens_key(&address, None)
    } else {
        let params = CacheParams::new()
            .with("page", page)
            .with("limit", limit)
            .with("fetchAll", fetch_all);
        keys::tokens_key(&address, Some(&params))
    };
    let options = CacheOptions::ttl(state.cache.config().balances_ttl.as_secs());

    let balances = state
        .cache
        .get_or_set(
            &cache_key,
            || fetch_balances(&state, &address, page, limit, fetch_all),
            &options,
        )
        .await
        .map_err(|e| {
            error!("Balance fetch for {} failed: {}", address, e);
            ApiError::internal(e.to_string())
        })?;

    Ok(Json(balances))
}

async fn fetch_balances(
    state: &AppState,
    address: &str,
    page: u32,
    limit: u32,
    fetch_all: bool,
) -> Result<TokenBalancesResponse, UpstreamError> {
    info!("Fetching fresh token data for {}", address);

    let (raw, has_more) = if fetch_all {
        let raw = fetch_all_tokens(state.balances.as_ref(), address, state.page_delay).await?;
        (raw, false)
    } else {
        let batch = state.balances.wallet_tokens(address, page, limit).await?;
        (batch.tokens, batch.has_more)
    };

    let tokens = process_tokens(&raw);
    info!("Processed {} tokens for {}", tokens.len(), address);

    Ok(TokenBalancesResponse {
        success: true,
        address: address.to_string(),
        chain_id: BASE_CHAIN_ID,
        total_usd_value: tokens.iter().map(|t| t.value).sum(),
        tokens,
        timestamp: Utc::now().to_rfc3339(),
        has_more,
        next_page: if has_more { page.checked_add(1) } else { None },
    })
}

/// Token price, read through the cache for `price_ttl`
pub async fn token_price(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let options = CacheOptions::ttl(state.cache.config().price_ttl.as_secs());

    let data = state
        .cache
        .get_or_set(
            &keys::price_key(&token),
            || async {
                let price_usd = state.prices.token_price(&token).await?;
                Ok::<_, UpstreamError>(TokenPrice {
                    token_address: token.clone(),
                    price_usd,
                })
            },
            &options,
        )
        .await
        .map_err(|e| {
            error!("Price fetch for {} failed: {}", token, e);
            ApiError::internal("Failed to fetch token price")
        })?;

    Ok(Json(PriceResponse {
        success: true,
        data,
    }))
}

/// Token image: overrides first, then the cache, then the image source
///
/// Always answers with an image; upstream failures fall back to the
/// unknown-token image.
pub async fn token_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenImageQuery>,
) -> Result<Json<TokenImage>, ApiError> {
    let (chain, address) = match (non_empty(query.chain), non_empty(query.address)) {
        (Some(chain), Some(address)) => (chain, address),
        _ => return Err(ApiError::bad_request("Missing chain or address parameter")),
    };
    let normalized = address.to_lowercase();

    if let Some(image) = state.image_overrides.get(&normalized) {
        return Ok(Json(TokenImage {
            image: image.clone(),
        }));
    }

    let cache_key = keys::token_image_key(&chain, &normalized);
    if let Some(cached) = state.cache.get::<TokenImage>(&cache_key, None).await {
        return Ok(Json(cached));
    }

    let image = match state.images.token_image(&chain, &address).await {
        Ok(found) => TokenImage {
            image: found.unwrap_or_else(|| UNKNOWN_TOKEN_IMAGE.to_string()),
        },
        Err(e) => {
            error!("Error fetching token image for {}: {}", address, e);
            return Ok(Json(TokenImage {
                image: UNKNOWN_TOKEN_IMAGE.to_string(),
            }));
        }
    };

    let options = CacheOptions::ttl(state.cache.config().image_ttl.as_secs());
    state.cache.set(&cache_key, &image, &options).await;

    Ok(Json(image))
}

/// `0x` followed by exactly 40 hex digits
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
