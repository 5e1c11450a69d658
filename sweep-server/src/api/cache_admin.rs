//! Cache administration endpoints
//!
//! `POST /api/cache` runs one invalidation action; `GET /api/cache?wallet=`
//! reports whether the default balance page for a wallet is cached.

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sweep_cache::{keys, EntryTtl};
use tracing::{error, info};

use super::error::{ApiError, INTERNAL_SERVER_ERROR};
use super::routes::{non_empty, AppState};

/// Actions accepted by `POST /api/cache`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    Invalidate,
    InvalidatePattern,
    InvalidateWallet,
    ClearNamespace,
}

impl CacheAction {
    pub const ALL: [CacheAction; 4] = [
        CacheAction::Invalidate,
        CacheAction::InvalidatePattern,
        CacheAction::InvalidateWallet,
        CacheAction::ClearNamespace,
    ];

    pub fn parse(action: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == action)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheAction::Invalidate => "invalidate",
            CacheAction::InvalidatePattern => "invalidatePattern",
            CacheAction::InvalidateWallet => "invalidateWallet",
            CacheAction::ClearNamespace => "clearNamespace",
        }
    }
}

/// Body of `POST /api/cache`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheActionRequest {
    pub action: Option<String>,
    pub key: Option<String>,
    pub pattern: Option<String>,
    pub namespace: Option<String>,
    pub wallet_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_count: Option<usize>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CacheStatusQuery {
    pub wallet: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub wallet: String,
    pub cache_key: String,
    pub exists: bool,
    pub ttl: Option<i64>,
    pub ttl_readable: Option<String>,
}

fn required(value: Option<String>, label: &str, action: CacheAction) -> Result<String, ApiError> {
    non_empty(value).ok_or_else(|| {
        ApiError::bad_request(format!("{} is required for {} action", label, action.as_str()))
    })
}

fn unsupported_action() -> ApiError {
    let supported: Vec<&str> = CacheAction::ALL.iter().map(CacheAction::as_str).collect();
    ApiError::bad_request(format!(
        "Invalid action. Supported actions: {}",
        supported.join(", ")
    ))
}

/// Run one invalidation action
///
/// The body is read as JSON whatever its `Content-Type`; only a body that
/// does not parse is an internal error.
pub async fn cache_action(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CacheActionResponse>, ApiError> {
    let request: CacheActionRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Cache API error: {}", e);
        ApiError::internal(INTERNAL_SERVER_ERROR)
    })?;

    let action = request
        .action
        .as_deref()
        .and_then(CacheAction::parse)
        .ok_or_else(unsupported_action)?;
    let namespace = non_empty(request.namespace.clone());
    let cache = &state.cache;

    let response = match action {
        CacheAction::Invalidate => {
            let key = required(request.key, "Key", action)?;
            let removed = cache.invalidate(&key, namespace.as_deref()).await;
            CacheActionResponse {
                success: removed,
                deleted_count: None,
                cleared_count: None,
                message: if removed {
                    format!("Cache key {} invalidated", key)
                } else {
                    "Failed to invalidate cache key".to_string()
                },
            }
        }
        CacheAction::InvalidatePattern => {
            let pattern = required(request.pattern, "Pattern", action)?;
            let deleted = cache
                .invalidate_by_pattern(&pattern, namespace.as_deref())
                .await;
            CacheActionResponse {
                success: deleted > 0,
                deleted_count: Some(deleted),
                cleared_count: None,
                message: format!(
                    "Invalidated {} cache entries matching pattern {}",
                    deleted, pattern
                ),
            }
        }
        CacheAction::InvalidateWallet => {
            let wallet = required(request.wallet_address, "Wallet address", action)?;
            let deleted = cache.invalidate_wallet(&wallet).await;
            CacheActionResponse {
                success: deleted > 0,
                deleted_count: Some(deleted),
                cleared_count: None,
                message: format!(
                    "Invalidated {} cache entries for wallet {}",
                    deleted, wallet
                ),
            }
        }
        CacheAction::ClearNamespace => {
            let namespace = required(namespace, "Namespace", action)?;
            let cleared = cache.clear_namespace(&namespace).await;
            CacheActionResponse {
                success: cleared > 0,
                deleted_count: None,
                cleared_count: Some(cleared),
                message: format!(
                    "Cleared {} cache entries in namespace {}",
                    cleared, namespace
                ),
            }
        }
    };

    info!("Cache action {}: {}", action.as_str(), response.message);
    Ok(Json(response))
}

/// Cache status of a wallet's default balance page
pub async fn cache_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CacheStatusQuery>,
) -> Result<Json<CacheStatusResponse>, ApiError> {
    let wallet = non_empty(query.wallet)
        .ok_or_else(|| ApiError::bad_request("Wallet address is required"))?;

    let cache_key = keys::tokens_key(&wallet, None);
    let exists = state.cache.exists(&cache_key, None).await;
    let ttl = if exists {
        state.cache.ttl(&cache_key, None).await
    } else {
        None
    };

    Ok(Json(CacheStatusResponse {
        wallet,
        cache_key,
        exists,
        ttl: ttl.map(|t| t.as_secs_i64()),
        ttl_readable: ttl.and_then(readable_ttl),
    }))
}

/// `"<m>m <s>s"` for a positive remaining lifetime
fn readable_ttl(ttl: EntryTtl) -> Option<String> {
    match ttl {
        EntryTtl::Expiring(secs) if secs > 0 => Some(ttl.to_string()),
        _ => None,
    }
}
