//! Integration tests for the API server over an in-memory cache

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use sweep_cache::{
    keys, CacheConfig, CacheOptions, EntryTtl, KeyValueStore, MemoryStore, ReadThroughCache,
};
use sweep_server::api::server::ApiServer;
use sweep_server::upstream::{PriceData, UNKNOWN_TOKEN_IMAGE};
use sweep_server::{
    AppState, BalanceSource, ImageSource, PriceSource, RawToken, UpstreamError, WalletPage,
};

const WALLET: &str = "0xAbCdEf0000000000000000000000000000001234";
const OTHER_WALLET: &str = "0x9999000000000000000000000000000000005678";

#[derive(Default)]
struct FakeBalances {
    calls: AtomicUsize,
    fail: AtomicBool,
}

fn raw_token(symbol: &str, balance: &str, decimals: u32, price: f64) -> RawToken {
    RawToken {
        token_address: format!("0x{}", symbol.to_lowercase()),
        symbol: Some(symbol.to_string()),
        name: Some(format!("{} Token", symbol)),
        balance: balance.to_string(),
        decimals: Some(decimals),
        logo: None,
        price_data: Some(PriceData {
            price_usd: Some(price),
        }),
    }
}

#[async_trait]
impl BalanceSource for FakeBalances {
    async fn wallet_tokens(
        &self,
        _wallet: &str,
        _page: u32,
        limit: u32,
    ) -> Result<WalletPage, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(UpstreamError::RateLimited);
        }

        Ok(WalletPage {
            tokens: vec![
                raw_token("USDC", "1500000", 6, 1.0),
                raw_token("WETH", "500000000000000000", 18, 3000.0),
                raw_token("DUST", "50", 6, 1.0),
            ],
            has_more: limit < 50,
        })
    }
}

#[derive(Default)]
struct FakePrices {
    calls: AtomicUsize,
}

#[async_trait]
impl PriceSource for FakePrices {
    async fn token_price(&self, _token: &str) -> Result<f64, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(3120.5)
    }
}

#[derive(Default)]
struct FakeImages {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageSource for FakeImages {
    async fn token_image(
        &self,
        _chain: &str,
        address: &str,
    ) -> Result<Option<String>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match address {
            "0xnone" => Ok(None),
            "0xerr" => Err(UpstreamError::Status {
                service: "CoinGecko",
                status: 502,
            }),
            other => Ok(Some(format!("https://img/{}.png", other))),
        }
    }
}

struct TestServer {
    base: String,
    client: Client,
    store: Arc<MemoryStore>,
    balances: Arc<FakeBalances>,
    prices: Arc<FakePrices>,
    images: Arc<FakeImages>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post_cache(&self, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url("/api/cache"))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    fn cache(&self) -> ReadThroughCache {
        ReadThroughCache::new(self.store.clone(), CacheConfig::default())
    }
}

/// Test helper to start the API server in the background on an ephemeral port
async fn start_test_server() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let balances = Arc::new(FakeBalances::default());
    let prices = Arc::new(FakePrices::default());
    let images = Arc::new(FakeImages::default());

    let mut overrides = HashMap::new();
    overrides.insert(
        "0xOVERRIDE".to_string(),
        "https://img/override.png".to_string(),
    );

    let state = AppState::new(
        ReadThroughCache::new(store.clone(), CacheConfig::default()),
        balances.clone(),
        prices.clone(),
        images.clone(),
    )
    .with_image_overrides(overrides)
    .with_page_delay(Duration::ZERO);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(ApiServer::serve(listener, Arc::new(state)));

    TestServer {
        base: format!("http://{}", addr),
        client: Client::new(),
        store,
        balances,
        prices,
        images,
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = start_test_server().await;

    let (status, body) = server.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cacheBackend"], "memory");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_cold_cache_then_hit() {
    let server = start_test_server().await;
    let path = format!("/api/tokens/{}", WALLET);

    let (status, first) = server.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = server.get(&path).await;

    assert_eq!(server.balances.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    assert_eq!(first["success"], true);
    assert_eq!(first["chainId"], 8453);
    assert_eq!(first["tokens"].as_array().unwrap().len(), 2);
    assert_eq!(first["tokens"][0]["symbol"], "WETH");
    assert_eq!(first["totalUsdValue"], 1501.5);

    let key = format!("tokens:{}", WALLET.to_lowercase());
    match server.store.ttl(&key).await.unwrap() {
        Some(EntryTtl::Expiring(secs)) => assert!(secs > 290 && secs <= 300),
        other => panic!("expected 300s TTL, got {:?}", other),
    }
}

#[tokio::test]
async fn test_paginated_variants_use_distinct_keys() {
    let server = start_test_server().await;

    let (status, body) = server
        .get(&format!("/api/tokens/{}?page=1&limit=10", WALLET))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["nextPage"], 2);

    server
        .get(&format!("/api/tokens/{}?fetchAll=true", WALLET))
        .await;

    let stored = server.store.keys().await;
    let wallet = WALLET.to_lowercase();
    assert!(stored.contains(&format!("tokens:{}:fetchAll=false&limit=10&page=1", wallet)));
    assert!(stored.contains(&format!("tokens:{}:fetchAll=true&limit=50&page=0", wallet)));
    assert_eq!(server.balances.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_last_representable_page_has_no_next_page() {
    let server = start_test_server().await;

    let (status, body) = server
        .get(&format!("/api/tokens/{}?page=4294967295&limit=10", WALLET))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasMore"], true);
    assert!(body.get("nextPage").is_none());
}

#[tokio::test]
async fn test_invalid_wallet_address() {
    let server = start_test_server().await;

    let (status, body) = server.get("/api/tokens/0x1234").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid wallet address format");
    assert_eq!(server.balances.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_failure_is_not_cached() {
    let server = start_test_server().await;
    server.balances.fail.store(true, Ordering::SeqCst);

    let (status, body) = server.get(&format!("/api/tokens/{}", WALLET)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Rate limit exceeded. Please try again later.");
    assert!(server.store.is_empty().await);
}

#[tokio::test]
async fn test_post_sell_wallet_invalidation() {
    let server = start_test_server().await;
    server.get(&format!("/api/tokens/{}", WALLET)).await;
    server
        .get(&format!("/api/tokens/{}?page=0&limit=50", WALLET))
        .await;
    server.get(&format!("/api/tokens/{}", OTHER_WALLET)).await;
    assert_eq!(server.balances.calls.load(Ordering::SeqCst), 3);

    let (status, body) = server
        .post_cache(json!({ "action": "invalidateWallet", "walletAddress": WALLET }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 2);

    // Next read for the wallet is a forced miss; the other wallet stays cached
    server.get(&format!("/api/tokens/{}", WALLET)).await;
    server.get(&format!("/api/tokens/{}", OTHER_WALLET)).await;
    assert_eq!(server.balances.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_admin_missing_fields() {
    let server = start_test_server().await;

    let cases = [
        (json!({ "action": "invalidate" }), "Key is required for invalidate action"),
        (
            json!({ "action": "invalidatePattern", "pattern": "" }),
            "Pattern is required for invalidatePattern action",
        ),
        (
            json!({ "action": "invalidateWallet" }),
            "Wallet address is required for invalidateWallet action",
        ),
        (
            json!({ "action": "clearNamespace" }),
            "Namespace is required for clearNamespace action",
        ),
    ];

    for (request, message) in cases {
        let (status, body) = server.post_cache(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn test_admin_unknown_action() {
    let server = start_test_server().await;

    let (status, body) = server.post_cache(json!({ "action": "flushAll" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("invalidate, invalidatePattern, invalidateWallet, clearNamespace"));
}

#[tokio::test]
async fn test_admin_malformed_body() {
    let server = start_test_server().await;

    let response = server
        .client
        .post(server.url("/api/cache"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Internal server error" }));
}

#[tokio::test]
async fn test_admin_accepts_json_without_content_type() {
    let server = start_test_server().await;
    server.get(&format!("/api/tokens/{}", WALLET)).await;

    let response = server
        .client
        .post(server.url("/api/cache"))
        .body(json!({ "action": "invalidateWallet", "walletAddress": WALLET }).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 1);
    assert!(server.store.is_empty().await);
}

#[tokio::test]
async fn test_admin_invalidate_and_pattern() {
    let server = start_test_server().await;
    let cache = server.cache();
    cache.set("k1", &1, &CacheOptions::ttl(60).with_namespace("ns")).await;
    cache.set("api:tokens:page=1", &1, &CacheOptions::ttl(60)).await;
    cache.set("api:tokens:page=2", &2, &CacheOptions::ttl(60)).await;

    let (_, body) = server
        .post_cache(json!({ "action": "invalidate", "key": "k1", "namespace": "ns" }))
        .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Cache key k1 invalidated");

    let (_, body) = server
        .post_cache(json!({ "action": "invalidate", "key": "k1", "namespace": "ns" }))
        .await;
    assert_eq!(body["success"], false);

    let (status, body) = server
        .post_cache(json!({ "action": "invalidatePattern", "pattern": "api:tokens:*" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deletedCount"], 2);
    assert_eq!(body["success"], true);

    let (_, body) = server
        .post_cache(json!({ "action": "invalidatePattern", "pattern": "api:tokens:*" }))
        .await;
    assert_eq!(body["deletedCount"], 0);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_admin_clear_namespace() {
    let server = start_test_server().await;
    server
        .get("/api/token-images?chain=base&address=0xaaa")
        .await;
    server
        .get("/api/token-images?chain=base&address=0xbbb")
        .await;
    server.get(&format!("/api/tokens/{}", WALLET)).await;
    server.get("/api/prices/0xaaa").await;

    let (status, body) = server
        .post_cache(json!({ "action": "clearNamespace", "namespace": "token_image" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clearedCount"], 2);
    assert_eq!(server.store.len().await, 2);
}

#[tokio::test]
async fn test_cache_status() {
    let server = start_test_server().await;

    let (status, body) = server.get("/api/cache").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Wallet address is required");

    let (status, body) = server.get(&format!("/api/cache?wallet={}", WALLET)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], false);
    assert!(body["ttl"].is_null());
    assert!(body["ttlReadable"].is_null());

    server.get(&format!("/api/tokens/{}", WALLET)).await;

    let (_, body) = server.get(&format!("/api/cache?wallet={}", WALLET)).await;
    assert_eq!(body["wallet"], WALLET);
    assert_eq!(body["cacheKey"], format!("tokens:{}", WALLET.to_lowercase()));
    assert_eq!(body["exists"], true);
    let ttl = body["ttl"].as_i64().unwrap();
    assert!(ttl > 290 && ttl <= 300);
    let readable = body["ttlReadable"].as_str().unwrap();
    assert!(readable.starts_with("4m ") || readable == "5m 0s", "{}", readable);
}

#[tokio::test]
async fn test_cache_status_persistent_entry() {
    let server = start_test_server().await;
    server
        .cache()
        .set(&keys::tokens_key(WALLET, None), &"pinned", &CacheOptions::persistent())
        .await;

    let (_, body) = server.get(&format!("/api/cache?wallet={}", WALLET)).await;

    assert_eq!(body["exists"], true);
    assert_eq!(body["ttl"], -1);
    assert!(body["ttlReadable"].is_null());
}

#[tokio::test]
async fn test_token_price_cached() {
    let server = start_test_server().await;
    let token = "0x4200000000000000000000000000000000000006";

    let (status, body) = server.get(&format!("/api/prices/{}", token)).await;
    server.get(&format!("/api/prices/{}", token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["tokenAddress"], token);
    assert_eq!(body["data"]["priceUsd"], 3120.5);
    assert_eq!(server.prices.calls.load(Ordering::SeqCst), 1);

    match server.store.ttl(&keys::price_key(token)).await.unwrap() {
        Some(EntryTtl::Expiring(secs)) => assert!(secs > 590 && secs <= 600),
        other => panic!("expected 600s TTL, got {:?}", other),
    }
}

#[tokio::test]
async fn test_token_image_stored_without_expiry() {
    let server = start_test_server().await;

    let (status, body) = server
        .get("/api/token-images?chain=base&address=0xABC")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image"], "https://img/0xABC.png");

    let (_, again) = server
        .get("/api/token-images?chain=base&address=0xabc")
        .await;
    assert_eq!(again, body);
    assert_eq!(server.images.calls.load(Ordering::SeqCst), 1);

    let key = keys::token_image_key("base", "0xabc");
    assert_eq!(server.store.ttl(&key).await.unwrap(), Some(EntryTtl::Persistent));
}

#[tokio::test]
async fn test_token_image_fallbacks() {
    let server = start_test_server().await;

    let (_, body) = server
        .get("/api/token-images?chain=base&address=0xOverride")
        .await;
    assert_eq!(body["image"], "https://img/override.png");
    assert_eq!(server.images.calls.load(Ordering::SeqCst), 0);

    // Unknown tokens are cached with the placeholder
    let (_, body) = server
        .get("/api/token-images?chain=base&address=0xnone")
        .await;
    assert_eq!(body["image"], UNKNOWN_TOKEN_IMAGE);
    assert!(server
        .store
        .exists(&keys::token_image_key("base", "0xnone"))
        .await
        .unwrap());

    // Upstream errors answer with the placeholder but are not cached
    let (status, body) = server
        .get("/api/token-images?chain=base&address=0xerr")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image"], UNKNOWN_TOKEN_IMAGE);
    assert!(!server
        .store
        .exists(&keys::token_image_key("base", "0xerr"))
        .await
        .unwrap());

    let (status, _) = server.get("/api/token-images?chain=base").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_concurrent_cold_requests() {
    let server = start_test_server().await;
    let path = format!("/api/tokens/{}", WALLET);

    let responses = join_all((0..5).map(|_| server.get(&path))).await;

    assert!(responses.iter().all(|(status, _)| *status == StatusCode::OK));
    // Concurrent misses are not deduplicated
    let calls = server.balances.calls.load(Ordering::SeqCst);
    assert!((1..=5).contains(&calls));
    assert_eq!(server.store.len().await, 1);
}
