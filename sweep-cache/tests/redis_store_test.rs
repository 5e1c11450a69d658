//! Integration tests against a live Redis server
//!
//! These tests require a running Redis instance. Each test works under a
//! random namespace so runs never interfere with each other or with real data.

use std::sync::Arc;
use std::time::Duration;
use sweep_cache::{
    keys, CacheConfig, CacheOptions, CacheParams, EntryTtl, KeyValueStore, ReadThroughCache,
    RedisConfig, RedisStore,
};

// Helper function to get Redis connection details from environment or use defaults
fn get_redis_config() -> RedisConfig {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    RedisConfig::new(url)
}

fn test_namespace() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

fn redis_cache(config: CacheConfig) -> (Arc<RedisStore>, ReadThroughCache) {
    let store = Arc::new(RedisStore::new(get_redis_config()).expect("Invalid Redis URL"));
    let cache = ReadThroughCache::new(store.clone(), config);
    (store, cache)
}

#[tokio::test]
#[ignore] // Run with: cargo test --ignored
async fn test_redis_round_trip() {
    let (_, cache) = redis_cache(CacheConfig::default());
    let ns = test_namespace();
    let options = CacheOptions::ttl(60).with_namespace(ns.clone());

    let value: String = cache
        .get_or_set("greeting", || async { Ok::<_, anyhow::Error>("hello".to_string()) }, &options)
        .await
        .unwrap();
    assert_eq!(value, "hello");

    assert_eq!(cache.get::<String>("greeting", Some(&ns)).await.as_deref(), Some("hello"));
    assert!(matches!(
        cache.ttl("greeting", Some(&ns)).await,
        Some(EntryTtl::Expiring(s)) if s > 0 && s <= 60
    ));

    assert_eq!(cache.clear_namespace(&ns).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_redis_zero_ttl_is_persistent() {
    let (store, cache) = redis_cache(CacheConfig::default());
    let ns = test_namespace();

    let options = CacheOptions::ttl(0).with_namespace(ns.clone());
    assert!(cache.set("img", &"https://img", &options).await);

    let raw_key = keys::namespaced("img", Some(&ns));
    assert_eq!(store.ttl(&raw_key).await.unwrap(), Some(EntryTtl::Persistent));

    cache.clear_namespace(&ns).await;
}

#[tokio::test]
#[ignore]
async fn test_redis_pattern_sweep_over_many_pages() {
    let (_, cache) = redis_cache(CacheConfig::builder().scan_count(10).build());
    let ns = test_namespace();
    let wallet = "0xAbC0000000000000000000000000000000000001";
    let options = CacheOptions::ttl(120).with_namespace(ns.clone());

    for page in 0..150 {
        let key = keys::tokens_key(wallet, Some(&CacheParams::new().with("page", page)));
        assert!(cache.set(&key, &page, &options).await);
    }
    let survivor = keys::tokens_key("0xdef", None);
    cache.set(&survivor, &0, &options).await;

    let deleted = cache
        .invalidate_by_pattern(&keys::wallet_pattern(wallet), Some(&ns))
        .await;

    assert_eq!(deleted, 150);
    assert!(cache.exists(&survivor, Some(&ns)).await);
    assert_eq!(cache.clear_namespace(&ns).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_redis_pipelined_batch_delete() {
    let (store, _) = redis_cache(CacheConfig::default());
    let ns = test_namespace();
    let batch: Vec<String> = (0..5).map(|i| format!("{}:k{}", ns, i)).collect();

    for key in &batch[..3] {
        store.set(key, "v", Some(Duration::from_secs(30))).await.unwrap();
    }

    let flags = store.delete_many(&batch).await.unwrap();
    assert_eq!(flags, vec![true, true, true, false, false]);
}
