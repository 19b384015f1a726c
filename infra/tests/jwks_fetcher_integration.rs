//! Integration tests for the JWKS fetcher against a mock provider

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tg_core::{KeySetCache, ManualClock};
use tg_infra::{JwksError, JwksFetcher, JwksFetcherConfig};

fn jwks(kids: &[&str]) -> serde_json::Value {
    let keys: Vec<_> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "oct",
                "kid": kid,
                "alg": "HS256",
                "k": "c2VjcmV0LWtleS1tYXRlcmlhbA"
            })
        })
        .collect();
    json!({ "keys": keys })
}

async fn provider(body: serde_json::Value, expected_fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_fetches)
        .mount(&server)
        .await;
    server
}

fn jwks_url(server: &MockServer) -> String {
    format!("{}/.well-known/jwks.json", server.uri())
}

fn fetcher_with_clock(ttl_seconds: u64) -> (JwksFetcher, ManualClock) {
    let clock = ManualClock::starting_now();
    let cache = Arc::new(KeySetCache::with_clock(Arc::new(clock.clone())));
    let fetcher = JwksFetcher::with_cache(
        JwksFetcherConfig::default().with_ttl_seconds(ttl_seconds),
        cache,
    )
    .unwrap();
    (fetcher, clock)
}

#[tokio::test]
async fn test_keys_are_fetched_once_within_ttl() {
    let server = provider(jwks(&["key1", "key2"]), 1).await;
    let (fetcher, _clock) = fetcher_with_clock(300);
    let url = jwks_url(&server);

    let first = fetcher.get_keys(&url).await.unwrap();
    let second = fetcher.get_keys(&url).await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(fetcher.cache().has(&url));
}

#[tokio::test]
async fn test_keys_are_refetched_after_ttl() {
    let server = provider(jwks(&["key1"]), 2).await;
    let (fetcher, clock) = fetcher_with_clock(5);
    let url = jwks_url(&server);

    fetcher.get_keys(&url).await.unwrap();
    clock.advance(Duration::seconds(6));
    assert!(fetcher.cache().get(&url).is_none());

    let keys = fetcher.get_keys(&url).await.unwrap();
    assert_eq!(keys[0].common.key_id.as_deref(), Some("key1"));
}

#[tokio::test]
async fn test_refresh_forces_fetch() {
    let server = provider(jwks(&["key1"]), 2).await;
    let (fetcher, _clock) = fetcher_with_clock(300);
    let url = jwks_url(&server);

    fetcher.get_keys(&url).await.unwrap();
    fetcher.refresh(&url).await.unwrap();
}

#[tokio::test]
async fn test_find_key_by_kid() {
    let server = provider(jwks(&["key1", "key2"]), 1).await;
    let (fetcher, _clock) = fetcher_with_clock(300);
    let url = jwks_url(&server);

    let key = fetcher.find_key(&url, "key2").await.unwrap();
    assert_eq!(key.common.key_id.as_deref(), Some("key2"));

    // Served from cache.
    fetcher.find_key(&url, "key1").await.unwrap();
    fetcher.decoding_key(&url, "key1").await.unwrap();
}

#[tokio::test]
async fn test_unknown_kid_refetches_once_then_fails() {
    let server = provider(jwks(&["key1"]), 2).await;
    let (fetcher, _clock) = fetcher_with_clock(300);
    let url = jwks_url(&server);

    fetcher.get_keys(&url).await.unwrap();
    let result = fetcher.find_key(&url, "rotated").await;

    assert!(matches!(result, Err(JwksError::KeyNotFound { ref kid }) if kid == "rotated"));
}

#[tokio::test]
async fn test_http_error_propagates_and_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (fetcher, _clock) = fetcher_with_clock(300);
    let url = jwks_url(&server);

    let result = fetcher.get_keys(&url).await;

    assert!(matches!(result, Err(JwksError::HttpStatus { status: 503, .. })));
    assert!(!fetcher.cache().has(&url));
}

#[tokio::test]
async fn test_malformed_document_is_a_parse_error() {
    let server = provider(json!({ "not": "a key set" }), 1).await;
    let (fetcher, _clock) = fetcher_with_clock(300);

    let result = fetcher.get_keys(&jwks_url(&server)).await;

    assert!(matches!(result, Err(JwksError::Parse { .. })));
}

#[tokio::test]
async fn test_unreachable_provider_is_a_network_error() {
    let (fetcher, _clock) = fetcher_with_clock(300);

    let result = fetcher.get_keys("http://127.0.0.1:1/jwks").await;

    assert!(matches!(result, Err(JwksError::Network { .. })));
}
