//! Tests for the per-role token lifecycle

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use serde_json::{json, Value};

use tg_shared::CacheFailurePolicy;

use super::mocks::{
    manual_clock, memory_store, FailingReadStore, FailingWriteStore, SharedStore, SlowReadStore, EPOCH,
};
use crate::cache::{MemoryStore, RevocationSet};
use crate::clock::ManualClock;
use crate::domain::{Claims, InvalidationMarker, TokenRole};
use crate::errors::{CacheError, ConfigError, DomainError, RevocationSource, TokenError};
use crate::services::token::{SigningMaterial, TokenCodec, TokenManager, TokenManagerOptions};

struct Fixture {
    manager: TokenManager,
    store: Arc<MemoryStore>,
    revocations: RevocationSet,
    clock: ManualClock,
}

fn options(expires_in: &str, clock: &ManualClock) -> TokenManagerOptions {
    TokenManagerOptions::new(
        TokenRole::Access,
        SigningMaterial::secret("s"),
        expires_in,
        CacheFailurePolicy::FailClosed,
    )
    .with_clock(Arc::new(clock.clone()))
}

fn fixture(expires_in: &str) -> Fixture {
    let clock = manual_clock();
    let store = memory_store(&clock);
    let revocations = RevocationSet::new(store.clone());
    let manager = TokenManager::new(
        options(expires_in, &clock)
            .with_cache(store.clone())
            .with_revocations(revocations.clone()),
    )
    .unwrap();

    Fixture {
        manager,
        store,
        revocations,
        clock,
    }
}

fn user_claims() -> Claims {
    Claims::new().with("userId", "1")
}

fn is_revoked_by(result: Result<Claims, DomainError>, source: RevocationSource) -> bool {
    matches!(
        result,
        Err(DomainError::Token(TokenError::TokenRevoked { by })) if by == source
    )
}

#[tokio::test]
async fn test_create_then_verify() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();

    let claims = f.manager.verify_token(&token).await.unwrap();
    assert_eq!(claims.get("userId"), Some(&json!("1")));

    let jti = claims.jti().unwrap();
    assert_eq!(jti.len(), 32);
    assert!(jti.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert!(claims.exp().unwrap() > EPOCH);
}

#[tokio::test]
async fn test_decode_keeps_payload_and_adds_jti() {
    let f = fixture("15m");
    let payload = Claims::new()
        .with("userId", "42")
        .with("roles", json!(["reader", "writer"]))
        .with("tenant", json!({"id": 7}));

    let token = f.manager.create_token(&payload).await.unwrap();
    let decoded = f.manager.decode_token(&token).unwrap();

    for (name, value) in payload.as_map() {
        assert_eq!(decoded.get(name), Some(value), "claim {}", name);
    }
    assert!(decoded.jti().is_some());
    assert!(payload.jti().is_none(), "caller payload must not be mutated");
}

#[tokio::test]
async fn test_preset_jti_is_kept() {
    let f = fixture("15m");
    let token = f
        .manager
        .create_token(&Claims::new().with("jti", "caller-chosen"))
        .await
        .unwrap();

    assert_eq!(f.manager.decode_token(&token).unwrap().jti(), Some("caller-chosen"));
    assert!(f.store.contains_key("token:caller-chosen"));
}

#[tokio::test]
async fn test_issuance_writes_marker_for_token_lifetime() {
    let f = fixture("10m");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();
    let key = InvalidationMarker::key(&jti);

    assert_eq!(f.store.get(&key), Some(json!({"invalidate": false})));

    f.clock.advance(Duration::seconds(599));
    assert!(f.store.contains_key(&key));
    f.clock.advance(Duration::seconds(1));
    assert!(!f.store.contains_key(&key));
}

#[tokio::test]
async fn test_verify_before_and_after_ttl() {
    let f = fixture("1s");
    let token = f.manager.create_token(&user_claims()).await.unwrap();

    f.clock.advance(Duration::milliseconds(999));
    assert!(f.manager.verify_token(&token).await.is_ok());

    // 1.5 seconds after issuance
    f.clock.advance(Duration::milliseconds(501));
    assert!(matches!(
        f.manager.verify_token(&token).await,
        Err(DomainError::Token(TokenError::TokenExpired))
    ));
}

#[tokio::test]
async fn test_invalidated_token_stays_revoked_for_its_lifetime() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    f.manager.invalidate_token(&token).await.unwrap();

    f.clock.advance(Duration::minutes(10));
    assert!(is_revoked_by(
        f.manager.verify_token(&token).await,
        RevocationSource::InvalidationMarker
    ));

    f.clock.set(chrono::DateTime::from_timestamp(EPOCH + 3599, 0).unwrap());
    assert!(is_revoked_by(
        f.manager.verify_token(&token).await,
        RevocationSource::InvalidationMarker
    ));

    f.clock.advance(Duration::seconds(1));
    assert!(matches!(
        f.manager.verify_token(&token).await,
        Err(DomainError::Token(TokenError::TokenExpired))
    ));
}

#[tokio::test]
async fn test_invalidation_marker_ttl_is_remaining_lifetime() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();
    let key = InvalidationMarker::key(&jti);

    f.clock.advance(Duration::minutes(50));
    f.manager.invalidate_token(&token).await.unwrap();

    f.clock.advance(Duration::seconds(599));
    assert_eq!(f.store.get(&key), Some(json!({"invalidate": true})));
    f.clock.advance(Duration::seconds(1));
    assert_eq!(f.store.get(&key), None);
}

#[tokio::test]
async fn test_expired_token_can_still_be_invalidated() {
    let f = fixture("1m");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();

    f.clock.advance(Duration::hours(2));
    f.manager.invalidate_token(&token).await.unwrap();
    assert_eq!(
        f.store.get(&InvalidationMarker::key(&jti)),
        Some(json!({"invalidate": true}))
    );
}

#[tokio::test]
async fn test_reissuing_invalidated_jti_is_refused() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let claims = f.manager.decode_token(&token).unwrap();
    f.manager.invalidate_token(&token).await.unwrap();

    f.clock.advance(Duration::minutes(1));
    let reissued = f.manager.create_token(&claims).await;

    assert!(matches!(
        reissued,
        Err(DomainError::Token(TokenError::TokenRevoked {
            by: RevocationSource::InvalidationMarker
        }))
    ));
    assert_eq!(
        f.store.get(&InvalidationMarker::key(claims.jti().unwrap())),
        Some(json!({"invalidate": true}))
    );
    assert!(is_revoked_by(
        f.manager.verify_token(&token).await,
        RevocationSource::InvalidationMarker
    ));
}

#[tokio::test]
async fn test_other_role_cannot_reset_invalidated_marker() {
    let f = fixture("1h");
    let refresh = TokenManager::new(
        TokenManagerOptions::new(
            TokenRole::Refresh,
            SigningMaterial::secret("r"),
            "7d",
            CacheFailurePolicy::FailClosed,
        )
        .with_clock(Arc::new(f.clock.clone()))
        .with_cache(f.store.clone()),
    )
    .unwrap();

    let refresh_token = refresh.create_token(&user_claims()).await.unwrap();
    let refresh_claims = refresh.verify_token(&refresh_token).await.unwrap();
    refresh.invalidate_token(&refresh_token).await.unwrap();

    assert!(f.manager.create_token(&refresh_claims).await.is_err());
    assert!(is_revoked_by(
        refresh.verify_token(&refresh_token).await,
        RevocationSource::InvalidationMarker
    ));
}

#[tokio::test]
async fn test_reissuing_live_jti_is_allowed() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let claims = f.manager.decode_token(&token).unwrap();

    let reissued = f.manager.create_token(&claims).await.unwrap();

    assert_eq!(
        f.manager.verify_token(&reissued).await.unwrap().jti(),
        claims.jti()
    );
}

#[tokio::test]
async fn test_missing_marker_is_not_revocation() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();

    f.store.remove(&InvalidationMarker::key(&jti));
    assert!(f.manager.verify_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_invalidate_requires_cache() {
    let clock = manual_clock();
    let manager = TokenManager::new(options("1h", &clock)).unwrap();
    let token = manager.create_token(&user_claims()).await.unwrap();

    assert!(manager.verify_token(&token).await.is_ok());
    assert!(matches!(
        manager.invalidate_token(&token).await,
        Err(DomainError::Config(ConfigError::CacheNotConfigured { .. }))
    ));
    assert!(matches!(
        manager.revoke_token(&token).await,
        Err(DomainError::Config(ConfigError::CacheNotConfigured { .. }))
    ));
}

#[tokio::test]
async fn test_invalidate_without_jti() {
    let f = fixture("1h");
    let codec = TokenCodec::new(&SigningMaterial::secret("s"), 60, Arc::new(f.clock.clone()));
    let token = codec.sign(&user_claims()).unwrap();

    assert!(matches!(
        f.manager.invalidate_token(&token).await,
        Err(DomainError::Token(TokenError::MissingClaim { .. }))
    ));
    assert!(matches!(
        f.manager.invalidate_token("garbage").await,
        Err(DomainError::Token(TokenError::InvalidTokenFormat { .. }))
    ));
}

#[tokio::test]
async fn test_revocation_list_rejects_until_removed() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();

    f.manager.revoke_token(&token).await.unwrap();
    assert!(f.revocations.is_blacklisted(&jti).await.unwrap());
    assert!(is_revoked_by(
        f.manager.verify_token(&token).await,
        RevocationSource::RevocationList
    ));

    f.revocations.remove(&jti).await.unwrap();
    assert!(f.manager.verify_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_revocation_outlives_default_ttl_for_long_tokens() {
    let f = fixture("7d");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();

    f.manager.revoke_token(&token).await.unwrap();

    // Well past the one hour default
    f.clock.advance(Duration::days(6));
    assert!(f.revocations.is_blacklisted(&jti).await.unwrap());
    assert!(f.manager.verify_token(&token).await.is_err());
}

#[tokio::test]
async fn test_revocation_list_applies_to_foreign_jti() {
    let f = fixture("1h");
    let token = f.manager.create_token(&user_claims()).await.unwrap();
    let jti = f.manager.decode_token(&token).unwrap().jti().unwrap().to_string();

    f.revocations.add(&jti).await.unwrap();
    assert!(is_revoked_by(
        f.manager.verify_token(&token).await,
        RevocationSource::RevocationList
    ));
}

#[tokio::test]
async fn test_read_failure_fail_closed() {
    let clock = manual_clock();
    let store = Arc::new(FailingReadStore::default());
    let manager = TokenManager::new(options("1h", &clock).with_cache(store.clone())).unwrap();

    let token = manager.create_token(&user_claims()).await.unwrap();
    assert_eq!(store.writes.load(std::sync::atomic::Ordering::SeqCst), 1);

    assert!(matches!(
        manager.verify_token(&token).await,
        Err(DomainError::Cache(CacheError::Backend { .. }))
    ));
}

#[tokio::test]
async fn test_read_failure_fail_open() {
    let clock = manual_clock();
    let store: SharedStore = Arc::new(FailingReadStore::default());
    let mut options = options("1h", &clock)
        .with_cache(store.clone())
        .with_revocations(RevocationSet::new(store));
    options.failure_policy = CacheFailurePolicy::FailOpen;
    let manager = TokenManager::new(options).unwrap();

    let token = manager.create_token(&user_claims()).await.unwrap();
    let claims = manager.verify_token(&token).await.unwrap();
    assert_eq!(claims.get("userId"), Some(&Value::from("1")));
}

#[tokio::test(start_paused = true)]
async fn test_slow_cache_times_out_per_policy() {
    let clock = manual_clock();
    let store: SharedStore = Arc::new(SlowReadStore {
        inner: memory_store(&clock),
    });

    let closed = TokenManager::new(
        options("1h", &clock)
            .with_cache(store.clone())
            .with_cache_timeout(std::time::Duration::from_millis(50)),
    )
    .unwrap();
    let token = closed.create_token(&user_claims()).await.unwrap();
    assert!(matches!(
        closed.verify_token(&token).await,
        Err(DomainError::Cache(CacheError::Timeout { timeout_ms: 50, .. }))
    ));

    let mut open_options = options("1h", &clock)
        .with_cache(store)
        .with_cache_timeout(std::time::Duration::from_millis(50));
    open_options.failure_policy = CacheFailurePolicy::FailOpen;
    let open = TokenManager::new(open_options).unwrap();
    assert!(open.verify_token(&token).await.is_ok());
}

#[tokio::test]
async fn test_write_failure_withholds_token() {
    let clock = manual_clock();
    let manager =
        TokenManager::new(options("1h", &clock).with_cache(Arc::new(FailingWriteStore))).unwrap();

    assert!(matches!(
        manager.create_token(&user_claims()).await,
        Err(DomainError::Cache(CacheError::Backend { .. }))
    ));
}

#[tokio::test]
async fn test_malformed_expiry_rejected_at_construction() {
    let clock = manual_clock();
    for expiry in ["15", "1w", "abc"] {
        assert!(matches!(
            TokenManager::new(options(expiry, &clock)),
            Err(ConfigError::InvalidExpiry { .. })
        ));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance_yields_distinct_jtis() {
    let f = fixture("1h");
    let manager = Arc::new(f.manager);

    let mut handles = Vec::new();
    for i in 0..64 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let token = manager
                .create_token(&Claims::new().with("n", i))
                .await
                .unwrap();
            manager.verify_token(&token).await.unwrap().jti().unwrap().to_string()
        }));
    }

    let mut jtis = HashSet::new();
    for handle in handles {
        jtis.insert(handle.await.unwrap());
    }
    assert_eq!(jtis.len(), 64);
    assert_eq!(f.store.len(), 64);
}
