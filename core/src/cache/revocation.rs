//! Explicit revocation list of token identifiers

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::memory::MemoryStore;
use super::store::ExpiringStore;
use crate::clock::Clock;
use crate::errors::CacheError;

/// Revocation TTL used when the caller does not supply one (1 hour)
pub const DEFAULT_BLACKLIST_TTL_SECS: u64 = 3600;

const BLACKLIST_KEY_PREFIX: &str = "blacklist:";

/// Set of revoked `jti`s, each honoured until its own expiry
///
/// Presence means "reject regardless of signature validity". The set is
/// independent of which manager issued a token, so access and refresh
/// identifiers can share it.
///
/// A default TTL shorter than a token's remaining lifetime silently
/// under-revokes it; callers that know the token's `exp` should use
/// [`add_with_ttl`](Self::add_with_ttl).
#[derive(Clone)]
pub struct RevocationSet {
    store: Arc<dyn ExpiringStore>,
    default_ttl: u64,
}

impl std::fmt::Debug for RevocationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationSet")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl RevocationSet {
    /// Revocation set over the given store with the default TTL
    pub fn new(store: Arc<dyn ExpiringStore>) -> Self {
        Self::with_default_ttl(store, DEFAULT_BLACKLIST_TTL_SECS)
    }

    /// Revocation set over the given store with a custom default TTL
    pub fn with_default_ttl(store: Arc<dyn ExpiringStore>, default_ttl: u64) -> Self {
        Self { store, default_ttl }
    }

    /// Revocation set over a private in-process store
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::new(Arc::new(MemoryStore::<Value>::with_clock(clock)))
    }

    /// TTL applied by [`add`](Self::add)
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Revoke `jti` for the default TTL
    pub async fn add(&self, jti: &str) -> Result<(), CacheError> {
        self.add_with_ttl(jti, self.default_ttl).await
    }

    /// Revoke `jti` for `ttl_seconds`
    pub async fn add_with_ttl(&self, jti: &str, ttl_seconds: u64) -> Result<(), CacheError> {
        self.store
            .set(&Self::key(jti), Value::Bool(true), ttl_seconds)
            .await?;
        info!(jti, ttl_seconds, "token identifier blacklisted");
        Ok(())
    }

    /// Whether `jti` is currently revoked
    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, CacheError> {
        Ok(self.store.get(&Self::key(jti)).await?.is_some())
    }

    /// Lift the revocation of `jti`
    pub async fn remove(&self, jti: &str) -> Result<(), CacheError> {
        self.store.delete(&Self::key(jti)).await?;
        debug!(jti, "token identifier removed from blacklist");
        Ok(())
    }

    pub(crate) fn key(jti: &str) -> String {
        format!("{}{}", BLACKLIST_KEY_PREFIX, jti)
    }
}
