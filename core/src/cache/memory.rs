//! In-process expiring store backed by a sharded concurrent map

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::store::{expiry_instant, ExpiringStore};
use super::sweeper::Sweep;
use crate::clock::{system_clock, Clock};
use crate::errors::CacheError;

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Expiring map for single-instance deployments
///
/// Expired entries are dropped lazily when looked up, and in bulk by
/// [`purge_expired`](Self::purge_expired). The type parameter lets typed
/// caches (such as the key set cache) reuse the same storage; the
/// `serde_json::Value` instantiation implements [`ExpiringStore`].
pub struct MemoryStore<V = Value> {
    entries: DashMap<String, Entry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V> fmt::Debug for MemoryStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> MemoryStore<V> {
    /// Create an empty store on the system clock
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Create an empty store on the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// The clock this store measures expiry against
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Store `value` for `ttl_seconds`, replacing any previous entry
    pub fn insert(&self, key: impl Into<String>, value: V, ttl_seconds: u64) {
        let expires_at = expiry_instant(self.clock.now(), ttl_seconds);
        self.insert_until(key, value, expires_at);
    }

    /// Store `value` until the absolute instant `expires_at`
    pub fn insert_until(&self, key: impl Into<String>, value: V, expires_at: DateTime<Utc>) {
        self.entries.insert(key.into(), Entry { value, expires_at });
    }

    /// Live value under `key`; an expired entry found here is discarded
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            None => return None,
            Some(entry) if now < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => {}
        }

        // Re-checked under the shard lock so a concurrent fresh write survives.
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            debug!(key, "dropped expired cache entry");
        }
        None
    }

    /// Remove `key`, returning whether a live entry was removed
    pub fn remove(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .remove(key)
            .map(|(_, entry)| now < entry.expires_at)
            .unwrap_or(false)
    }

    /// Whether a live entry exists under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|entry| now < entry.expires_at)
            .count()
    }

    /// Whether there are no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    /// Remove everything
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore<Value> {
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheError> {
        self.insert(key, value, ttl_seconds);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(MemoryStore::get(self, key))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.remove(key);
        Ok(())
    }
}

impl<V: Clone + Send + Sync + 'static> Sweep for MemoryStore<V> {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn purge_expired(&self) -> usize {
        MemoryStore::purge_expired(self)
    }
}
