//! Cache of verification key sets fetched from identity providers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::Jwk;

use super::memory::MemoryStore;
use super::store::expiry_instant;
use super::sweeper::Sweep;
use crate::clock::{system_clock, Clock};

/// Keys published by one provider, and when the cached copy lapses
#[derive(Debug, Clone, PartialEq)]
pub struct KeySetEntry {
    /// Keys in the order the provider published them
    pub keys: Vec<Jwk>,
    /// Instant after which the entry is no longer served
    pub expires_at: DateTime<Utc>,
}

impl KeySetEntry {
    /// Key with the given `kid`, if published
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
    }
}

/// Key sets keyed by provider URL, bounding how often providers are called
#[derive(Debug)]
pub struct KeySetCache {
    entries: MemoryStore<KeySetEntry>,
}

impl Default for KeySetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySetCache {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: MemoryStore::with_clock(clock),
        }
    }

    /// Cache `keys` for `provider_url` for `ttl_seconds`
    pub fn set(&self, provider_url: &str, keys: Vec<Jwk>, ttl_seconds: u64) {
        let expires_at = expiry_instant(self.entries.clock().now(), ttl_seconds);
        self.entries
            .insert_until(provider_url, KeySetEntry { keys, expires_at }, expires_at);
    }

    /// Live entry for `provider_url`
    pub fn get(&self, provider_url: &str) -> Option<KeySetEntry> {
        self.entries.get(provider_url)
    }

    pub fn delete(&self, provider_url: &str) {
        self.entries.remove(provider_url);
    }

    /// Whether a live entry exists for `provider_url`
    pub fn has(&self, provider_url: &str) -> bool {
        self.entries.contains_key(provider_url)
    }

    /// Number of live entries
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
    }
}

impl Sweep for KeySetCache {
    fn name(&self) -> &str {
        "key_set_cache"
    }

    fn purge_expired(&self) -> usize {
        KeySetCache::purge_expired(self)
    }
}
