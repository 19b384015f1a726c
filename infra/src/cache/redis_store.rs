//! Redis-backed expiring store shared by every service instance

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use tg_core::cache::ExpiringStore;
use tg_core::errors::CacheError;
use tg_shared::CacheConfig;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

/// [`ExpiringStore`] over Redis
///
/// Values are stored as JSON text with `SET key value EX ttl`; Redis itself
/// enforces expiry, so every instance pointed at the same server sees the
/// same markers and revocations.
#[derive(Debug, Clone)]
pub struct RedisStore {
    client: RedisClient,
}

impl RedisStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Connect a new client and wrap it
    pub async fn connect(config: CacheConfig) -> Result<Self, InfrastructureError> {
        Ok(Self::new(RedisClient::new(config).await?))
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }
}

#[async_trait]
impl ExpiringStore for RedisStore {
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheError> {
        if ttl_seconds == 0 {
            // Already expired: make sure no earlier write survives.
            debug!(key, "zero ttl write stored as delete");
            return self.delete(key).await;
        }

        let encoded = serde_json::to_string(&value)
            .map_err(|e| InfrastructureError::from(e).into_cache_error("set", key))?;
        self.client
            .set_with_expiry(key, &encoded, ttl_seconds)
            .await
            .map_err(|e| e.into_cache_error("set", key))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let raw = self
            .client
            .get(key)
            .await
            .map_err(|e| e.into_cache_error("get", key))?;

        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| InfrastructureError::from(e).into_cache_error("get", key)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.client
            .delete(key)
            .await
            .map(|_| ())
            .map_err(|e| e.into_cache_error("delete", key))
    }
}
