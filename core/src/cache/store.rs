//! The expiring key-value capability every token cache is built on

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::CacheError;

/// String-keyed store whose entries expire `ttl_seconds` after they are written
///
/// Implementations must never report an entry as present once the current
/// time has reached its expiry, whether or not it was physically removed.
/// A TTL of zero therefore makes the entry absent to every later lookup.
/// Writes to an existing key overwrite it (last write wins). Every operation
/// touches exactly one key.
#[async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Store `value` under `key` until `now + ttl_seconds`
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheError>;

    /// Fetch the live value under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

#[async_trait]
impl<S: ExpiringStore + ?Sized> ExpiringStore for Arc<S> {
    async fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> Result<(), CacheError> {
        (**self).set(key, value, ttl_seconds).await
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        (**self).delete(key).await
    }
}

/// Serialize `value` and store it
pub async fn set_typed<T: Serialize + ?Sized>(
    store: &dyn ExpiringStore,
    key: &str,
    value: &T,
    ttl_seconds: u64,
) -> Result<(), CacheError> {
    let value = serde_json::to_value(value).map_err(|e| CacheError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, value, ttl_seconds).await
}

/// Fetch a value and deserialize it
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn ExpiringStore,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| CacheError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Absolute expiry for an entry written at `now` with `ttl_seconds`
///
/// Saturates instead of overflowing for absurdly large TTLs.
pub fn expiry_instant(now: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
