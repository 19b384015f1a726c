//! Redis cache client implementation
//!
//! Multiplexed async connection with a bounded response time per command and
//! retry with exponential backoff for transient failures. Keys are namespaced
//! through the configured prefix before they reach Redis.

use redis::{
    aio::MultiplexedConnection, AsyncCommands, Client, IntoConnectionInfo, RedisError, RedisResult,
};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use tg_shared::CacheConfig;

use crate::InfrastructureError;

/// Upper bound on the backoff between two attempts
const MAX_RETRY_DELAY_MS: u64 = 5000;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis cache client with retry logic
///
/// Cloning is cheap; clones share the multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    connection: MultiplexedConnection,
    config: CacheConfig,
    response_timeout: Duration,
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient")
            .field("url", &mask_url(&self.config.url))
            .field("database", &self.config.database)
            .field("key_prefix", &self.config.key_prefix)
            .finish()
    }
}

impl RedisClient {
    /// Connect using `config`
    ///
    /// # Returns
    /// * `Ok(RedisClient)` - Connected client
    /// * `Err(InfrastructureError::Config)` - The URL could not be parsed
    /// * `Err(InfrastructureError::Cache)` - No connection after `max_retries` attempts
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!(
            url = %mask_url(&config.url),
            database = config.database,
            "Creating Redis client"
        );

        let mut connection_info = config.url.as_str().into_connection_info().map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;
        if config.database != 0 {
            connection_info.redis.db = i64::from(config.database);
        }

        let client = Client::open(connection_info).map_err(|e| {
            error!("Failed to open Redis client: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(&client, &config).await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            response_timeout: Duration::from_millis(config.response_timeout_ms),
            config,
        })
    }

    async fn create_connection_with_retry(
        client: &Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let connect_timeout = Duration::from_millis(config.connection_timeout_ms);
        let max_retries = config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let result = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(result) => result,
                Err(_) => Err(timed_out(config.connection_timeout_ms)),
            };

            match result {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Set a value that Redis drops after `expiry_seconds`
    ///
    /// `expiry_seconds` must be positive; Redis rejects `EX 0`.
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Setting key '{}' with expiry {}s", key, expiry_seconds);

        let value = value.to_string();
        self.execute_with_retry(&key, |mut conn, key| {
            let value = value.clone();
            Box::pin(async move { conn.set_ex::<_, _, ()>(key, value, expiry_seconds).await })
        })
        .await
    }

    /// Get a value, `None` if the key is absent or has expired
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Getting key '{}'", key);

        let value = self
            .execute_with_retry(&key, |mut conn, key| {
                Box::pin(async move { conn.get::<_, Option<String>>(key).await })
            })
            .await?;

        if value.is_none() {
            debug!("Key '{}' not found", key);
        }
        Ok(value)
    }

    /// Delete a key; returns whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let key = self.config.make_key(key);
        debug!("Deleting key '{}'", key);

        let deleted = self
            .execute_with_retry(&key, |mut conn, key| {
                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await?;

        Ok(deleted > 0)
    }

    /// Remaining time-to-live for a key
    ///
    /// `None` if the key doesn't exist or has no expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<i64>, InfrastructureError> {
        let key = self.config.make_key(key);

        let ttl = self
            .execute_with_retry(&key, |mut conn, key| {
                Box::pin(async move { conn.ttl::<_, i64>(key).await })
            })
            .await?;

        Ok((ttl >= 0).then_some(ttl))
    }

    /// PING the server
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let response = self
            .execute_with_retry("PING", |mut conn, _| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;

        if response != "PONG" {
            warn!("Redis health check returned unexpected response: {}", response);
        }
        Ok(response == "PONG")
    }

    /// Run `operation` with the response timeout, retrying transient failures
    async fn execute_with_retry<T, F>(&self, key: &str, operation: F) -> Result<T, InfrastructureError>
    where
        F: Fn(MultiplexedConnection, String) -> RedisFuture<T>,
    {
        let max_retries = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            let call = operation(self.connection.clone(), key.to_string());

            let error = match timeout(self.response_timeout, call).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => e,
                Err(_) if attempts < max_retries => timed_out(self.config.response_timeout_ms),
                Err(_) => {
                    error!(
                        "Redis operation on '{}' timed out after {} attempts",
                        key, attempts
                    );
                    return Err(InfrastructureError::Timeout {
                        timeout_ms: self.config.response_timeout_ms,
                    });
                }
            };

            if attempts < max_retries && is_retriable_error(&error) {
                warn!(
                    "Redis operation on '{}' failed (attempt {}/{}): {}. Retrying in {}ms...",
                    key, attempts, max_retries, error, delay
                );
                sleep(Duration::from_millis(delay)).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                continue;
            }

            error!(
                "Redis operation on '{}' failed after {} attempts: {}",
                key, attempts, error
            );
            return Err(InfrastructureError::Cache(error));
        }
    }
}

fn timed_out(timeout_ms: u64) -> RedisError {
    RedisError::from(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("no response within {}ms", timeout_ms),
    ))
}

/// Whether an error is transient and the operation should be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask the credentials of a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            if proto_end < at_pos {
                let proto = &url[..proto_end + 3];
                let host_part = &url[at_pos..];
                return format!("{}****{}", proto, host_part);
            }
        }
    }
    url.to_string()
}
