//! # Infrastructure Layer
//!
//! Concrete backends for the Tollgate token core:
//!
//! - **Cache**: Redis client and a Redis-backed [`ExpiringStore`](tg_core::ExpiringStore)
//!   for invalidation markers and the revocation list
//! - **JWKS**: fetch-through loader for identity provider key sets
//! - **Logging**: `tracing` subscriber installation from [`LoggingConfig`](tg_shared::LoggingConfig)
//! - **Bootstrap**: wiring a [`TokenService`](tg_core::TokenService) from [`Settings`](tg_shared::Settings)
//!
//! ## Features
//!
//! - `redis-cache`: Enable the Redis store (default)

// Re-export core types for convenience
pub use tg_core::errors::*;

/// Cache module - Redis client and store
#[cfg(feature = "redis-cache")]
pub mod cache;

/// JWKS module - provider key set fetching
pub mod jwks;

/// Logging module - subscriber installation
pub mod logging;

/// Bootstrap module - building the token service from settings
pub mod bootstrap;

pub use bootstrap::{build_store, build_token_service, SelectedStore, TokenRuntime};
pub use jwks::{JwksError, JwksFetcher, JwksFetcherConfig};
pub use logging::init_tracing;

#[cfg(feature = "redis-cache")]
pub use cache::{RedisClient, RedisStore};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// A cache command did not answer in time
    #[error("Cache operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Cached value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token core rejected its configuration
    #[error(transparent)]
    Token(#[from] ConfigError),

    /// Logging could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl InfrastructureError {
    /// Convert into the core's store error, attributing it to `operation` on `key`
    pub fn into_cache_error(self, operation: &'static str, key: &str) -> CacheError {
        match self {
            InfrastructureError::Timeout { timeout_ms } => CacheError::Timeout {
                operation,
                key: key.to_string(),
                timeout_ms,
            },
            InfrastructureError::Serialization(e) => CacheError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            },
            other => CacheError::Backend {
                operation,
                key: key.to_string(),
                message: other.to_string(),
            },
        }
    }
}
