//! Cache configuration module

use serde::{Deserialize, Serialize};

/// Redis cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,

    /// Response timeout in milliseconds, applied to every command
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Prefix prepended to every cache key
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,

    /// Maximum attempts for a command that fails with a transient error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries (exponential backoff)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout_ms: default_connection_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            key_prefix: None,
            database: 0,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix = std::env::var("REDIS_KEY_PREFIX").ok();
        let response_timeout_ms = std::env::var("REDIS_RESPONSE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_response_timeout_ms);

        Self {
            url,
            key_prefix,
            response_timeout_ms,
            ..Default::default()
        }
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// In-process cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryCacheConfig {
    /// Run the background sweeper that drops expired entries
    #[serde(default = "default_sweep_enabled")]
    pub sweep_enabled: bool,

    /// Sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: default_sweep_enabled(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Which store backs token metadata and the revocation list
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheStrategyConfig {
    /// Cache type (memory for single instance deployments, redis when shared)
    #[serde(default = "default_cache_type")]
    pub cache_type: CacheType,

    /// Redis configuration
    #[serde(default)]
    pub redis: CacheConfig,

    /// Memory cache configuration
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

/// Cache type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    Redis,
    Memory,
}

impl Default for CacheStrategyConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            redis: CacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

fn default_response_timeout_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    50
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60 // 1 minute
}

fn default_cache_type() -> CacheType {
    CacheType::Memory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.database, 0);
        assert_eq!(config.response_timeout_ms, 500);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_cache_config_with_prefix() {
        let config = CacheConfig::new("redis://cache:6379")
            .with_prefix("tollgate")
            .with_database(20);

        assert_eq!(config.make_key("token:abc"), "tollgate:token:abc");
        assert_eq!(config.database, 15);
    }

    #[test]
    fn test_cache_key_without_prefix() {
        let config = CacheConfig::default();
        assert_eq!(config.make_key("blacklist:abc"), "blacklist:abc");
    }

    #[test]
    fn test_cache_strategy_defaults_to_memory() {
        let config = CacheStrategyConfig::default();
        assert_eq!(config.cache_type, CacheType::Memory);
        assert!(config.memory.sweep_enabled);
        assert_eq!(config.memory.sweep_interval, 60);
    }

    #[test]
    fn test_cache_type_deserializes_lowercase() {
        let config: CacheStrategyConfig =
            serde_json::from_str(r#"{"cache_type":"redis","redis":{"url":"redis://r:6379"}}"#)
                .unwrap();
        assert_eq!(config.cache_type, CacheType::Redis);
        assert_eq!(config.redis.url, "redis://r:6379");
        assert_eq!(config.redis.retry_delay_ms, 50);
    }
}
