//! Configuration module
//!
//! - `auth` - token signing material, lifetimes and cache failure policy
//! - `cache` - cache backend selection, Redis and in-process settings
//! - `logging` - log level and format

pub mod auth;
pub mod cache;
pub mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use auth::{CacheFailurePolicy, ExpirySetting, JwtConfig};
pub use cache::{CacheConfig, CacheStrategyConfig, CacheType, MemoryCacheConfig};
pub use logging::{LogFormat, LoggingConfig};

/// Prefix for layered environment overrides, e.g. `TOLLGATE__JWT__ACCESS_SECRET`
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Complete configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Token configuration
    pub jwt: JwtConfig,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheStrategyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from an optional file, then `TOLLGATE__*` environment overrides
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load settings from flat environment variables (`JWT_SECRET`, `REDIS_URL`, ...)
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let cache_type = match std::env::var("CACHE_TYPE").as_deref() {
            Ok("redis") => CacheType::Redis,
            _ => CacheType::Memory,
        };

        Ok(Self {
            jwt: JwtConfig::from_env()?,
            cache: CacheStrategyConfig {
                cache_type,
                redis: CacheConfig::from_env(),
                memory: MemoryCacheConfig::default(),
            },
            logging: LoggingConfig {
                level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                ..Default::default()
            },
        })
    }
}
