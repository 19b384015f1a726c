//! Shared configuration for the Tollgate token workspace
//!
//! This crate holds the configuration types consumed by the core and
//! infrastructure crates. It carries no token logic of its own.

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    CacheConfig, CacheFailurePolicy, CacheStrategyConfig, CacheType, ExpirySetting, JwtConfig,
    LoggingConfig, LogFormat, MemoryCacheConfig, Settings,
};
