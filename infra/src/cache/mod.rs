//! Cache module for Redis-based token storage
//!
//! [`RedisStore`] is the shared backend for invalidation markers and the
//! revocation list when several service instances verify the same tokens.

pub mod redis_client;
pub mod redis_store;

#[cfg(test)]
mod tests;

pub use redis_client::RedisClient;
pub use redis_store::RedisStore;

// Re-export commonly used types
pub use tg_shared::CacheConfig;
