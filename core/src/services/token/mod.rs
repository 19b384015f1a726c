//! Token service module for JWT management
//!
//! This module handles all token-related operations including:
//! - Algorithm-aware signing and verification (HS256 or RS256)
//! - Per-role token managers with invalidation markers
//! - Explicit revocation through the shared revocation list
//! - Access/refresh pair issuance and rotation

mod codec;
mod config;
mod expiry;
mod key_manager;
mod manager;
mod service;

#[cfg(test)]
mod tests;

pub use codec::{decode_unchecked, TokenCodec};
pub use config::{parse_algorithm, SigningMaterial, TokenManagerOptions, DEFAULT_CACHE_TIMEOUT};
pub use expiry::parse_expiry;
pub use key_manager::Rs256KeyPair;
pub use manager::{generate_jti, TokenManager, JTI_BYTES};
pub use service::TokenService;
