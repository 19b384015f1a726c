//! # Tollgate Core
//!
//! Token lifecycle layer for Tollgate: expiring stores, revocation,
//! algorithm-aware signing and verification, and the per-role managers that
//! tie them together. Infrastructure backends (Redis, JWKS over HTTP) live in
//! `tg_infra` and plug in through [`cache::ExpiringStore`].

pub mod cache;
pub mod clock;
pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use cache::{ExpiringStore, KeySetCache, MemoryStore, RevocationSet, StoreSweeper};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::*;
pub use errors::*;
pub use services::{
    Rs256KeyPair, SigningMaterial, TokenCodec, TokenManager, TokenManagerOptions, TokenService,
};
