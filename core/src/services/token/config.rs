//! Configuration for the token codec and managers

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use tg_shared::{CacheFailurePolicy, ExpirySetting};

use super::key_manager::Rs256KeyPair;
use crate::cache::{ExpiringStore, RevocationSet};
use crate::clock::{system_clock, Clock};
use crate::domain::TokenRole;
use crate::errors::ConfigError;

/// Default upper bound on a single cache round-trip
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// Parse the configured algorithm; only `HS256` and `RS256` are supported
pub fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "RS256" => Ok(Algorithm::RS256),
        _ => Err(ConfigError::UnsupportedAlgorithm {
            value: value.to_string(),
        }),
    }
}

/// What a token manager signs with
///
/// The algorithm follows from the material: a shared secret signs HS256,
/// a key pair signs RS256.
#[derive(Debug, Clone)]
pub enum SigningMaterial {
    /// HS256 shared secret
    Secret(String),
    /// RS256 private/public key pair
    KeyPair(Rs256KeyPair),
}

impl SigningMaterial {
    pub fn secret(secret: impl Into<String>) -> Self {
        SigningMaterial::Secret(secret.into())
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            SigningMaterial::Secret(_) => Algorithm::HS256,
            SigningMaterial::KeyPair(_) => Algorithm::RS256,
        }
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        match self {
            SigningMaterial::Secret(secret) => EncodingKey::from_secret(secret.as_bytes()),
            SigningMaterial::KeyPair(pair) => pair.encoding_key().clone(),
        }
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        match self {
            SigningMaterial::Secret(secret) => DecodingKey::from_secret(secret.as_bytes()),
            SigningMaterial::KeyPair(pair) => pair.decoding_key().clone(),
        }
    }

    fn is_empty_secret(&self) -> bool {
        matches!(self, SigningMaterial::Secret(secret) if secret.is_empty())
    }
}

/// Everything one [`TokenManager`](super::TokenManager) is built from
#[derive(Clone)]
pub struct TokenManagerOptions {
    /// Role named in logs and errors
    pub role: TokenRole,
    /// Signing material, which also fixes the algorithm
    pub material: SigningMaterial,
    /// Token lifetime
    pub expires_in: ExpirySetting,
    /// Issuer stamped and enforced when set
    pub issuer: Option<String>,
    /// Audience stamped and enforced when set
    pub audience: Option<String>,
    /// Store for invalidation markers; without one tokens cannot be invalidated
    pub cache: Option<Arc<dyn ExpiringStore>>,
    /// Revocation list consulted on verification
    pub revocations: Option<RevocationSet>,
    /// Upper bound on each cache call
    pub cache_timeout: Duration,
    /// Behaviour when the cache cannot answer during verification
    pub failure_policy: CacheFailurePolicy,
    /// Time source for expiry decisions
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenManagerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManagerOptions")
            .field("role", &self.role)
            .field("algorithm", &self.material.algorithm())
            .field("expires_in", &self.expires_in)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("cache", &self.cache.is_some())
            .field("revocations", &self.revocations)
            .field("cache_timeout", &self.cache_timeout)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

impl TokenManagerOptions {
    pub fn new(
        role: TokenRole,
        material: SigningMaterial,
        expires_in: impl Into<ExpirySetting>,
        failure_policy: CacheFailurePolicy,
    ) -> Self {
        Self {
            role,
            material,
            expires_in: expires_in.into(),
            issuer: None,
            audience: None,
            cache: None,
            revocations: None,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            failure_policy,
            clock: system_clock(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ExpiringStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_revocations(mut self, revocations: RevocationSet) -> Self {
        self.revocations = Some(revocations);
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Check the options before any token is signed
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.material.is_empty_secret() {
            return Err(ConfigError::MissingSecret {
                role: self.role.to_string(),
            });
        }
        Ok(())
    }
}
