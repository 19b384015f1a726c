//! Per-role token lifecycle: issuance, verification, invalidation and revocation
//!
//! A token moves from issued to revoked or expired and never back. Neither
//! state is held in memory here; both are read from the store at
//! verification time.
//!
//! Two revocation mechanisms are consulted, with different trust in the cache:
//!
//! - the invalidation marker at `token:<jti>` is fail-open: a missing marker
//!   (evicted, never written, written by another deployment) means "not
//!   revoked";
//! - the [`RevocationSet`] is fail-closed by presence: a listed `jti` is
//!   rejected whatever its signature says.
//!
//! When the store cannot answer at all (timeout or backend error), the
//! configured [`CacheFailurePolicy`] decides for both.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use rand::RngCore;
use tracing::{debug, info, warn};

use tg_shared::CacheFailurePolicy;

use super::codec::TokenCodec;
use super::config::TokenManagerOptions;
use super::expiry::parse_expiry;
use crate::cache::{get_typed, set_typed, ExpiringStore, RevocationSet};
use crate::clock::Clock;
use crate::domain::{Claims, InvalidationMarker, TokenRole, JTI_CLAIM};
use crate::errors::{
    CacheError, ConfigError, DomainError, DomainResult, RevocationSource, TokenError,
    TokenErrorKind,
};

/// Random bytes in a generated `jti` (rendered as twice as many hex digits)
pub const JTI_BYTES: usize = 16;

/// Generate a token identifier: 16 random bytes as 32 lowercase hex digits
pub fn generate_jti() -> String {
    let mut bytes = [0u8; JTI_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues, verifies, invalidates and revokes tokens of one role
///
/// Access and refresh tokens are served by two instances of this type that
/// differ only in configuration.
pub struct TokenManager {
    role: TokenRole,
    codec: TokenCodec,
    cache: Option<Arc<dyn ExpiringStore>>,
    revocations: Option<RevocationSet>,
    ttl_seconds: u64,
    cache_timeout: Duration,
    failure_policy: CacheFailurePolicy,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("role", &self.role)
            .field("codec", &self.codec)
            .field("cache", &self.cache.is_some())
            .field("revocations", &self.revocations)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("cache_timeout", &self.cache_timeout)
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

impl TokenManager {
    /// Build a manager, rejecting unusable configuration up front
    ///
    /// # Returns
    ///
    /// * `Ok(TokenManager)` - Ready to issue tokens
    /// * `Err(ConfigError)` - Empty secret or malformed expiry
    pub fn new(options: TokenManagerOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let ttl_seconds = parse_expiry(&options.expires_in)?;

        let codec = TokenCodec::new(&options.material, ttl_seconds, options.clock.clone())
            .with_issuer(options.issuer)
            .with_audience(options.audience);

        debug!(
            role = %options.role,
            algorithm = ?codec.algorithm(),
            ttl_seconds,
            cache = options.cache.is_some(),
            "token manager configured"
        );

        Ok(Self {
            role: options.role,
            codec,
            cache: options.cache,
            revocations: options.revocations,
            ttl_seconds,
            cache_timeout: options.cache_timeout,
            failure_policy: options.failure_policy,
            clock: options.clock,
        })
    }

    /// Role whose tokens this manager serves
    pub fn role(&self) -> TokenRole {
        self.role
    }

    /// Signing algorithm, fixed at construction
    pub fn algorithm(&self) -> Algorithm {
        self.codec.algorithm()
    }

    /// Whether invalidation markers are kept
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Lifetime of issued tokens in seconds
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Sign a copy of `payload`, adding a `jti` unless it already has one
    ///
    /// With a cache configured, the `{invalidate: false}` marker is written
    /// under `token:<jti>` for the token's lifetime before the token is
    /// returned; if that write fails no token is handed out.
    ///
    /// A caller-supplied `jti` whose marker already says invalidated is
    /// refused with [`TokenError::TokenRevoked`]; the marker is never reset.
    pub async fn create_token(&self, payload: &Claims) -> DomainResult<String> {
        let mut claims = payload.clone();
        let jti = match claims.jti() {
            Some(jti) => {
                let jti = jti.to_string();
                self.ensure_not_invalidated(&jti).await?;
                jti
            }
            None => {
                let jti = generate_jti();
                claims.set_jti(jti.clone());
                jti
            }
        };

        let token = self.codec.sign(&claims)?;

        if let Some(cache) = &self.cache {
            let key = InvalidationMarker::key(&jti);
            self.cache_call(
                "set",
                &key,
                set_typed(cache.as_ref(), &key, &InvalidationMarker::issued(), self.ttl_seconds),
            )
            .await?;
        }

        debug!(role = %self.role, jti = %jti, "token issued");
        Ok(token)
    }

    /// Verify `token` and return its claims
    ///
    /// Signature and expiry are checked first; only a cryptographically valid
    /// token is looked up in the store.
    pub async fn verify_token(&self, token: &str) -> DomainResult<Claims> {
        let claims = self.codec.verify(token).map_err(|e| {
            self.log_rejection(&e, None);
            DomainError::from(e)
        })?;

        if let Some(jti) = claims.jti() {
            self.check_marker(jti).await?;
            self.check_revocation_list(jti).await?;
        }

        Ok(claims)
    }

    /// Mark `token` as invalidated
    ///
    /// The token is decoded without verification so that an expired or
    /// otherwise unusable token can still be recorded. The marker lives for
    /// the token's remaining lifetime (at least one second), or for the
    /// manager's TTL when the token carries no `exp`.
    pub async fn invalidate_token(&self, token: &str) -> DomainResult<()> {
        let cache = self.cache.as_ref().ok_or(ConfigError::CacheNotConfigured {
            operation: "invalidate token",
        })?;

        let claims = self.codec.decode_unchecked(token)?;
        let jti = required_jti(&claims)?;
        let ttl_seconds = self.remaining_lifetime(&claims, self.ttl_seconds);

        let key = InvalidationMarker::key(jti);
        self.cache_call(
            "set",
            &key,
            set_typed(cache.as_ref(), &key, &InvalidationMarker::invalidated(), ttl_seconds),
        )
        .await?;

        info!(role = %self.role, jti, ttl_seconds, "token invalidated");
        Ok(())
    }

    /// Add the token's `jti` to the revocation list
    ///
    /// The entry lives for the token's remaining lifetime, or for the list's
    /// default TTL when the token carries no `exp`.
    pub async fn revoke_token(&self, token: &str) -> DomainResult<()> {
        let revocations = self
            .revocations
            .as_ref()
            .ok_or(ConfigError::CacheNotConfigured {
                operation: "revoke token",
            })?;

        let claims = self.codec.decode_unchecked(token)?;
        let jti = required_jti(&claims)?;
        let ttl_seconds = self.remaining_lifetime(&claims, revocations.default_ttl());

        let key = RevocationSet::key(jti);
        self.cache_call("set", &key, revocations.add_with_ttl(jti, ttl_seconds))
            .await?;
        Ok(())
    }

    /// Parse `token` without verifying it; never authorize on the result
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.decode_unchecked(token)
    }

    async fn ensure_not_invalidated(&self, jti: &str) -> DomainResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let key = InvalidationMarker::key(jti);
        let marker = self
            .cache_call("get", &key, get_typed::<InvalidationMarker>(cache.as_ref(), &key))
            .await?;

        if marker.is_some_and(|marker| marker.invalidate) {
            warn!(role = %self.role, jti, "refusing to reissue invalidated jti");
            return Err(TokenError::TokenRevoked {
                by: RevocationSource::InvalidationMarker,
            }
            .into());
        }
        Ok(())
    }

    async fn check_marker(&self, jti: &str) -> DomainResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let key = InvalidationMarker::key(jti);
        let marker = self
            .cache_call("get", &key, get_typed::<InvalidationMarker>(cache.as_ref(), &key))
            .await;

        match marker {
            Ok(Some(marker)) if marker.invalidate => {
                let error = TokenError::TokenRevoked {
                    by: RevocationSource::InvalidationMarker,
                };
                self.log_rejection(&error, Some(jti));
                Err(error.into())
            }
            Ok(_) => Ok(()),
            Err(e) => self.on_cache_failure(e, jti),
        }
    }

    async fn check_revocation_list(&self, jti: &str) -> DomainResult<()> {
        let Some(revocations) = &self.revocations else {
            return Ok(());
        };

        let key = RevocationSet::key(jti);
        match self
            .cache_call("get", &key, revocations.is_blacklisted(jti))
            .await
        {
            Ok(true) => {
                let error = TokenError::TokenRevoked {
                    by: RevocationSource::RevocationList,
                };
                self.log_rejection(&error, Some(jti));
                Err(error.into())
            }
            Ok(false) => Ok(()),
            Err(e) => self.on_cache_failure(e, jti),
        }
    }

    fn on_cache_failure(&self, error: CacheError, jti: &str) -> DomainResult<()> {
        match self.failure_policy {
            CacheFailurePolicy::FailClosed => {
                warn!(
                    role = %self.role,
                    jti,
                    code = error.code(),
                    "token cache unavailable, rejecting token: {}",
                    error
                );
                Err(error.into())
            }
            CacheFailurePolicy::FailOpen => {
                warn!(
                    role = %self.role,
                    jti,
                    code = error.code(),
                    "token cache unavailable, skipping revocation check: {}",
                    error
                );
                Ok(())
            }
        }
    }

    async fn cache_call<T, F>(&self, operation: &'static str, key: &str, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        match tokio::time::timeout(self.cache_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation,
                key: key.to_string(),
                timeout_ms: u64::try_from(self.cache_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    fn remaining_lifetime(&self, claims: &Claims, fallback: u64) -> u64 {
        match claims.exp() {
            Some(exp) => {
                let remaining = exp.saturating_sub(self.clock.unix_seconds());
                u64::try_from(remaining).unwrap_or(0).max(1)
            }
            None => fallback,
        }
    }

    fn log_rejection(&self, error: &TokenError, jti: Option<&str>) {
        match error.kind() {
            TokenErrorKind::Revoked => {
                info!(role = %self.role, jti, code = error.code(), "token rejected: {}", error)
            }
            _ => debug!(role = %self.role, jti, code = error.code(), "token rejected: {}", error),
        }
    }
}

fn required_jti(claims: &Claims) -> Result<&str, TokenError> {
    claims.jti().ok_or_else(|| TokenError::MissingClaim {
        claim: JTI_CLAIM.to_string(),
    })
}
