//! Token facade: one surface over the access and refresh managers

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use tg_shared::{ExpirySetting, JwtConfig};

use super::config::{parse_algorithm, SigningMaterial, TokenManagerOptions};
use super::key_manager::Rs256KeyPair;
use super::manager::TokenManager;
use crate::cache::{ExpiringStore, RevocationSet};
use crate::clock::{system_clock, Clock};
use crate::domain::{Claims, TokenPair, TokenRole};
use crate::errors::{ConfigError, DomainResult, TokenError};

/// Issues, verifies and revokes access and refresh tokens
pub struct TokenService {
    access: TokenManager,
    refresh: TokenManager,
    revocations: Option<RevocationSet>,
}

impl TokenService {
    /// Assemble a service from two already configured managers
    pub fn new(access: TokenManager, refresh: TokenManager, revocations: Option<RevocationSet>) -> Self {
        Self {
            access,
            refresh,
            revocations,
        }
    }

    /// Creates a token service from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - JWT configuration (algorithm, secrets or key paths, expiries)
    /// * `cache` - Store for invalidation markers and the revocation list; without
    ///   one, tokens can be issued and verified but not invalidated or revoked
    ///
    /// # Returns
    ///
    /// * `Ok(TokenService)` - Both managers are ready
    /// * `Err(ConfigError)` - Missing secret, unloadable keys, malformed expiry
    ///   or unsupported algorithm; nothing has been signed
    pub fn from_config(
        config: &JwtConfig,
        cache: Option<Arc<dyn ExpiringStore>>,
    ) -> Result<Self, ConfigError> {
        Self::from_config_with_clock(config, cache, system_clock())
    }

    /// [`from_config`](Self::from_config) on an explicit clock
    pub fn from_config_with_clock(
        config: &JwtConfig,
        cache: Option<Arc<dyn ExpiringStore>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let (access_material, refresh_material) = resolve_material(config)?;

        let revocations = cache
            .as_ref()
            .map(|store| RevocationSet::with_default_ttl(store.clone(), config.blacklist_default_ttl));

        let options = |role: TokenRole, material: SigningMaterial, expires_in: &ExpirySetting| {
            let mut options =
                TokenManagerOptions::new(role, material, expires_in.clone(), config.cache_failure_policy)
                    .with_cache_timeout(Duration::from_millis(config.cache_timeout_ms))
                    .with_clock(clock.clone());
            options.issuer = config.issuer.clone();
            options.audience = config.audience.clone();
            options.cache = cache.clone();
            options.revocations = revocations.clone();
            options
        };

        let access = TokenManager::new(options(
            TokenRole::Access,
            access_material,
            &config.access_expires_in,
        ))?;
        let refresh = TokenManager::new(options(
            TokenRole::Refresh,
            refresh_material,
            &config.refresh_expires_in,
        ))?;

        info!(
            algorithm = ?access.algorithm(),
            access_ttl = access.ttl_seconds(),
            refresh_ttl = refresh.ttl_seconds(),
            cache = cache.is_some(),
            failure_policy = ?config.cache_failure_policy,
            "token service initialized"
        );

        Ok(Self::new(access, refresh, revocations))
    }

    pub fn access(&self) -> &TokenManager {
        &self.access
    }

    pub fn refresh(&self) -> &TokenManager {
        &self.refresh
    }

    /// The shared revocation list, when a cache is configured
    pub fn revocations(&self) -> Option<&RevocationSet> {
        self.revocations.as_ref()
    }

    pub async fn create_access_token(&self, claims: &Claims) -> DomainResult<String> {
        self.access.create_token(claims).await
    }

    pub async fn create_refresh_token(&self, claims: &Claims) -> DomainResult<String> {
        self.refresh.create_token(claims).await
    }

    pub async fn verify_access_token(&self, token: &str) -> DomainResult<Claims> {
        self.access.verify_token(token).await
    }

    pub async fn verify_refresh_token(&self, token: &str) -> DomainResult<Claims> {
        self.refresh.verify_token(token).await
    }

    pub async fn invalidate_access_token(&self, token: &str) -> DomainResult<()> {
        self.access.invalidate_token(token).await
    }

    pub async fn invalidate_refresh_token(&self, token: &str) -> DomainResult<()> {
        self.refresh.invalidate_token(token).await
    }

    /// Add an access token's `jti` to the revocation list
    pub async fn revoke_access_token(&self, token: &str) -> DomainResult<()> {
        self.access.revoke_token(token).await
    }

    /// Add a refresh token's `jti` to the revocation list
    pub async fn revoke_refresh_token(&self, token: &str) -> DomainResult<()> {
        self.refresh.revoke_token(token).await
    }

    pub fn decode_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.access.decode_token(token)
    }

    pub fn decode_refresh_token(&self, token: &str) -> Result<Claims, TokenError> {
        self.refresh.decode_token(token)
    }

    /// Decode a token of either role without verifying it
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        super::codec::decode_unchecked(token)
    }

    /// Generates an access and refresh token pair carrying the same claims
    ///
    /// Each token gets its own `jti`; a `jti` already present in `claims` is
    /// ignored so the two tokens can be revoked independently.
    pub async fn generate_tokens(&self, claims: &Claims) -> DomainResult<TokenPair> {
        let claims = claims.without_registered();

        let access_token = self.access.create_token(&claims).await?;
        let refresh_token = self.refresh.create_token(&claims).await?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.access.ttl_seconds(),
            self.refresh.ttl_seconds(),
        ))
    }

    /// Exchanges a refresh token for a new pair (single-use rotation)
    ///
    /// The presented refresh token is invalidated before the new pair is
    /// issued, so replaying it fails as revoked. Without a cache the old token
    /// cannot be invalidated and stays usable until it expires.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> DomainResult<TokenPair> {
        let claims = self.refresh.verify_token(refresh_token).await?;

        if self.refresh.has_cache() {
            self.refresh.invalidate_token(refresh_token).await?;
        } else {
            debug!("no token cache configured, refresh token not rotated out");
        }

        let pair = self.generate_tokens(&claims).await?;
        debug!(previous_jti = claims.jti(), "token pair rotated");
        Ok(pair)
    }
}

/// Signing material for the (access, refresh) roles
fn resolve_material(config: &JwtConfig) -> Result<(SigningMaterial, SigningMaterial), ConfigError> {
    let algorithm = parse_algorithm(&config.algorithm)?;

    match algorithm {
        jsonwebtoken::Algorithm::RS256 => {
            let (Some(private_key_path), Some(public_key_path)) =
                (&config.private_key_path, &config.public_key_path)
            else {
                return Err(ConfigError::MissingKeyPath);
            };
            let pair = Rs256KeyPair::new(private_key_path, public_key_path)?;
            Ok((
                SigningMaterial::KeyPair(pair.clone()),
                SigningMaterial::KeyPair(pair),
            ))
        }
        _ => {
            let access = required_secret(config.access_secret.as_deref(), TokenRole::Access)?;
            let refresh = required_secret(config.refresh_secret.as_deref(), TokenRole::Refresh)?;
            Ok((SigningMaterial::secret(access), SigningMaterial::secret(refresh)))
        }
    }
}

fn required_secret(secret: Option<&str>, role: TokenRole) -> Result<&str, ConfigError> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(ConfigError::MissingSecret {
            role: role.to_string(),
        }),
    }
}
