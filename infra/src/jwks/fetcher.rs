//! Fetch-through JWKS loader

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tracing::{debug, warn};

use tg_core::cache::KeySetCache;

/// Fetcher settings
#[derive(Debug, Clone)]
pub struct JwksFetcherConfig {
    /// How long a fetched key set is served from cache (default: 1 hour)
    pub ttl_seconds: u64,

    /// HTTP request timeout (default: 10 seconds)
    pub request_timeout: Duration,

    /// Maximum accepted response size in bytes (default: 1 MB)
    pub max_response_size: usize,
}

impl Default for JwksFetcherConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            request_timeout: Duration::from_secs(10),
            max_response_size: 1024 * 1024,
        }
    }
}

impl JwksFetcherConfig {
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Errors raised while loading a key set
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// The request did not complete
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The provider answered with a non-success status
    #[error("JWKS endpoint {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The body is not a JWKS document
    #[error("Failed to parse JWKS from {url}: {message}")]
    Parse { url: String, message: String },

    /// The response exceeded the configured limit
    #[error("JWKS response exceeds {max_size} bytes")]
    ResponseTooLarge { max_size: usize },

    /// No published key carries the requested id
    #[error("Key not found: {kid}")]
    KeyNotFound { kid: String },

    /// The key cannot be used for verification
    #[error("Invalid key {kid}: {message}")]
    InvalidKey { kid: String, message: String },
}

/// Loads provider key sets through a [`KeySetCache`]
#[derive(Debug, Clone)]
pub struct JwksFetcher {
    http_client: reqwest::Client,
    cache: Arc<KeySetCache>,
    config: JwksFetcherConfig,
}

impl JwksFetcher {
    /// Fetcher with its own cache on the system clock
    pub fn new(config: JwksFetcherConfig) -> Result<Self, JwksError> {
        Self::with_cache(config, Arc::new(KeySetCache::new()))
    }

    /// Fetcher over an existing cache
    pub fn with_cache(config: JwksFetcherConfig, cache: Arc<KeySetCache>) -> Result<Self, JwksError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| JwksError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            cache,
            config,
        })
    }

    /// The cache backing this fetcher, e.g. to register it with a sweeper
    pub fn cache(&self) -> &Arc<KeySetCache> {
        &self.cache
    }

    /// Keys for `provider_url`, fetched only when no live cached copy exists
    pub async fn get_keys(&self, provider_url: &str) -> Result<Vec<Jwk>, JwksError> {
        if let Some(entry) = self.cache.get(provider_url) {
            debug!(provider_url, keys = entry.keys.len(), "JWKS cache hit");
            return Ok(entry.keys);
        }

        debug!(provider_url, "JWKS cache miss");
        self.refresh(provider_url).await
    }

    /// Fetch `provider_url` now, replacing any cached copy
    pub async fn refresh(&self, provider_url: &str) -> Result<Vec<Jwk>, JwksError> {
        debug!(provider_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(provider_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(provider_url, error = %e, "Failed to fetch JWKS");
                JwksError::Network {
                    url: provider_url.to_string(),
                    message: e.to_string(),
                }
            })?;

        if !response.status().is_success() {
            warn!(provider_url, status = response.status().as_u16(), "JWKS endpoint error");
            return Err(JwksError::HttpStatus {
                url: provider_url.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(len) = response.content_length() {
            if len > self.config.max_response_size as u64 {
                return Err(JwksError::ResponseTooLarge {
                    max_size: self.config.max_response_size,
                });
            }
        }

        let body = response.bytes().await.map_err(|e| JwksError::Network {
            url: provider_url.to_string(),
            message: e.to_string(),
        })?;
        if body.len() > self.config.max_response_size {
            return Err(JwksError::ResponseTooLarge {
                max_size: self.config.max_response_size,
            });
        }

        let jwks: JwkSet = serde_json::from_slice(&body).map_err(|e| {
            warn!(provider_url, error = %e, "Failed to parse JWKS");
            JwksError::Parse {
                url: provider_url.to_string(),
                message: e.to_string(),
            }
        })?;

        debug!(
            provider_url,
            keys = jwks.keys.len(),
            ttl = self.config.ttl_seconds,
            "Cached JWKS"
        );
        self.cache
            .set(provider_url, jwks.keys.clone(), self.config.ttl_seconds);

        Ok(jwks.keys)
    }

    /// Key `kid` from `provider_url`
    ///
    /// A cached set that lacks `kid` is refetched once, so keys rotated in
    /// by the provider are picked up before the TTL runs out.
    pub async fn find_key(&self, provider_url: &str, kid: &str) -> Result<Jwk, JwksError> {
        if let Some(entry) = self.cache.get(provider_url) {
            if let Some(jwk) = entry.find(kid) {
                return Ok(jwk.clone());
            }
        }

        self.refresh(provider_url)
            .await?
            .into_iter()
            .find(|jwk| jwk.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| JwksError::KeyNotFound {
                kid: kid.to_string(),
            })
    }

    /// Verification key for `kid` from `provider_url`
    pub async fn decoding_key(&self, provider_url: &str, kid: &str) -> Result<DecodingKey, JwksError> {
        let jwk = self.find_key(provider_url, kid).await?;
        DecodingKey::from_jwk(&jwk).map_err(|e| JwksError::InvalidKey {
            kid: kid.to_string(),
            message: e.to_string(),
        })
    }
}
