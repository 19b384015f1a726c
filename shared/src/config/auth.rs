//! Token signing and verification configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// Expiry as written in configuration: raw seconds or `<integer><unit>`
///
/// The value is kept verbatim here; it is parsed (and rejected if malformed)
/// when the token service is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpirySetting {
    /// Number of seconds
    Seconds(u64),
    /// Unit-suffixed string such as `15m`, `1h` or `7d`
    Text(String),
}

impl From<u64> for ExpirySetting {
    fn from(seconds: u64) -> Self {
        ExpirySetting::Seconds(seconds)
    }
}

impl From<&str> for ExpirySetting {
    fn from(text: &str) -> Self {
        ExpirySetting::Text(text.to_string())
    }
}

impl From<String> for ExpirySetting {
    fn from(text: String) -> Self {
        ExpirySetting::Text(text)
    }
}

impl fmt::Display for ExpirySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpirySetting::Seconds(seconds) => write!(f, "{}", seconds),
            ExpirySetting::Text(text) => f.write_str(text),
        }
    }
}

/// What verification does when the token metadata cache cannot answer
/// (timeout or backend error).
///
/// There is deliberately no default: deployments must state which way they fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFailurePolicy {
    /// Reject the token as unusable
    FailClosed,
    /// Log and accept the token on the strength of its signature
    FailOpen,
}

impl std::str::FromStr for CacheFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail_closed" | "fail-closed" | "closed" => Ok(CacheFailurePolicy::FailClosed),
            "fail_open" | "fail-open" | "open" => Ok(CacheFailurePolicy::FailOpen),
            other => Err(format!("unknown cache failure policy: {}", other)),
        }
    }
}

/// JWT configuration shared by the access and refresh token roles
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Algorithm for JWT signing: `HS256` (shared secret) or `RS256` (key pair)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// HS256 secret for access tokens
    #[serde(default)]
    pub access_secret: Option<String>,

    /// HS256 secret for refresh tokens
    #[serde(default)]
    pub refresh_secret: Option<String>,

    /// RS256 private key (PEM) path, used for both roles
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// RS256 public key (PEM) path, used for both roles
    #[serde(default)]
    pub public_key_path: Option<String>,

    /// Access token lifetime
    #[serde(default = "default_access_expiry")]
    pub access_expires_in: ExpirySetting,

    /// Refresh token lifetime
    #[serde(default = "default_refresh_expiry")]
    pub refresh_expires_in: ExpirySetting,

    /// JWT issuer claim, stamped and enforced when set
    #[serde(default)]
    pub issuer: Option<String>,

    /// JWT audience claim, stamped and enforced when set
    #[serde(default)]
    pub audience: Option<String>,

    /// Revocation list TTL for callers that do not know a token's remaining lifetime
    #[serde(default = "default_blacklist_ttl")]
    pub blacklist_default_ttl: u64,

    /// Upper bound on a single cache round-trip during token operations
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,

    /// Behaviour when the cache cannot answer during verification
    pub cache_failure_policy: CacheFailurePolicy,
}

impl JwtConfig {
    /// HS256 configuration with one secret per token role
    pub fn hs256(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        cache_failure_policy: CacheFailurePolicy,
    ) -> Self {
        Self {
            algorithm: default_algorithm(),
            access_secret: Some(access_secret.into()),
            refresh_secret: Some(refresh_secret.into()),
            private_key_path: None,
            public_key_path: None,
            access_expires_in: default_access_expiry(),
            refresh_expires_in: default_refresh_expiry(),
            issuer: None,
            audience: None,
            blacklist_default_ttl: default_blacklist_ttl(),
            cache_timeout_ms: default_cache_timeout_ms(),
            cache_failure_policy,
        }
    }

    /// RS256 configuration; the key pair signs and verifies both roles
    pub fn rs256(
        private_key_path: impl Into<String>,
        public_key_path: impl Into<String>,
        cache_failure_policy: CacheFailurePolicy,
    ) -> Self {
        Self {
            algorithm: String::from("RS256"),
            access_secret: None,
            refresh_secret: None,
            private_key_path: Some(private_key_path.into()),
            public_key_path: Some(public_key_path.into()),
            ..Self::hs256("", "", cache_failure_policy)
        }
    }

    /// Set the access token lifetime
    pub fn with_access_expiry(mut self, expiry: impl Into<ExpirySetting>) -> Self {
        self.access_expires_in = expiry.into();
        self
    }

    /// Set the refresh token lifetime
    pub fn with_refresh_expiry(mut self, expiry: impl Into<ExpirySetting>) -> Self {
        self.refresh_expires_in = expiry.into();
        self
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Set the audience claim
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the cache round-trip timeout
    pub fn with_cache_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.cache_timeout_ms = timeout_ms;
        self
    }

    /// Create from flat environment variables
    ///
    /// `JWT_CACHE_FAILURE_POLICY` is required; every other variable has a default.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let cache_failure_policy = std::env::var("JWT_CACHE_FAILURE_POLICY")
            .map_err(|_| {
                config::ConfigError::Message(
                    "JWT_CACHE_FAILURE_POLICY must be set to fail_closed or fail_open".to_string(),
                )
            })?
            .parse::<CacheFailurePolicy>()
            .map_err(config::ConfigError::Message)?;

        let mut config = Self::hs256("", "", cache_failure_policy);
        config.algorithm = std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| default_algorithm());
        config.access_secret = std::env::var("JWT_SECRET").ok();
        config.refresh_secret = std::env::var("JWT_REFRESH_SECRET").ok();
        config.private_key_path = std::env::var("JWT_PRIVATE_KEY_PATH").ok();
        config.public_key_path = std::env::var("JWT_PUBLIC_KEY_PATH").ok();
        if let Ok(expiry) = std::env::var("JWT_ACCESS_TOKEN_EXPIRY") {
            config.access_expires_in = expiry_from_env(expiry);
        }
        if let Ok(expiry) = std::env::var("JWT_REFRESH_TOKEN_EXPIRY") {
            config.refresh_expires_in = expiry_from_env(expiry);
        }
        config.issuer = std::env::var("JWT_ISSUER").ok();
        config.audience = std::env::var("JWT_AUDIENCE").ok();
        config.blacklist_default_ttl = std::env::var("JWT_BLACKLIST_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_blacklist_ttl);
        config.cache_timeout_ms = std::env::var("JWT_CACHE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_cache_timeout_ms);

        Ok(config)
    }
}

fn expiry_from_env(value: String) -> ExpirySetting {
    match value.parse::<u64>() {
        Ok(seconds) => ExpirySetting::Seconds(seconds),
        Err(_) => ExpirySetting::Text(value),
    }
}

fn default_algorithm() -> String {
    String::from("HS256")
}

fn default_access_expiry() -> ExpirySetting {
    ExpirySetting::Text(String::from("15m"))
}

fn default_refresh_expiry() -> ExpirySetting {
    ExpirySetting::Text(String::from("7d"))
}

fn default_blacklist_ttl() -> u64 {
    3600 // 1 hour
}

fn default_cache_timeout_ms() -> u64 {
    500
}
