//! Error types for configuration, token verification and cache access
//!
//! Every verification failure maps to one of four [`TokenErrorKind`]s. Callers
//! treat them all as "unauthenticated"; the kind and [`TokenError::code`] exist
//! so that logs can tell them apart.

use std::fmt;

use thiserror::Error;

/// Configuration errors, raised synchronously while constructing token components
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing {role} token secret for HS256")]
    MissingSecret { role: String },

    #[error("RS256 requires both a private key and a public key")]
    MissingKeyPath,

    #[error("Failed to load signing key: {message}")]
    KeyLoad { message: String },

    #[error("Invalid expiry format: {value}")]
    InvalidExpiry { value: String },

    #[error("Unsupported signing algorithm: {value}")]
    UnsupportedAlgorithm { value: String },

    #[error("Token cache not configured; cannot {operation}")]
    CacheNotConfigured { operation: &'static str },
}

impl ConfigError {
    /// Stable error code for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::MissingSecret { .. } => "MISSING_SECRET",
            ConfigError::MissingKeyPath => "MISSING_KEY_PATH",
            ConfigError::KeyLoad { .. } => "KEY_LOAD_FAILED",
            ConfigError::InvalidExpiry { .. } => "INVALID_EXPIRY",
            ConfigError::UnsupportedAlgorithm { .. } => "UNSUPPORTED_ALGORITHM",
            ConfigError::CacheNotConfigured { .. } => "CACHE_NOT_CONFIGURED",
        }
    }
}

/// Which revocation mechanism rejected a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationSource {
    /// The per-token `token:<jti>` marker carried `invalidate: true`
    InvalidationMarker,
    /// The identifier is present in the revocation list
    RevocationList,
}

impl fmt::Display for RevocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationSource::InvalidationMarker => f.write_str("invalidated"),
            RevocationSource::RevocationList => f.write_str("blacklisted"),
        }
    }
}

/// Token-level errors
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token format: {reason}")]
    InvalidTokenFormat { reason: String },

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token algorithm does not match the configured {expected}")]
    AlgorithmMismatch { expected: String },

    #[error("Invalid token claims: {reason}")]
    InvalidClaims { reason: String },

    #[error("Token revoked ({by})")]
    TokenRevoked { by: RevocationSource },

    #[error("Missing required claim: {claim}")]
    MissingClaim { claim: String },

    #[error("Token generation failed: {message}")]
    TokenGenerationFailed { message: String },
}

/// Coarse classification of [`TokenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    /// Malformed token, wrong algorithm, bad signature or claims
    SignatureOrFormat,
    /// The expiry claim has passed
    Expired,
    /// Rejected by the invalidation marker or the revocation list
    Revoked,
    /// Signing failed
    Issuance,
}

impl TokenError {
    /// Classify this error
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::TokenExpired => TokenErrorKind::Expired,
            TokenError::TokenRevoked { .. } => TokenErrorKind::Revoked,
            TokenError::TokenGenerationFailed { .. } => TokenErrorKind::Issuance,
            TokenError::InvalidTokenFormat { .. }
            | TokenError::InvalidSignature
            | TokenError::AlgorithmMismatch { .. }
            | TokenError::InvalidClaims { .. }
            | TokenError::MissingClaim { .. } => TokenErrorKind::SignatureOrFormat,
        }
    }

    /// Stable error code for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::TokenExpired => "TOKEN_EXPIRED",
            TokenError::InvalidTokenFormat { .. } => "INVALID_TOKEN_FORMAT",
            TokenError::InvalidSignature => "INVALID_SIGNATURE",
            TokenError::AlgorithmMismatch { .. } => "ALGORITHM_MISMATCH",
            TokenError::InvalidClaims { .. } => "INVALID_CLAIMS",
            TokenError::TokenRevoked { .. } => "TOKEN_REVOKED",
            TokenError::MissingClaim { .. } => "MISSING_CLAIM",
            TokenError::TokenGenerationFailed { .. } => "TOKEN_GENERATION_FAILED",
        }
    }
}

/// Errors raised by an [`ExpiringStore`](crate::cache::ExpiringStore) backend
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache {operation} on '{key}' failed: {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Cache {operation} on '{key}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        key: String,
        timeout_ms: u64,
    },

    #[error("Cache value at '{key}' could not be encoded or decoded: {message}")]
    Serialization { key: String, message: String },
}

impl CacheError {
    /// Stable error code for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::Backend { .. } => "CACHE_BACKEND_ERROR",
            CacheError::Timeout { .. } => "CACHE_TIMEOUT",
            CacheError::Serialization { .. } => "CACHE_SERIALIZATION_ERROR",
        }
    }
}
