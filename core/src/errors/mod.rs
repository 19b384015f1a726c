//! Error types and error handling.

mod types;

// Re-export all error types
pub use types::{CacheError, ConfigError, RevocationSource, TokenError, TokenErrorKind};

use thiserror::Error;

/// Top-level error for every token operation
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl DomainError {
    /// Stable error code for logs and responses
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Config(e) => e.code(),
            DomainError::Token(e) => e.code(),
            DomainError::Cache(e) => e.code(),
        }
    }

    /// The token error, if this is one
    pub fn as_token_error(&self) -> Option<&TokenError> {
        match self {
            DomainError::Token(e) => Some(e),
            _ => None,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
