//! Algorithm-aware signing, verification and unchecked decoding

use std::collections::HashSet;
use std::sync::Arc;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::config::SigningMaterial;
use crate::clock::Clock;
use crate::domain::{Claims, AUD_CLAIM, EXP_CLAIM, IAT_CLAIM, ISS_CLAIM};
use crate::errors::TokenError;

/// Signs and verifies tokens with exactly one algorithm
///
/// Verification rejects a token whose header names any other algorithm, so a
/// token signed HS256 with the RS256 public key as the secret never passes an
/// RS256 codec. Expiry is checked against the injected [`Clock`] with no
/// leeway: a token is expired once `now >= exp`.
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: u64,
    issuer: Option<String>,
    audience: Option<String>,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("expires_in", &self.expires_in)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl TokenCodec {
    /// Codec signing tokens that expire `expires_in` seconds after signing
    pub fn new(material: &SigningMaterial, expires_in: u64, clock: Arc<dyn Clock>) -> Self {
        let algorithm = material.algorithm();
        Self {
            algorithm,
            encoding_key: material.encoding_key(),
            decoding_key: material.decoding_key(),
            expires_in,
            issuer: None,
            audience: None,
            validation: build_validation(algorithm, None, None),
            clock,
        }
    }

    /// Stamp `iss` when signing and require it when verifying
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self.rebuild_validation();
        self
    }

    /// Stamp `aud` when signing and require it when verifying
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self.rebuild_validation();
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    /// Sign `claims`, stamping `iat`, `exp` and any configured `iss`/`aud`
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let now = self.clock.unix_seconds();
        let lifetime = i64::try_from(self.expires_in).unwrap_or(i64::MAX);

        let mut claims = claims.clone();
        claims.insert(IAT_CLAIM, now);
        claims.set_exp(now.saturating_add(lifetime));
        if let Some(issuer) = &self.issuer {
            claims.insert(ISS_CLAIM, issuer.clone());
        }
        if let Some(audience) = &self.audience {
            claims.insert(AUD_CLAIM, audience.clone());
        }

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(|e| {
            TokenError::TokenGenerationFailed {
                message: e.to_string(),
            }
        })
    }

    /// Check algorithm, signature, registered claims and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| self.map_error(e))?;

        let exp = data.claims.exp().ok_or_else(|| TokenError::InvalidClaims {
            reason: "exp must be a number".to_string(),
        })?;
        if self.clock.unix_seconds() >= exp {
            return Err(TokenError::TokenExpired);
        }

        Ok(data.claims)
    }

    /// Parse the payload without checking signature, algorithm or expiry
    ///
    /// Only for reading metadata such as `jti`; never authorize on the result.
    pub fn decode_unchecked(&self, token: &str) -> Result<Claims, TokenError> {
        decode_unchecked(token)
    }

    fn rebuild_validation(&mut self) {
        self.validation = build_validation(
            self.algorithm,
            self.issuer.as_deref(),
            self.audience.as_deref(),
        );
    }

    fn map_error(&self, error: JwtError) -> TokenError {
        match error.kind() {
            ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch {
                expected: format!("{:?}", self.algorithm),
            },
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::TokenExpired,
            ErrorKind::InvalidIssuer => TokenError::InvalidClaims {
                reason: "issuer mismatch".to_string(),
            },
            ErrorKind::InvalidAudience => TokenError::InvalidClaims {
                reason: "audience mismatch".to_string(),
            },
            ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim {
                claim: claim.clone(),
            },
            _ => TokenError::InvalidTokenFormat {
                reason: error.to_string(),
            },
        }
    }
}

/// Parse a token's payload without any verification
pub fn decode_unchecked(token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::InvalidTokenFormat {
            reason: e.to_string(),
        })
}

fn build_validation(algorithm: Algorithm, issuer: Option<&str>, audience: Option<&str>) -> Validation {
    let mut validation = Validation::new(algorithm);
    // Expiry is checked against the injected clock after decoding.
    validation.validate_exp = false;
    validation.leeway = 0;

    let mut required = HashSet::from([EXP_CLAIM.to_string()]);
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
        required.insert(ISS_CLAIM.to_string());
    }
    match audience {
        Some(audience) => {
            validation.set_audience(&[audience]);
            required.insert(AUD_CLAIM.to_string());
        }
        None => validation.validate_aud = false,
    }
    validation.required_spec_claims = required;
    validation
}
