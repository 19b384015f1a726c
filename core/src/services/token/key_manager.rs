//! RS256 key material for JWT signing and verification

use std::fs;
use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::errors::ConfigError;

/// RS256 key pair shared by the access and refresh token managers
#[derive(Clone)]
pub struct Rs256KeyPair {
    /// Private key for signing JWTs
    encoding_key: EncodingKey,
    /// Public key for verifying JWTs
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for Rs256KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rs256KeyPair").finish_non_exhaustive()
    }
}

impl Rs256KeyPair {
    /// Loads a key pair from PEM files
    ///
    /// # Arguments
    ///
    /// * `private_key_path` - Path to the PEM-encoded private key file
    /// * `public_key_path` - Path to the PEM-encoded public key file
    ///
    /// # Returns
    ///
    /// * `Ok(Rs256KeyPair)` - Both keys were read and parsed
    /// * `Err(ConfigError::KeyLoad)` - A file is unreadable or not an RSA PEM key
    pub fn new<P: AsRef<Path>>(private_key_path: P, public_key_path: P) -> Result<Self, ConfigError> {
        let private_key_pem = read_key(private_key_path.as_ref(), "private")?;
        let public_key_pem = read_key(public_key_path.as_ref(), "public")?;

        Self::from_pem_bytes(&private_key_pem, &public_key_pem)
    }

    /// Builds a key pair from PEM text (embedded keys, tests)
    pub fn from_pem(private_key_pem: &str, public_key_pem: &str) -> Result<Self, ConfigError> {
        Self::from_pem_bytes(private_key_pem.as_bytes(), public_key_pem.as_bytes())
    }

    fn from_pem_bytes(private_key_pem: &[u8], public_key_pem: &[u8]) -> Result<Self, ConfigError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem).map_err(|e| {
            ConfigError::KeyLoad {
                message: format!("Invalid private key format: {}", e),
            }
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem).map_err(|e| {
            ConfigError::KeyLoad {
                message: format!("Invalid public key format: {}", e),
            }
        })?;

        Ok(Self {
            encoding_key,
            decoding_key,
        })
    }

    /// Returns the encoding key for signing JWTs
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the decoding key for verifying JWTs
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

fn read_key(path: &Path, which: &str) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|e| ConfigError::KeyLoad {
        message: format!("Failed to read {} key {}: {}", which, path.display(), e),
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
    use serde_json::{json, Value};

    use super::*;

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_load_from_files() {
        let pair = Rs256KeyPair::new(fixture("primary_private.pem"), fixture("primary_public.pem"))
            .unwrap();

        let token = encode(
            &Header::new(Algorithm::RS256),
            &json!({"sub": "1", "exp": 4_102_444_800u64}),
            pair.encoding_key(),
        )
        .unwrap();
        let data = decode::<Value>(&token, pair.decoding_key(), &Validation::new(Algorithm::RS256))
            .unwrap();
        assert_eq!(data.claims["sub"], json!("1"));
    }

    #[test]
    fn test_missing_file() {
        let error = Rs256KeyPair::new(fixture("absent.pem"), fixture("primary_public.pem"))
            .unwrap_err();
        assert!(matches!(error, ConfigError::KeyLoad { .. }));
        assert!(error.to_string().contains("private key"));
    }

    #[test]
    fn test_rejects_non_pem() {
        let error = Rs256KeyPair::from_pem("not a key", "not a key").unwrap_err();
        assert!(matches!(error, ConfigError::KeyLoad { .. }));
    }

    #[test]
    fn test_from_pem_text() {
        let private = std::fs::read_to_string(fixture("other_private.pem")).unwrap();
        let public = std::fs::read_to_string(fixture("other_public.pem")).unwrap();
        assert!(Rs256KeyPair::from_pem(&private, &public).is_ok());
    }
}
