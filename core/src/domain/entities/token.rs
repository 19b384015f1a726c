//! Token entities: the signed payload, token roles and issued pairs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique token identifier claim
pub const JTI_CLAIM: &str = "jti";

/// Expiry claim (seconds since the Unix epoch)
pub const EXP_CLAIM: &str = "exp";

/// Issued-at claim
pub const IAT_CLAIM: &str = "iat";

/// Issuer claim
pub const ISS_CLAIM: &str = "iss";

/// Audience claim
pub const AUD_CLAIM: &str = "aud";

/// Claims stamped by the signer rather than supplied by the caller
pub const REGISTERED_CLAIMS: [&str; 5] = [JTI_CLAIM, EXP_CLAIM, IAT_CLAIM, ISS_CLAIM, AUD_CLAIM];

/// Token payload: application-defined claims plus the registered ones
///
/// Serializes as a flat JSON object, so `{"userId":"1"}` signed by a manager
/// decodes back to `{"userId":"1","jti":"…","exp":…,"iat":…}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Add or replace a claim, returning `self` for chaining
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a claim
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The token identifier, when present as a non-empty string
    pub fn jti(&self) -> Option<&str> {
        self.0
            .get(JTI_CLAIM)
            .and_then(Value::as_str)
            .filter(|jti| !jti.is_empty())
    }

    pub fn set_jti(&mut self, jti: impl Into<String>) {
        self.insert(JTI_CLAIM, jti.into());
    }

    /// Expiry as whole seconds since the Unix epoch
    pub fn exp(&self) -> Option<i64> {
        self.numeric(EXP_CLAIM)
    }

    pub fn set_exp(&mut self, exp: i64) {
        self.insert(EXP_CLAIM, exp);
    }

    /// Issued-at as whole seconds since the Unix epoch
    pub fn iat(&self) -> Option<i64> {
        self.numeric(IAT_CLAIM)
    }

    pub fn iss(&self) -> Option<&str> {
        self.0.get(ISS_CLAIM).and_then(Value::as_str)
    }

    /// Copy of the application claims with every registered claim removed
    pub fn without_registered(&self) -> Self {
        let mut claims = self.clone();
        for name in REGISTERED_CLAIMS {
            claims.0.remove(name);
        }
        claims
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    fn numeric(&self, name: &str) -> Option<i64> {
        let value = self.0.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|seconds| seconds.floor() as i64))
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Claims> for Value {
    fn from(claims: Claims) -> Self {
        Value::Object(claims.0)
    }
}

/// Which of the two token managers a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenRole {
    Access,
    Refresh,
}

impl TokenRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRole::Access => "access",
            TokenRole::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token pair returned after issuance or rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token lifetime in seconds
    pub access_expires_in: u64,

    /// Refresh token lifetime in seconds
    pub refresh_expires_in: u64,
}

impl TokenPair {
    pub fn new(
        access_token: String,
        refresh_token: String,
        access_expires_in: u64,
        refresh_expires_in: u64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            access_expires_in,
            refresh_expires_in,
        }
    }
}

/// Key prefix of per-token invalidation markers
pub const MARKER_KEY_PREFIX: &str = "token:";

/// Per-token cache entry written at issuance and flipped on invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationMarker {
    pub invalidate: bool,
}

impl InvalidationMarker {
    /// Marker written when a token is issued
    pub fn issued() -> Self {
        Self { invalidate: false }
    }

    /// Marker written when a token is invalidated
    pub fn invalidated() -> Self {
        Self { invalidate: true }
    }

    /// Cache key of the marker for `jti`
    pub fn key(jti: &str) -> String {
        format!("{}{}", MARKER_KEY_PREFIX, jti)
    }
}
