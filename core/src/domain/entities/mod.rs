//! Domain entities representing the token lifecycle.

pub mod token;

// Re-export commonly used types
pub use token::{
    Claims, InvalidationMarker, TokenPair, TokenRole,
    AUD_CLAIM, EXP_CLAIM, IAT_CLAIM, ISS_CLAIM, JTI_CLAIM, MARKER_KEY_PREFIX, REGISTERED_CLAIMS,
};
