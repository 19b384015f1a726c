//! Business services containing the token lifecycle.

pub mod token;

// Re-export commonly used types
pub use token::{
    Rs256KeyPair, SigningMaterial, TokenCodec, TokenManager, TokenManagerOptions, TokenService,
};
