//! Domain layer containing the token payload and lifecycle types.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
