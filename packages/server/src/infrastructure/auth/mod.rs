//! Token verification.

pub mod jwt;

pub use jwt::{AccessClaims, JwtAuthVerifier, extract_bearer_token};
