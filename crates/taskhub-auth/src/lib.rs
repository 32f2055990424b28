//! # taskhub-auth
//!
//! Verification of the HS256 access tokens minted by the identity service.
//!
//! - `jwt`: claims, token validation, and token minting for tools and tests

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
