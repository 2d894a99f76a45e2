//! Token generation and management.
//!
//! - [`jwt`] - signing keys, JWT encode/decode, JWKS export
//! - [`service`] - code exchange, refresh rotation, portal sessions

pub mod jwt;
pub mod service;

pub use jwt::{
    AccessTokenClaims, IdTokenClaims, Jwk, Jwks, JwtError, JwtService, SigningAlgorithm,
    SigningKeyPair,
};
pub use service::{SessionTokens, TokenConfig, TokenService};
