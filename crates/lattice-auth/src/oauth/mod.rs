//! OAuth 2.0 protocol types and services.
//!
//! - [`authorize`] - authorization endpoint request/response types
//! - [`client_auth`] - token-endpoint client authentication
//! - [`code`] - authorization code records
//! - [`pkce`] - PKCE verifier/challenge handling (RFC 7636)
//! - [`service`] - the authorization request state machine
//! - [`token`] - token endpoint request/response types

pub mod authorize;
pub mod client_auth;
pub mod code;
pub mod pkce;
pub mod service;
pub mod token;

pub use authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    AuthorizeDecision, AuthorizeRejection,
};
pub use client_auth::{ClientAuth, authenticate_client, parse_basic_auth};
pub use code::AuthorizationCode;
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use service::{AuthorizationConfig, AuthorizationService};
pub use token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
