//! JWKS endpoint handler.
//!
//! Provides `GET /.well-known/jwks.json` so relying parties can verify JWTs
//! issued by this server. The document contains only public key material.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::token::jwt::JwtService;

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// The JWT service holding the signing key.
    pub jwt_service: Arc<JwtService>,
}

impl JwksState {
    /// Creates a new JWKS state.
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }
}

/// Handler for `GET /.well-known/jwks.json`.
///
/// Returns 200 with the JWKS document and a cache header; the key is static
/// for the process lifetime, so clients may cache it for an hour.
pub async fn jwks_handler(State(state): State<JwksState>) -> impl IntoResponse {
    let jwks = state.jwt_service.jwks();
    (
        [(header::CACHE_CONTROL, "public, max-age=3600")],
        Json(jwks),
    )
}
