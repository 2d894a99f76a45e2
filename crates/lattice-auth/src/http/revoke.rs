//! Token revocation endpoint (RFC 7009).
//!
//! `POST /auth/revoke` accepts an opaque token value, looks it up by hash in
//! the refresh token store, and revokes it if found. Per RFC 7009 the
//! endpoint returns 200 whether or not the token existed — a different
//! answer would leak which values are live tokens.

use std::sync::Arc;

use axum::{Form, Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::token::service::TokenService;

/// State required for the revocation endpoint.
#[derive(Clone)]
pub struct RevocationState {
    /// Token service for performing revocation.
    pub token_service: Arc<TokenService>,
}

impl RevocationState {
    /// Creates a new revocation state.
    pub fn new(token_service: Arc<TokenService>) -> Self {
        Self { token_service }
    }
}

/// Form parameters for the revocation endpoint (RFC 7009 §2.1).
#[derive(Debug, Deserialize)]
pub struct RevocationForm {
    /// The token to revoke.
    pub token: String,

    /// Optional hint about the token type. Access tokens here are stateless
    /// JWTs, so only refresh tokens are revocable and the hint is ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Handler for `POST /auth/revoke`.
///
/// Always returns 200 on a well-formed request; unknown tokens are an
/// intentional non-error and no stored state changes for them.
///
/// # Errors
///
/// Returns 500 only when the storage operation itself fails.
pub async fn revoke_handler(
    State(state): State<RevocationState>,
    Form(form): Form<RevocationForm>,
) -> Result<impl IntoResponse, AuthError> {
    let _ = form.token_type_hint;

    let revoked = state.token_service.revoke_by_value(&form.token).await?;
    if revoked.is_none() {
        tracing::debug!("Revocation requested for an unknown token");
    }

    Ok(Json(json!({ "message": "Token revoked" })))
}
