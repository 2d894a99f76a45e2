//! OpenID Connect UserInfo endpoint.
//!
//! `GET /auth/userinfo` returns claims about the authenticated user, gated
//! by the scopes embedded in the presented access token — not by the user's
//! full permission set. A token granted only `openid email` discloses
//! nothing beyond the subject and email claims, whatever the user could
//! otherwise see.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::claims::{ClaimsSource, IdentityClaims, assemble_identity_claims};
use crate::error::AuthError;
use crate::middleware::{AuthState, BearerAuth};

/// State required for the userinfo endpoint.
#[derive(Clone)]
pub struct UserInfoState {
    /// Bearer authentication.
    pub auth_state: AuthState,

    /// External source for organizational claims.
    pub claims_source: Arc<dyn ClaimsSource>,
}

impl UserInfoState {
    /// Creates a new userinfo state.
    pub fn new(auth_state: AuthState, claims_source: Arc<dyn ClaimsSource>) -> Self {
        Self {
            auth_state,
            claims_source,
        }
    }
}

impl axum::extract::FromRef<UserInfoState> for AuthState {
    fn from_ref(state: &UserInfoState) -> Self {
        state.auth_state.clone()
    }
}

/// UserInfo response per OpenID Connect Core 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfoResponse {
    /// Subject identifier (the user's unique identifier).
    pub sub: String,

    /// Scope-gated identity claims.
    #[serde(flatten)]
    pub identity: IdentityClaims,
}

/// Handler for `GET /auth/userinfo`.
///
/// # Errors
///
/// - 401 if the token is missing, invalid, or expired
/// - 400 `invalid_scope` if the token lacks the `openid` scope
pub async fn userinfo_handler(
    State(state): State<UserInfoState>,
    BearerAuth(auth): BearerAuth,
) -> Result<Json<UserInfoResponse>, AuthError> {
    let scopes = auth.scopes();

    if !scopes.openid {
        return Err(AuthError::invalid_scope(
            "The openid scope is required for the userinfo endpoint",
        ));
    }

    let identity =
        assemble_identity_claims(&auth.user, &scopes, state.claims_source.as_ref()).await?;

    Ok(Json(UserInfoResponse {
        sub: auth.claims.sub.clone(),
        identity,
    }))
}
