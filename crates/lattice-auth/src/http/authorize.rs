//! OAuth 2.0 authorization endpoint handler.
//!
//! Handles `GET /auth/authorize`. The outcome is always one of:
//!
//! - 302 back to the client with `code` and `state`
//! - 302 to the portal login page with a `return_to` parameter
//! - 302 back to the client with `error` and `state` (trusted redirect URI)
//! - a direct JSON error (untrusted redirect URI)

use std::sync::Arc;

use axum::extract::{OriginalUri, Query, State};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::error::AuthError;
use crate::middleware::{AuthState, OptionalBearerAuth};
use crate::oauth::authorize::{AuthorizationRequest, AuthorizeDecision, AuthorizeRejection};
use crate::oauth::service::AuthorizationService;

use super::found;

/// State required for the authorization endpoint.
#[derive(Clone)]
pub struct AuthorizeState {
    /// The authorization request state machine.
    pub authorization_service: Arc<AuthorizationService>,

    /// Bearer authentication for detecting an existing session.
    pub auth_state: AuthState,

    /// Portal login page; unauthenticated users are sent here.
    pub frontend_login_url: String,
}

impl AuthorizeState {
    /// Creates a new authorize state.
    pub fn new(
        authorization_service: Arc<AuthorizationService>,
        auth_state: AuthState,
        frontend_login_url: impl Into<String>,
    ) -> Self {
        Self {
            authorization_service,
            auth_state,
            frontend_login_url: frontend_login_url.into(),
        }
    }
}

impl axum::extract::FromRef<AuthorizeState> for AuthState {
    fn from_ref(state: &AuthorizeState) -> Self {
        state.auth_state.clone()
    }
}

/// Handler for `GET /auth/authorize`.
///
/// Validates the authorization request and, for an authenticated user,
/// issues a single-use code bound to that user. Failures before the
/// redirect URI is verified are returned directly; afterwards the
/// user-agent is always sent back to the client.
pub async fn authorize_handler(
    State(state): State<AuthorizeState>,
    OptionalBearerAuth(auth): OptionalBearerAuth,
    OriginalUri(original_uri): OriginalUri,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    let user_id = auth.map(|context| context.user.id);

    match state
        .authorization_service
        .authorize(&request, user_id)
        .await
    {
        Ok(AuthorizeDecision::Issued {
            response,
            redirect_uri,
        }) => match response.to_redirect_url(&redirect_uri) {
            Ok(location) => found(&location),
            Err(e) => {
                AuthError::internal(format!("Registered redirect URI is unparseable: {e}"))
                    .into_response()
            }
        },

        Ok(AuthorizeDecision::LoginRequired) => {
            match login_redirect(&state.frontend_login_url, &original_uri.to_string()) {
                Ok(location) => found(&location),
                Err(e) => AuthError::internal(format!("Login URL is unparseable: {e}"))
                    .into_response(),
            }
        }

        Err(AuthorizeRejection::Direct(error)) => {
            tracing::warn!(
                client_id = %request.client_id,
                error = %error,
                "Authorization request rejected"
            );
            error.into_response()
        }

        Err(AuthorizeRejection::Redirect {
            error,
            redirect_uri,
        }) => match error.to_redirect_url(&redirect_uri) {
            Ok(location) => found(&location),
            Err(e) => {
                AuthError::internal(format!("Registered redirect URI is unparseable: {e}"))
                    .into_response()
            }
        },
    }
}

/// Builds the login redirect, preserving the original authorization request
/// so the browser can retry it after authentication.
fn login_redirect(login_url: &str, return_to: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(login_url)?;
    url.query_pairs_mut().append_pair("return_to", return_to);
    Ok(url.to_string())
}
