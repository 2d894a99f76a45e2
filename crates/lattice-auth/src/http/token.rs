//! OAuth 2.0 token endpoint handler.
//!
//! Handles `POST /auth/token` with `application/x-www-form-urlencoded`
//! bodies for the `authorization_code` and `refresh_token` grants.
//!
//! # Example
//!
//! ```ignore
//! POST /auth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=authorization_code
//! &code=SplxlOBeZQQYbYS6WxSbIA
//! &redirect_uri=https://app.example.com/callback
//! &code_verifier=dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk
//! &client_id=lat_app
//! ```

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::oauth::client_auth::{ClientAuth, authenticate_client};
use crate::oauth::token::{TokenError, TokenErrorCode, TokenRequest, TokenResponse};
use crate::storage::client::ClientStorage;
use crate::token::service::TokenService;

/// State required for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// Token service for processing grants.
    pub token_service: Arc<TokenService>,

    /// Client storage for authenticating clients.
    pub client_storage: Arc<dyn ClientStorage>,
}

impl TokenState {
    /// Creates a new token state.
    pub fn new(token_service: Arc<TokenService>, client_storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            token_service,
            client_storage,
        }
    }
}

/// OAuth 2.0 token endpoint handler.
///
/// Authenticates the client (HTTP Basic, body credentials, or bare
/// `client_id` for public clients) and dispatches on `grant_type`.
pub async fn token_handler(
    State(state): State<TokenState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let auth = ClientAuth::extract(
        &headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    );

    let client = match authenticate_client(&state.client_storage, auth).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Client authentication failed");
            return token_error_response(e);
        }
    };

    let result = match request.grant_type.as_str() {
        "authorization_code" => state.token_service.exchange_code(&request, &client).await,
        "refresh_token" => state.token_service.refresh(&request, &client).await,
        other => {
            warn!(grant_type = other, "Unsupported grant type");
            Err(AuthError::unsupported_grant_type(other))
        }
    };

    match result {
        Ok(response) => {
            info!(
                client_id = %client.client_id,
                grant_type = %request.grant_type,
                "Token issued"
            );
            token_success_response(response)
        }
        Err(e) => {
            warn!(
                client_id = %client.client_id,
                grant_type = %request.grant_type,
                error = %e,
                "Token request failed"
            );
            token_error_response(e)
        }
    }
}

/// Builds a successful token response.
///
/// Token responses must never be cached (RFC 6749 §5.1).
fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [("Cache-Control", "no-store"), ("Pragma", "no-cache")],
        Json(response),
    )
        .into_response()
}

/// Builds an OAuth error body for the token endpoint.
pub(crate) fn token_error_response(error: AuthError) -> Response {
    let (code, description) = match &error {
        AuthError::InvalidClient { message } => (TokenErrorCode::InvalidClient, message.clone()),
        AuthError::InvalidGrant { message } => (TokenErrorCode::InvalidGrant, message.clone()),
        AuthError::InvalidScope { message } => (TokenErrorCode::InvalidScope, message.clone()),
        AuthError::InvalidRequest { message } => (TokenErrorCode::InvalidRequest, message.clone()),
        AuthError::UnsupportedGrantType { grant_type } => (
            TokenErrorCode::UnsupportedGrantType,
            format!("Grant type '{grant_type}' is not supported"),
        ),
        AuthError::PkceVerificationFailed => (
            TokenErrorCode::InvalidGrant,
            "PKCE verification failed".to_string(),
        ),
        e if e.is_server_error() => {
            tracing::error!(error = %e, "Token endpoint internal error");
            (TokenErrorCode::ServerError, "Internal server error".to_string())
        }
        other => (TokenErrorCode::InvalidRequest, other.to_string()),
    };

    let status = StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    let body = TokenError::with_description(code, description);

    (
        status,
        [("Cache-Control", "no-store"), ("Pragma", "no-cache")],
        Json(body),
    )
        .into_response()
}
