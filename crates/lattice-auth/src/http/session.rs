//! First-party portal session endpoints.
//!
//! `POST /auth/login`, `POST /auth/refresh`, and `POST /auth/logout` for the
//! portal frontend. The access token travels in the JSON response; the
//! refresh token only ever lives in an httpOnly cookie so portal scripts
//! cannot read it.

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::CookieConfig;
use crate::error::AuthError;
use crate::storage::user::User;
use crate::token::service::{SessionTokens, TokenService};

/// State required for the session endpoints.
#[derive(Clone)]
pub struct SessionState {
    /// Token service for issuing and rotating session credentials.
    pub token_service: Arc<TokenService>,

    /// Refresh cookie settings.
    pub cookie: CookieConfig,
}

impl SessionState {
    /// Creates a new session state.
    pub fn new(token_service: Arc<TokenService>, cookie: CookieConfig) -> Self {
        Self {
            token_service,
            cookie,
        }
    }

    fn refresh_cookie(&self, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((self.cookie.name.clone(), value))
            .http_only(true)
            .secure(self.cookie.secure)
            .same_site(SameSite::Lax)
            .path(self.cookie.path.clone())
            .max_age(max_age)
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.cookie.name.clone(), ""))
            .path(self.cookie.path.clone())
            .build()
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,

    /// Password.
    pub password: String,
}

/// Session response body for login and refresh.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The authenticated user.
    pub user: User,

    /// Access token (JWT).
    pub access_token: String,

    /// Token type, always "bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

impl SessionResponse {
    fn from_tokens(tokens: &SessionTokens) -> Self {
        Self {
            user: tokens.user.clone(),
            access_token: tokens.access_token.clone(),
            token_type: "bearer".to_string(),
            expires_in: tokens.expires_in,
        }
    }
}

/// Handler for `POST /auth/login`.
///
/// Authenticates with email and password, returns an access token, and sets
/// the refresh token as an httpOnly cookie.
pub async fn login_handler(
    State(state): State<SessionState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let tokens = state
        .token_service
        .login(&request.email, &request.password)
        .await?;

    let max_age = state.token_service.config().refresh_token_lifetime;
    let jar = jar.add(state.refresh_cookie(tokens.refresh_token.clone(), max_age));

    Ok((jar, Json(SessionResponse::from_tokens(&tokens))))
}

/// Handler for `POST /auth/refresh`.
///
/// Rotates the refresh token from the cookie and re-sets the cookie with the
/// replacement. The rotation commits before the response is written, so the
/// old cookie value is dead even if the response is lost.
pub async fn refresh_session_handler(
    State(state): State<SessionState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let raw_token = jar
        .get(&state.cookie.name)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AuthError::unauthorized("Refresh token not found"))?;

    let tokens = state.token_service.refresh_session(&raw_token).await?;

    let max_age = state.token_service.config().refresh_token_lifetime;
    let jar = jar.add(state.refresh_cookie(tokens.refresh_token.clone(), max_age));

    Ok((jar, Json(SessionResponse::from_tokens(&tokens))))
}

/// Handler for `POST /auth/logout`.
///
/// Revokes the refresh token from the cookie (an unknown token is not an
/// error) and clears the cookie.
pub async fn logout_handler(
    State(state): State<SessionState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    if let Some(cookie) = jar.get(&state.cookie.name) {
        let raw_token = cookie.value().to_string();
        if let Some(revoked) = state.token_service.revoke_by_value(&raw_token).await? {
            state.token_service.record_logout(revoked.user_id).await;
        }
    }

    let jar = jar.remove(state.removal_cookie());
    Ok((jar, Json(json!({ "message": "Logged out" }))))
}
