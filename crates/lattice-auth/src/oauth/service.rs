//! OAuth authorization service.
//!
//! This module provides the service that handles OAuth 2.0 authorization
//! requests: it validates the request, decides how failures are reported
//! (directly, or by redirecting back to the client), and issues
//! authorization codes for authenticated users.
//!
//! # Validation Order
//!
//! 1. `response_type` must be "code"
//! 2. The client must exist and be active
//! 3. The `redirect_uri` must exactly match a registered URI
//! 4. Every requested scope must be allowed for the client
//! 5. Public clients must supply a PKCE challenge
//!
//! Failures in steps 1-3 happen before the redirect URI can be trusted and
//! are reported directly; failures after that point redirect back to the
//! client with `error` and `state` parameters.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::{
    AuthorizationError, AuthorizationErrorCode, AuthorizationRequest, AuthorizationResponse,
    AuthorizeDecision, AuthorizeRejection,
};
use crate::oauth::code::AuthorizationCode;
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::storage::client::ClientStorage;
use crate::storage::code::AuthorizationCodeStorage;

/// Configuration for the authorization service.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    /// Authorization code lifetime.
    /// Default: 10 minutes, per the OAuth 2.0 recommendation.
    pub code_lifetime: Duration,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::minutes(10),
        }
    }
}

impl AuthorizationConfig {
    /// Builds the configuration from the auth configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            code_lifetime: Duration::seconds(
                config.oauth.authorization_code_lifetime.as_secs() as i64
            ),
        }
    }

    /// Sets the authorization code lifetime.
    #[must_use]
    pub fn with_code_lifetime(mut self, lifetime: Duration) -> Self {
        self.code_lifetime = lifetime;
        self
    }
}

/// Authorization service for handling OAuth 2.0 authorization requests.
pub struct AuthorizationService {
    /// Client storage for looking up registered clients.
    client_storage: Arc<dyn ClientStorage>,

    /// Storage for issued authorization codes.
    code_storage: Arc<dyn AuthorizationCodeStorage>,

    /// Service configuration.
    config: AuthorizationConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(
        client_storage: Arc<dyn ClientStorage>,
        code_storage: Arc<dyn AuthorizationCodeStorage>,
        config: AuthorizationConfig,
    ) -> Self {
        Self {
            client_storage,
            code_storage,
            config,
        }
    }

    /// Processes an authorization request.
    ///
    /// When `user_id` is `None` the request is validated but no code is
    /// issued; the caller redirects the user-agent to the login page and the
    /// browser retries after authentication.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeRejection::Direct`] while the redirect URI is
    /// untrusted (bad response type, unknown/inactive client, unregistered
    /// redirect URI) and [`AuthorizeRejection::Redirect`] afterwards
    /// (disallowed scope, missing PKCE for a public client).
    ///
    /// # Security
    ///
    /// - The authorization code value is never logged
    /// - The redirect URI must exactly match a registered URI
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        user_id: Option<Uuid>,
    ) -> Result<AuthorizeDecision, AuthorizeRejection> {
        // 1. Validate response_type. The client is not resolved yet, so this
        //    cannot be reported via redirect.
        if request.response_type != "code" {
            return Err(AuthError::unsupported_response_type(&request.response_type).into());
        }

        // 2. Resolve the client
        let client = self
            .client_storage
            .find_by_client_id(&request.client_id)
            .await
            .map_err(AuthorizeRejection::Direct)?
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is inactive").into());
        }

        // 3. Verify the redirect URI against the registration
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::invalid_grant("Redirect URI is not registered").into());
        }

        // The redirect URI is trusted from here on; remaining failures are
        // reported by redirecting back to the client.
        let redirect_uri = request.redirect_uri.clone();

        // 4. Validate scopes (defaulting to "openid")
        let scope = request.effective_scope();
        if !client.are_scopes_allowed(scope.split_whitespace()) {
            return Err(self.error_redirect(
                AuthorizationErrorCode::InvalidScope,
                "Requested scope is not allowed for this client",
                request,
                redirect_uri,
            ));
        }

        // 5. Enforce PKCE presence for public clients, before any code exists
        if client.requires_pkce() && request.code_challenge.is_none() {
            return Err(self.error_redirect(
                AuthorizationErrorCode::InvalidRequest,
                "PKCE code_challenge is required for public clients",
                request,
                redirect_uri,
            ));
        }

        // Validate the challenge and method when supplied
        let (code_challenge, code_challenge_method) = match request.code_challenge.as_ref() {
            Some(challenge) => {
                let challenge = match PkceChallenge::new(challenge.clone()) {
                    Ok(challenge) => challenge,
                    Err(e) => {
                        return Err(self.error_redirect(
                            AuthorizationErrorCode::InvalidRequest,
                            format!("Invalid PKCE challenge: {e}"),
                            request,
                            redirect_uri,
                        ));
                    }
                };

                // Method defaults to S256 when a challenge is present
                let method = match request.code_challenge_method.as_deref() {
                    Some(method) => match PkceChallengeMethod::parse(method) {
                        Ok(method) => method,
                        Err(e) => {
                            return Err(self.error_redirect(
                                AuthorizationErrorCode::InvalidRequest,
                                e.to_string(),
                                request,
                                redirect_uri,
                            ));
                        }
                    },
                    None => PkceChallengeMethod::default(),
                };

                (
                    Some(challenge.into_inner()),
                    Some(method.as_str().to_string()),
                )
            }
            None => (None, None),
        };

        // 6. No session: the request is fine, but the user must log in first
        let Some(user_id) = user_id else {
            return Ok(AuthorizeDecision::LoginRequired);
        };

        // 7. Issue the code, bound to the authenticated user
        let now = OffsetDateTime::now_utc();
        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: AuthorizationCode::generate_code(),
            client_id: client.client_id.clone(),
            user_id,
            redirect_uri: redirect_uri.clone(),
            scope,
            nonce: request.nonce.clone(),
            code_challenge,
            code_challenge_method,
            created_at: now,
            expires_at: now + self.config.code_lifetime,
            consumed_at: None,
        };

        self.code_storage
            .create(&code)
            .await
            .map_err(AuthorizeRejection::Direct)?;

        tracing::info!(
            client_id = %client.client_id,
            user_id = %user_id,
            "Authorization code issued"
        );

        Ok(AuthorizeDecision::Issued {
            response: AuthorizationResponse::new(code.code, request.state.clone()),
            redirect_uri,
        })
    }

    fn error_redirect(
        &self,
        code: AuthorizationErrorCode,
        description: impl Into<String>,
        request: &AuthorizationRequest,
        redirect_uri: String,
    ) -> AuthorizeRejection {
        AuthorizeRejection::Redirect {
            error: AuthorizationError::with_description(code, description, request.state.clone()),
            redirect_uri,
        }
    }

    /// Gets the client storage reference.
    #[must_use]
    pub fn client_storage(&self) -> &Arc<dyn ClientStorage> {
        &self.client_storage
    }

    /// Gets the code storage reference.
    #[must_use]
    pub fn code_storage(&self) -> &Arc<dyn AuthorizationCodeStorage> {
        &self.code_storage
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }
}
