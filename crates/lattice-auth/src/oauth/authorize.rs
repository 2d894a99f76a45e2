//! Authorization endpoint types.
//!
//! This module provides types for the OAuth 2.0 authorization endpoint,
//! including request parsing, response generation, and error handling.
//!
//! # Error Routing
//!
//! The authorization endpoint signals errors two different ways, depending on
//! whether the client's `redirect_uri` has already been verified:
//!
//! - Before the client and redirect URI are trusted (unknown client,
//!   unregistered URI, unsupported response type), the error must be shown
//!   directly — redirecting to an unverified URI would be an open redirect.
//! - After both are verified (scope or PKCE problems), the user-agent must be
//!   returned to the client with `error` and `state` query parameters.
//!
//! [`AuthorizeRejection`] makes that decision explicit at the type level.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Authorization request parameters.
///
/// Received as query string parameters on the authorization endpoint.
///
/// # Example
///
/// ```ignore
/// GET /auth/authorize?
///   response_type=code
///   &client_id=lat_9f8e7d6c
///   &redirect_uri=https://app.example.com/callback
///   &scope=openid profile
///   &state=abc123xyz
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code" for the authorization code flow.
    pub response_type: String,

    /// Client identifier issued during registration.
    pub client_id: String,

    /// Redirect URI where the response will be sent.
    /// Must exactly match one of the registered redirect URIs.
    pub redirect_uri: String,

    /// Requested scopes (space-separated). Defaults to "openid" when absent.
    #[serde(default)]
    pub scope: Option<String>,

    /// CSRF protection state parameter, echoed back to the client.
    #[serde(default)]
    pub state: Option<String>,

    /// OpenID Connect nonce for ID token binding.
    #[serde(default)]
    pub nonce: Option<String>,

    /// PKCE code challenge. Required for public clients.
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method ("S256" or "plain").
    /// Defaults to "S256" when a challenge is present without a method.
    #[serde(default)]
    pub code_challenge_method: Option<String>,
}

impl AuthorizationRequest {
    /// Returns the requested scope, applying the `openid` default.
    #[must_use]
    pub fn effective_scope(&self) -> String {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => scope.to_string(),
            _ => "openid".to_string(),
        }
    }
}

/// Authorization response parameters.
///
/// Returned as query string parameters on the redirect URI after successful
/// authorization.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    /// Single-use; expires after a short time.
    pub code: String,

    /// Echoed state parameter for CSRF validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: Option<String>) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// Authorization error reported via redirect to the client.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationError {
    /// OAuth 2.0 error code.
    pub error: AuthorizationErrorCode,

    /// Human-readable error description (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter for CSRF validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl AuthorizationError {
    /// Creates a new authorization error.
    #[must_use]
    pub fn new(error: AuthorizationErrorCode, state: Option<String>) -> Self {
        Self {
            error,
            error_description: None,
            state,
        }
    }

    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizationErrorCode,
        description: impl Into<String>,
        state: Option<String>,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            if let Some(ref state) = self.state {
                pairs.append_pair("state", state);
            }
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 §4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// The client is not authorized to request an authorization code
    /// using this method.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The authorization server does not support obtaining an authorization
    /// code using this method.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The authorization server encountered an unexpected condition.
    ServerError,
}

impl AuthorizationErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for AuthorizationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Authorize Outcome
// =============================================================================

/// Successful outcome of an authorization request.
#[derive(Debug, Clone)]
pub enum AuthorizeDecision {
    /// A code was issued; redirect the user-agent back to the client.
    Issued {
        /// Response parameters to append to the redirect URI.
        response: AuthorizationResponse,
        /// The verified redirect URI.
        redirect_uri: String,
    },

    /// The request is valid but there is no authenticated session; send the
    /// user-agent to the portal login page.
    LoginRequired,
}

/// Rejected authorization request, split by redirect-URI trust.
#[derive(Debug)]
pub enum AuthorizeRejection {
    /// The redirect URI is not yet trusted; respond directly.
    Direct(AuthError),

    /// The client and redirect URI are verified; report the error by
    /// redirecting the user-agent back to the client.
    Redirect {
        /// Error parameters to append to the redirect URI.
        error: AuthorizationError,
        /// The verified redirect URI.
        redirect_uri: String,
    },
}

impl From<AuthError> for AuthorizeRejection {
    fn from(error: AuthError) -> Self {
        Self::Direct(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: "code".to_string(),
            client_id: "lat_app".to_string(),
            redirect_uri: "https://app.example.com/callback".to_string(),
            scope: Some("openid profile".to_string()),
            state: Some("abc123xyz".to_string()),
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
        }
    }

    #[test]
    fn test_effective_scope_defaults_to_openid() {
        let mut req = request();
        assert_eq!(req.effective_scope(), "openid profile");

        req.scope = None;
        assert_eq!(req.effective_scope(), "openid");

        req.scope = Some("   ".to_string());
        assert_eq!(req.effective_scope(), "openid");
    }

    #[test]
    fn test_authorization_response_to_redirect_url() {
        let response =
            AuthorizationResponse::new("code123".to_string(), Some("state456".to_string()));

        let url = response
            .to_redirect_url("https://app.example.com/callback")
            .unwrap();

        assert!(url.starts_with("https://app.example.com/callback?"));
        assert!(url.contains("code=code123"));
        assert!(url.contains("state=state456"));
    }

    #[test]
    fn test_authorization_response_without_state() {
        let response = AuthorizationResponse::new("code123".to_string(), None);
        let url = response
            .to_redirect_url("https://app.example.com/callback")
            .unwrap();

        assert!(url.contains("code=code123"));
        assert!(!url.contains("state="));
    }

    #[test]
    fn test_authorization_error_to_redirect_url() {
        let error = AuthorizationError::with_description(
            AuthorizationErrorCode::InvalidScope,
            "Unknown scope",
            Some("state123".to_string()),
        );

        let url = error
            .to_redirect_url("https://app.example.com/callback")
            .unwrap();

        assert!(url.starts_with("https://app.example.com/callback?"));
        assert!(url.contains("error=invalid_scope"));
        assert!(url.contains("error_description=Unknown+scope"));
        assert!(url.contains("state=state123"));
    }

    #[test]
    fn test_authorization_error_preserves_existing_query() {
        let error = AuthorizationError::new(AuthorizationErrorCode::AccessDenied, None);
        let url = error
            .to_redirect_url("https://app.example.com/cb?tenant=acme")
            .unwrap();

        assert!(url.contains("tenant=acme"));
        assert!(url.contains("error=access_denied"));
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(
            AuthorizationErrorCode::InvalidRequest.as_str(),
            "invalid_request"
        );
        assert_eq!(
            AuthorizationErrorCode::UnsupportedResponseType.as_str(),
            "unsupported_response_type"
        );
        assert_eq!(
            AuthorizationErrorCode::InvalidScope.as_str(),
            "invalid_scope"
        );
        assert_eq!(AuthorizationErrorCode::ServerError.as_str(), "server_error");
    }

    #[test]
    fn test_error_code_serde_roundtrip() {
        let codes = vec![
            AuthorizationErrorCode::InvalidRequest,
            AuthorizationErrorCode::UnauthorizedClient,
            AuthorizationErrorCode::AccessDenied,
            AuthorizationErrorCode::UnsupportedResponseType,
            AuthorizationErrorCode::InvalidScope,
            AuthorizationErrorCode::ServerError,
        ];

        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let deserialized: AuthorizationErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, deserialized);
        }
    }
}
