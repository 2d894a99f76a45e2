//! Authorization code management.
//!
//! This module provides the authorization code record created during the
//! OAuth 2.0 authorization code flow.
//!
//! # Lifecycle
//!
//! 1. Code created during `/authorize` once the user is authenticated
//! 2. Client exchanges the code for tokens at `/token` (code consumed)
//! 3. Consumed and expired codes are cleaned up opportunistically
//!
//! # Security
//!
//! - Codes are cryptographically random (256 bits)
//! - Codes expire after a short time (default 10 minutes)
//! - Codes are single-use: `consumed_at` only ever transitions from
//!   `None` to `Some`, atomically (see `AuthorizationCodeStorage::consume`)
//! - The PKCE challenge is stored for verification at token exchange

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization code record stored in the database.
///
/// Binds a single-use code to the client, user, redirect URI, scope, and
/// optional nonce / PKCE challenge it was issued with. Everything needed to
/// validate the token request and mint tokens lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// Unique record identifier.
    pub id: Uuid,

    /// Authorization code value (one-time use).
    /// 256-bit random value, base64url-encoded.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// User that authorized the request.
    pub user_id: Uuid,

    /// Redirect URI from the authorization request.
    /// Must match the redirect_uri in the token request verbatim.
    pub redirect_uri: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// OpenID Connect nonce for ID token binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// PKCE code challenge, if the client supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE challenge method ("S256" or "plain").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,

    /// Timestamp when the code was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Timestamp when the code was exchanged (consumed).
    /// None until the code is used; set exactly once.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Generates a new cryptographically secure authorization code value.
    ///
    /// The code is 256 bits (32 bytes) of random data, encoded as base64url
    /// without padding (43 characters), exceeding the OAuth 2.0
    /// recommendation of at least 128 bits of entropy.
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the code has been consumed.
    ///
    /// Consumed codes cannot be used again (single-use requirement).
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the code is valid for exchange.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }

    /// Returns `true` if PKCE verification is required at exchange.
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        self.code_challenge.is_some()
    }
}
