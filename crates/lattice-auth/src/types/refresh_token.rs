//! Refresh token domain type.
//!
//! This module defines the refresh token structure used for persisting
//! and managing refresh tokens, for both third-party OAuth clients and
//! first-party portal sessions.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Rotation is mandatory: each successful refresh revokes the old token
//!   and links it to its replacement via `replaced_by`
//! - Expired tokens are treated as invalid at read time

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh token stored in the database.
///
/// The token value itself is never stored. Only a SHA-256 hash is persisted,
/// similar to password storage. When validating a refresh token:
///
/// 1. Hash the incoming token
/// 2. Look up by hash
/// 3. Validate expiration and revocation status
///
/// A token with no `client_id` belongs to a first-party portal session
/// rather than a third-party OAuth client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hash of the actual token value.
    /// The plaintext token is returned to the caller once and never stored.
    pub token_hash: String,

    /// User that authorized this token.
    pub user_id: Uuid,

    /// OAuth client this token was issued to.
    /// `None` for first-party portal session tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Granted scopes (space-separated). Empty for session tokens.
    pub scope: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Token that superseded this one after rotation.
    ///
    /// Populated on every rotation. If a revoked token is presented again,
    /// this pointer identifies the chain that has to be treated as
    /// compromised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<Uuid>,
}

impl RefreshToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Returns `true` if this is a first-party portal session token.
    #[must_use]
    pub fn is_first_party(&self) -> bool {
        self.client_id.is_none()
    }

    /// Hash a token value using SHA-256.
    ///
    /// This is used both when storing new tokens and when looking up
    /// tokens for validation.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_hash_token() {
        let token = "test-token-value";
        let hash = RefreshToken::hash_token(token);

        // SHA-256 produces 64 hex characters
        assert_eq!(hash.len(), 64);

        // Same input produces same hash
        assert_eq!(hash, RefreshToken::hash_token(token));

        // Different input produces different hash
        assert_ne!(hash, RefreshToken::hash_token("different-token"));
    }

    #[test]
    fn test_generate_token() {
        let token = RefreshToken::generate_token();

        // 32 bytes base64url encoded = 43 characters
        assert_eq!(token.len(), 43);

        // Should be URL-safe base64
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let tokens: Vec<String> = (0..100).map(|_| RefreshToken::generate_token()).collect();

        let mut unique = tokens.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(tokens.len(), unique.len());
    }

    #[test]
    fn test_is_valid() {
        let now = OffsetDateTime::now_utc();

        // Valid (not expired, not revoked)
        let token = create_test_token(now + Duration::days(7), None);
        assert!(token.is_valid());

        // Invalid (expired)
        let token = create_test_token(now - Duration::minutes(1), None);
        assert!(token.is_expired());
        assert!(!token.is_valid());

        // Invalid (revoked)
        let token = create_test_token(now + Duration::days(7), Some(now));
        assert!(token.is_revoked());
        assert!(!token.is_valid());
    }

    #[test]
    fn test_first_party() {
        let now = OffsetDateTime::now_utc();
        let mut token = create_test_token(now + Duration::days(7), None);
        assert!(!token.is_first_party());

        token.client_id = None;
        assert!(token.is_first_party());
    }

    #[test]
    fn test_serialization() {
        let now = OffsetDateTime::now_utc();
        let token = create_test_token(now + Duration::days(7), None);

        let json = serde_json::to_string(&token).unwrap();
        let deserialized: RefreshToken = serde_json::from_str(&json).unwrap();

        assert_eq!(token.id, deserialized.id);
        assert_eq!(token.token_hash, deserialized.token_hash);
        assert_eq!(token.client_id, deserialized.client_id);
        assert_eq!(token.scope, deserialized.scope);

        // replaced_by is omitted while unset
        assert!(!json.contains("replaced_by"));
    }

    fn create_test_token(
        expires_at: OffsetDateTime,
        revoked_at: Option<OffsetDateTime>,
    ) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token("test-token"),
            user_id: Uuid::new_v4(),
            client_id: Some("lat_client".to_string()),
            scope: "openid profile".to_string(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
            replaced_by: None,
        }
    }
}
