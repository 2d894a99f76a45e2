//! Refresh token storage trait.
//!
//! This module defines the storage interface for refresh tokens.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Rotation must be atomic: concurrent refreshes of the same token must
//!   produce exactly one winner
//! - Expired tokens are invalid at read time; cleanup is housekeeping only

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::refresh_token::RefreshToken;

/// Storage trait for refresh tokens.
///
/// Implementations must ensure the atomicity properties documented on
/// `rotate` and `revoke`.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token record (hashed token value).
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored (e.g., duplicate hash,
    /// storage unavailable).
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token by its hash.
    ///
    /// Returns tokens regardless of expiration/revocation status; callers
    /// should check `is_valid()` before using one.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Rotates a refresh token: revokes the old record and stores its
    /// replacement in one atomic step.
    ///
    /// The old record gets `revoked_at` set and `replaced_by` pointed at the
    /// replacement's id. The conditional update only succeeds while the old
    /// token is still unrevoked and unexpired, so two concurrent refreshes
    /// of the same token produce exactly one success:
    ///
    /// ```sql
    /// UPDATE refresh_tokens
    /// SET revoked_at = NOW(), replaced_by = $2
    /// WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the old token is missing, already revoked,
    /// or expired; a storage error if the operation fails. The replacement
    /// is not stored on failure.
    async fn rotate(&self, token_hash: &str, replacement: &RefreshToken) -> AuthResult<()>;

    /// Revokes a refresh token by hash.
    ///
    /// Idempotent. Returns `true` if a token was found (whether or not it
    /// was already revoked), `false` for an unknown hash — revocation of an
    /// unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage operation fails.
    async fn revoke(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Revokes all refresh tokens for a client.
    ///
    /// Used when a client is deleted or compromised.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64>;

    /// Revokes all refresh tokens for a user.
    ///
    /// Used when a user's sessions are invalidated (password change, account
    /// compromise).
    ///
    /// # Returns
    ///
    /// Returns the number of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_by_user(&self, user_id: Uuid) -> AuthResult<u64>;

    /// Deletes expired and long-revoked tokens.
    ///
    /// Housekeeping only; validity is always checked at read time.
    ///
    /// # Returns
    ///
    /// Returns the number of tokens deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;

    /// Lists all active (non-revoked, non-expired) tokens for a user.
    ///
    /// Useful for session management UI.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>>;
}
