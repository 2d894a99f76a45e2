//! Authorization code storage trait.
//!
//! This module defines the storage interface for authorization codes used
//! during the OAuth 2.0 authorization code flow.
//!
//! # Security Considerations
//!
//! - Never log authorization code values
//! - `consume` must be atomic to prevent double-redemption races
//! - Expired codes are invalid at read time; cleanup is housekeeping only

use async_trait::async_trait;

use crate::AuthResult;
use crate::oauth::code::AuthorizationCode;

/// Storage trait for authorization codes.
///
/// Codes are created when an authorization request is approved and consumed
/// exactly once when exchanged for tokens.
#[async_trait]
pub trait AuthorizationCodeStorage: Send + Sync {
    /// Creates a new authorization code record.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored (e.g., duplicate code,
    /// storage unavailable).
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds a code record by its code value.
    ///
    /// Returns records regardless of their consumed/expired status; callers
    /// should check `is_valid()` before trusting one, and must still go
    /// through `consume` before issuing tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Consumes an authorization code (marks it used).
    ///
    /// This operation must be atomic: two concurrent exchanges of the same
    /// code must produce exactly one success. A conditional update is the
    /// standard shape:
    ///
    /// ```sql
    /// UPDATE oauth_authorization_codes
    /// SET consumed_at = NOW()
    /// WHERE code = $1 AND consumed_at IS NULL AND expires_at > NOW()
    /// RETURNING *
    /// ```
    ///
    /// # Returns
    ///
    /// Returns the consumed record with `consumed_at` set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the code is not found, already consumed, or
    /// expired; a storage error if the operation fails.
    async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode>;

    /// Deletes expired and consumed codes.
    ///
    /// Housekeeping only: correctness never depends on this running, since
    /// validity is checked against timestamps at read time.
    ///
    /// # Returns
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;

    /// Deletes all codes for a specific client.
    ///
    /// Part of the cascade when a client registration is deleted.
    ///
    /// # Returns
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64>;
}
