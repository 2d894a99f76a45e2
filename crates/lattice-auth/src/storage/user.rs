//! User lookup and authentication trait.
//!
//! The authorization server does not own user records; it consumes them
//! through this narrow interface. The portal's relational storage provides
//! the real implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthResult;

/// A user as seen by the authorization server.
///
/// Only the fields the core needs: identity, profile claims, and the flags
/// that gate authentication and administration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// Email address (the login identifier).
    pub email: String,

    /// Given name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    /// Whether the account can authenticate.
    pub active: bool,

    /// Whether the user administers the SSO system (client management).
    pub system_owner: bool,
}

impl User {
    /// Returns the user's full display name, when name parts are present.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.clone()),
            (None, Some(family)) => Some(family.clone()),
            (None, None) => None,
        }
    }
}

/// User lookup and password authentication.
///
/// The implementation owns password hashing; the core only ever sees a
/// boolean verdict.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Finds a user by email address.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Verifies a user's password.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the password matches
    /// - `Ok(false)` if it doesn't, or the user has no password set
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist or the operation fails.
    async fn verify_password(&self, user_id: Uuid, password: &str) -> AuthResult<bool>;
}
