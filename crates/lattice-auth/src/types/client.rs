//! OAuth 2.0 client domain types.
//!
//! This module defines the `Client` struct and related types for OAuth 2.0
//! client registrations in the Lattice SSO portal.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// Client Type
// =============================================================================

/// OAuth 2.0 client types.
///
/// Determines how a client authenticates at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    /// Cannot keep a secret (SPA, mobile). Authenticates with PKCE instead.
    Public,
    /// Server-side application that can hold a client secret.
    Confidential,
}

impl ClientType {
    /// Returns the client type as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Confidential => "confidential",
        }
    }
}

impl std::fmt::Display for ClientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 client registration.
///
/// Represents an external application that can use Lattice SSO. The
/// `client_id` is the opaque identifier used in OAuth flows and is distinct
/// from any storage-layer primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Argon2 hash of the client secret (confidential clients only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Human-readable display name.
    pub name: String,

    /// Detailed description of the client application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the client is public or confidential.
    pub client_type: ClientType,

    /// Allowed redirect URIs for the authorization code flow.
    /// Matching is exact string equality, never prefix or wildcard.
    pub redirect_uris: Vec<String>,

    /// Scopes this client is allowed to request. Every requested scope
    /// must be a member of this set.
    pub allowed_scopes: Vec<String>,

    /// Administrator that owns this registration.
    pub owner_id: Uuid,

    /// Whether this client is currently active and can be used.
    pub active: bool,

    /// When this registration was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this registration was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Client {
    /// Validates the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client configuration is invalid.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }

        if self.redirect_uris.is_empty() {
            return Err(ClientValidationError::NoRedirectUris);
        }

        // Public clients rely on PKCE, never on a secret
        if self.is_public() && self.client_secret_hash.is_some() {
            return Err(ClientValidationError::PublicClientSecret);
        }

        if self.is_confidential() && self.client_secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        Ok(())
    }

    /// Returns `true` if this is a public client.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.client_type == ClientType::Public
    }

    /// Returns `true` if this is a confidential client.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_type == ClientType::Confidential
    }

    /// Checks if the given redirect URI is allowed for this client.
    ///
    /// Only exact string matches are accepted; prefix or wildcard matching
    /// would open the door to open-redirect abuse.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks if the given scope is allowed for this client.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.allowed_scopes.iter().any(|allowed| allowed == scope)
    }

    /// Checks that every requested scope is a member of `allowed_scopes`.
    #[must_use]
    pub fn are_scopes_allowed<'a>(&self, scopes: impl IntoIterator<Item = &'a str>) -> bool {
        scopes.into_iter().all(|scope| self.is_scope_allowed(scope))
    }

    /// Returns whether PKCE is required for this client.
    ///
    /// Public clients always require PKCE; confidential clients may use it
    /// but authenticate with their secret.
    #[must_use]
    pub fn requires_pkce(&self) -> bool {
        self.is_public()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Client name cannot be empty.
    #[error("Client name cannot be empty")]
    EmptyName,

    /// At least one redirect URI is required.
    #[error("At least one redirect URI is required")]
    NoRedirectUris,

    /// Public clients cannot have a client secret.
    #[error("Public clients cannot have a client secret")]
    PublicClientSecret,

    /// Confidential clients require a client secret.
    #[error("Confidential clients require a client secret")]
    MissingSecret,
}

// =============================================================================
// Tests
// =============================================================================
