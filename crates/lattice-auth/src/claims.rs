//! Identity claims and scope-gated claim assembly.
//!
//! Supported identity scopes are a fixed enumeration, and claim assembly
//! folds over that enumeration in one documented order — `email`, `profile`,
//! `teams`, `roles`, `workspaces`, `permissions` — so the produced claims
//! set is deterministic regardless of the order scopes were requested in.
//!
//! Profile and email claims come from the user record; organizational claims
//! (teams, roles, workspaces, permissions) come from the external
//! [`ClaimsSource`] collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuthResult;
use crate::storage::user::User;

// =============================================================================
// Scope Set
// =============================================================================

/// The identity scopes this server understands.
///
/// Parsed from a space-separated scope string. Unknown scopes are ignored
/// here — whether a client may request them at all is decided against its
/// `allowed_scopes` registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeSet {
    /// `openid` - enables the ID token and the userinfo endpoint.
    pub openid: bool,
    /// `email` - email address and verification status.
    pub email: bool,
    /// `profile` - name parts and avatar.
    pub profile: bool,
    /// `teams` - the user's team memberships.
    pub teams: bool,
    /// `roles` - the user's roles within their teams.
    pub roles: bool,
    /// `workspaces` - workspaces the user can access.
    pub workspaces: bool,
    /// `permissions` - resolved permission grants.
    pub permissions: bool,
}

impl ScopeSet {
    /// Parses a space-separated scope string.
    #[must_use]
    pub fn parse(scope: &str) -> Self {
        let mut set = Self::default();
        for item in scope.split_whitespace() {
            match item {
                "openid" => set.openid = true,
                "email" => set.email = true,
                "profile" => set.profile = true,
                "teams" => set.teams = true,
                "roles" => set.roles = true,
                "workspaces" => set.workspaces = true,
                "permissions" => set.permissions = true,
                _ => {}
            }
        }
        set
    }

    /// Returns `true` if no known identity scope was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.openid
            || self.email
            || self.profile
            || self.teams
            || self.roles
            || self.workspaces
            || self.permissions)
    }
}

// =============================================================================
// Claim Types
// =============================================================================

/// A team membership claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamClaim {
    /// Team display name.
    pub name: String,
    /// Team slug.
    pub slug: String,
}

/// A role claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleClaim {
    /// Role display name.
    pub name: String,
    /// Role slug.
    pub slug: String,
}

/// A workspace claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceClaim {
    /// Workspace display name.
    pub name: String,
    /// Workspace slug.
    pub slug: String,
}

/// A permission claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionClaim {
    /// Permission display name.
    pub name: String,
    /// Permission slug.
    pub slug: String,
}

/// Scope-gated identity claims.
///
/// Flattened into ID token payloads and userinfo responses; absent claims
/// are omitted from the serialized output entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Email address (`email` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Email verification status (`email` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    /// Given name (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family name (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Full display name (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL (`profile` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Team memberships (`teams` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<TeamClaim>>,

    /// Roles (`roles` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<RoleClaim>>,

    /// Workspaces (`workspaces` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<Vec<WorkspaceClaim>>,

    /// Permission grants (`permissions` scope).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionClaim>>,
}

// =============================================================================
// Claims Source
// =============================================================================

/// External source for organizational claims.
///
/// The portal's team/role/permission resolution lives behind this interface;
/// the authorization server never computes these itself.
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    /// The user's team memberships.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn teams(&self, user_id: Uuid) -> AuthResult<Vec<TeamClaim>>;

    /// The user's roles across their teams.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn roles(&self, user_id: Uuid) -> AuthResult<Vec<RoleClaim>>;

    /// Workspaces the user can access.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn workspaces(&self, user_id: Uuid) -> AuthResult<Vec<WorkspaceClaim>>;

    /// The user's resolved permission grants.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    async fn permissions(&self, user_id: Uuid) -> AuthResult<Vec<PermissionClaim>>;
}

/// Assembles identity claims for a user, gated by the granted scopes.
///
/// Folds over the supported scopes in the fixed order documented on this
/// module; only granted scopes are queried, so the claims source is never
/// consulted for data the token does not disclose.
///
/// # Errors
///
/// Returns an error if a claims-source lookup fails.
pub async fn assemble_identity_claims(
    user: &User,
    scopes: &ScopeSet,
    source: &dyn ClaimsSource,
) -> AuthResult<IdentityClaims> {
    let mut claims = IdentityClaims::default();

    if scopes.email {
        claims.email = Some(user.email.clone());
        claims.email_verified = Some(true);
    }

    if scopes.profile {
        claims.given_name = user.given_name.clone();
        claims.family_name = user.family_name.clone();
        claims.name = user.full_name();
        claims.picture = user.avatar.clone();
    }

    if scopes.teams {
        claims.teams = Some(source.teams(user.id).await?);
    }

    if scopes.roles {
        claims.roles = Some(source.roles(user.id).await?);
    }

    if scopes.workspaces {
        claims.workspaces = Some(source.workspaces(user.id).await?);
    }

    if scopes.permissions {
        claims.permissions = Some(source.permissions(user.id).await?);
    }

    Ok(claims)
}
