//! # lattice-auth-memory
//!
//! In-memory storage backend for the Lattice authorization server.
//!
//! Implements the `lattice-auth` storage traits over `RwLock<HashMap>`
//! state. The consume and rotate operations perform their compare-and-set
//! under a single write lock, giving the exactly-once guarantees the traits
//! require, so this backend is suitable for integration tests and
//! single-node development deployments. Durable multi-node deployments use
//! a transactional database backend instead.

pub mod client;
pub mod code;
pub mod refresh_token;
pub mod user;

pub use client::MemoryClientStorage;
pub use code::MemoryAuthorizationCodeStorage;
pub use refresh_token::MemoryRefreshTokenStorage;
pub use user::MemoryUserStorage;

use async_trait::async_trait;
use uuid::Uuid;

use lattice_auth::AuthResult;
use lattice_auth::claims::{ClaimsSource, PermissionClaim, RoleClaim, TeamClaim, WorkspaceClaim};

/// Claims source that serves one fixed set of organizational claims to
/// every user. Enough for development wiring and tests; the portal backend
/// provides the real resolution.
#[derive(Debug, Clone, Default)]
pub struct StaticClaimsSource {
    /// Teams returned for every user.
    pub teams: Vec<TeamClaim>,
    /// Roles returned for every user.
    pub roles: Vec<RoleClaim>,
    /// Workspaces returned for every user.
    pub workspaces: Vec<WorkspaceClaim>,
    /// Permissions returned for every user.
    pub permissions: Vec<PermissionClaim>,
}

#[async_trait]
impl ClaimsSource for StaticClaimsSource {
    async fn teams(&self, _user_id: Uuid) -> AuthResult<Vec<TeamClaim>> {
        Ok(self.teams.clone())
    }

    async fn roles(&self, _user_id: Uuid) -> AuthResult<Vec<RoleClaim>> {
        Ok(self.roles.clone())
    }

    async fn workspaces(&self, _user_id: Uuid) -> AuthResult<Vec<WorkspaceClaim>> {
        Ok(self.workspaces.clone())
    }

    async fn permissions(&self, _user_id: Uuid) -> AuthResult<Vec<PermissionClaim>> {
        Ok(self.permissions.clone())
    }
}
