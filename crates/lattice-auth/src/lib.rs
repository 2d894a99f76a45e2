//! # lattice-auth
//!
//! OAuth2/OIDC authorization server core for the Lattice SSO portal.
//!
//! This crate provides:
//! - The OAuth 2.0 authorization code flow with PKCE
//! - Refresh token rotation with replay detection
//! - OpenID Connect ID tokens, userinfo, JWKS, and discovery
//! - First-party portal sessions (login / refresh / logout)
//! - OAuth client registration management
//!
//! ## Overview
//!
//! The crate owns protocol state machines and cryptographic material; it
//! does not own users, teams, or permissions. Those are consumed through
//! narrow traits (`UserStorage`, `ClaimsSource`, `ActivitySink`) implemented
//! by the surrounding application, and all persistent protocol state (codes,
//! refresh tokens, client registrations) sits behind storage traits with
//! documented atomicity contracts.
//!
//! ## Modules
//!
//! - [`config`] - configuration for lifetimes, signing keys, and cookies
//! - [`claims`] - identity scopes and scope-gated claim assembly
//! - [`client_secret`] - client credential generation and hashing
//! - [`oauth`] - authorization endpoint, PKCE, token endpoint types
//! - [`token`] - JWT signing/verification and the token service
//! - [`storage`] - storage and collaborator traits
//! - [`middleware`] - bearer-token Axum extractors
//! - [`http`] - Axum handlers for the protocol and admin surface

pub mod claims;
pub mod client_secret;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use claims::{
    ClaimsSource, IdentityClaims, PermissionClaim, RoleClaim, ScopeSet, TeamClaim, WorkspaceClaim,
    assemble_identity_claims,
};
pub use config::{AuthConfig, ConfigError, CookieConfig, Environment, OAuthConfig, SigningConfig};
pub use error::{AuthError, ErrorCategory};
pub use http::{
    AuthorizeState, ClientAdminState, DiscoveryState, JwksState, RevocationState, SessionState,
    TokenState, UserInfoResponse, UserInfoState, authorize_handler, create_client_handler,
    delete_client_handler, get_client_handler, jwks_handler, list_clients_handler, login_handler,
    logout_handler, openid_configuration_handler, refresh_session_handler, revoke_handler,
    rotate_secret_handler, token_handler, userinfo_handler,
};
pub use middleware::{AuthContext, AuthState, BearerAuth, OptionalBearerAuth};
pub use oauth::{
    AuthorizationConfig, AuthorizationRequest, AuthorizationService, AuthorizeDecision,
    AuthorizeRejection, PkceChallenge, PkceChallengeMethod, PkceVerifier, TokenRequest,
    TokenResponse,
};
pub use storage::{
    ActivityEvent, ActivitySink, AuthorizationCodeStorage, ClientStorage, LoginMethod,
    RefreshTokenStorage, TracingActivitySink, User, UserStorage,
};
pub use token::{
    AccessTokenClaims, IdTokenClaims, JwtError, JwtService, SessionTokens, SigningAlgorithm,
    SigningKeyPair, TokenConfig, TokenService,
};
pub use types::{Client, ClientType, ClientValidationError, RefreshToken};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use lattice_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::claims::{ClaimsSource, IdentityClaims, ScopeSet};
    pub use crate::config::{AuthConfig, ConfigError, Environment};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::middleware::{AuthContext, AuthState, BearerAuth, OptionalBearerAuth};
    pub use crate::oauth::{
        AuthorizationConfig, AuthorizationService, AuthorizeDecision, AuthorizeRejection,
    };
    pub use crate::storage::{
        ActivitySink, AuthorizationCodeStorage, ClientStorage, RefreshTokenStorage, User,
        UserStorage,
    };
    pub use crate::token::{JwtService, SigningKeyPair, TokenConfig, TokenService};
    pub use crate::types::{Client, ClientType, RefreshToken};
}
