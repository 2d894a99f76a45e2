//! Bearer token authentication extractors.
//!
//! Axum extractors that validate Bearer access tokens and load the
//! authenticated user for protected endpoints (userinfo, client
//! administration, the authorization endpoint's session check).
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use lattice_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.user.email)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::claims::ScopeSet;
use crate::error::AuthError;
use crate::storage::user::{User, UserStorage};
use crate::token::jwt::{AccessTokenClaims, JwtService};

/// State required for bearer token authentication.
///
/// Include this in your application state and expose it to the extractors
/// via `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,

    /// User storage for loading the authenticated user.
    pub user_storage: Arc<dyn UserStorage>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(jwt_service: Arc<JwtService>, user_storage: Arc<dyn UserStorage>) -> Self {
        Self {
            jwt_service,
            user_storage,
        }
    }

    /// Validates a bearer token and loads the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken`/`TokenExpired` for bad tokens and
    /// `Unauthorized` for unknown or inactive users.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let decoded = self
            .jwt_service
            .decode::<AccessTokenClaims>(token)
            .map_err(|e| {
                if matches!(e, crate::token::jwt::JwtError::Expired) {
                    AuthError::TokenExpired
                } else {
                    AuthError::invalid_token(e.to_string())
                }
            })?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AuthError::invalid_token("Token subject is not a user id"))?;

        let user = self
            .user_storage
            .find_by_id(user_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AuthError::unauthorized("User not found or inactive"))?;

        Ok(AuthContext {
            claims: decoded.claims,
            user,
        })
    }
}

/// Authenticated request context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The validated access token claims.
    pub claims: AccessTokenClaims,

    /// The authenticated user.
    pub user: User,
}

impl AuthContext {
    /// The subject (user id) of the access token.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// The identity scopes embedded in the access token.
    ///
    /// First-party session tokens carry no scope claim and get an empty set.
    #[must_use]
    pub fn scopes(&self) -> ScopeSet {
        self.claims
            .scope
            .as_deref()
            .map(ScopeSet::parse)
            .unwrap_or_default()
    }

    /// Returns `true` for first-party session tokens (no client binding).
    #[must_use]
    pub fn is_first_party(&self) -> bool {
        self.claims.client_id.is_none()
    }

    /// Requires the authenticated user to be a system owner.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` otherwise.
    pub fn require_system_owner(&self) -> Result<(), AuthError> {
        if self.user.system_owner {
            Ok(())
        } else {
            Err(AuthError::forbidden("System owner role required"))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}

/// Extractor that requires a valid Bearer access token.
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AuthError::unauthorized("Missing bearer token"))?;

        let context = auth_state.authenticate(&token).await?;
        Ok(Self(context))
    }
}

/// Extractor that yields the auth context when a valid Bearer token is
/// present, and `None` otherwise.
///
/// Used by the authorization endpoint, where an unauthenticated user is
/// redirected to the login page rather than rejected.
pub struct OptionalBearerAuth(pub Option<AuthContext>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let context = match bearer_token(parts) {
            Some(token) => auth_state.authenticate(&token).await.ok(),
            None => None,
        };
        Ok(Self(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthResult;
    use crate::token::jwt::{SigningAlgorithm, SigningKeyPair};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::RwLock;
    use time::OffsetDateTime;

    struct MockUserStorage {
        users: RwLock<HashMap<Uuid, User>>,
    }

    impl MockUserStorage {
        fn new() -> Self {
            Self {
                users: RwLock::new(HashMap::new()),
            }
        }

        fn add(&self, user: User) {
            self.users.write().unwrap().insert(user.id, user);
        }
    }

    #[async_trait]
    impl UserStorage for MockUserStorage {
        async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
            Ok(self.users.read().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn verify_password(&self, _user_id: Uuid, _password: &str) -> AuthResult<bool> {
            Ok(false)
        }
    }

    fn state_with_user(user: &User) -> AuthState {
        let key_pair = SigningKeyPair::generate_rsa("test-key", SigningAlgorithm::RS256).unwrap();
        let jwt_service = Arc::new(JwtService::new(key_pair, "https://sso.example.com"));
        let users = Arc::new(MockUserStorage::new());
        users.add(user.clone());
        AuthState::new(jwt_service, users)
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            given_name: None,
            family_name: None,
            avatar: None,
            active: true,
            system_owner: false,
        }
    }

    fn token_for(state: &AuthState, user: &User, scope: Option<&str>) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims {
            iss: "https://sso.example.com".to_string(),
            sub: user.id.to_string(),
            exp: now + 900,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            scope: scope.map(String::from),
            client_id: scope.map(|_| "lat_app".to_string()),
        };
        state.jwt_service.encode(&claims).unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let user = test_user();
        let state = state_with_user(&user);
        let token = token_for(&state, &user, Some("openid profile"));

        let context = state.authenticate(&token).await.unwrap();
        assert_eq!(context.user.id, user.id);
        assert!(context.scopes().openid);
        assert!(context.scopes().profile);
        assert!(!context.is_first_party());
    }

    #[tokio::test]
    async fn test_authenticate_first_party_token() {
        let user = test_user();
        let state = state_with_user(&user);
        let token = token_for(&state, &user, None);

        let context = state.authenticate(&token).await.unwrap();
        assert!(context.is_first_party());
        assert!(context.scopes().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_garbage_token() {
        let user = test_user();
        let state = state_with_user(&user);

        let result = state.authenticate("garbage").await;
        assert!(matches!(result, Err(AuthError::InvalidToken { .. })));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user() {
        let mut user = test_user();
        user.active = false;
        let state = state_with_user(&user);
        let token = token_for(&state, &user, Some("openid"));

        let result = state.authenticate(&token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    }

    #[test]
    fn test_require_system_owner() {
        let mut user = test_user();
        let claims = AccessTokenClaims {
            iss: String::new(),
            sub: user.id.to_string(),
            exp: 0,
            iat: 0,
            jti: String::new(),
            scope: None,
            client_id: None,
        };

        let context = AuthContext {
            claims: claims.clone(),
            user: user.clone(),
        };
        assert!(context.require_system_owner().is_err());

        user.system_owner = true;
        let context = AuthContext { claims, user };
        assert!(context.require_system_owner().is_ok());
    }
}
