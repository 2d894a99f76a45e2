//! Token service for issuing and rotating credentials.
//!
//! This module provides the token service that handles OAuth 2.0 token
//! operations and first-party portal sessions:
//!
//! - Authorization code exchange
//! - Refresh token rotation
//! - Access and ID token generation
//! - Portal login / session refresh / revocation
//!
//! # Usage
//!
//! ```ignore
//! use lattice_auth::token::{TokenConfig, TokenService};
//!
//! let config = TokenConfig::new("https://sso.example.com");
//! let service = TokenService::new(
//!     jwt_service, code_storage, refresh_storage, user_storage,
//!     claims_source, activity_sink, config,
//! );
//!
//! let response = service.exchange_code(&request, &client).await?;
//! ```

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::claims::{ClaimsSource, ScopeSet, assemble_identity_claims};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::code::AuthorizationCode;
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::activity::{ActivityEvent, ActivitySink, LoginMethod};
use crate::storage::code::AuthorizationCodeStorage;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::storage::user::{User, UserStorage};
use crate::token::jwt::{AccessTokenClaims, IdTokenClaims, JwtService};
use crate::types::Client;
use crate::types::refresh_token::RefreshToken;

/// Configuration for the token service.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Server issuer URL (included in tokens as `iss`).
    pub issuer: String,

    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime. Rotation starts a fresh window.
    pub refresh_token_lifetime: Duration,

    /// ID token lifetime.
    pub id_token_lifetime: Duration,
}

impl TokenConfig {
    /// Creates a new token configuration with defaults.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::minutes(15),
            refresh_token_lifetime: Duration::days(7),
            id_token_lifetime: Duration::hours(1),
        }
    }

    /// Builds a token configuration from the auth configuration, so the
    /// signer and the discovery document share one source of truth.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            issuer: config.issuer.clone(),
            access_token_lifetime: Duration::seconds(
                config.oauth.access_token_lifetime.as_secs() as i64
            ),
            refresh_token_lifetime: Duration::seconds(
                config.oauth.refresh_token_lifetime.as_secs() as i64,
            ),
            id_token_lifetime: Duration::seconds(config.oauth.id_token_lifetime.as_secs() as i64),
        }
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets the ID token lifetime.
    #[must_use]
    pub fn with_id_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.id_token_lifetime = lifetime;
        self
    }
}

/// Tokens issued for a first-party portal session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    /// The authenticated user.
    pub user: User,

    /// Access token (JWT).
    pub access_token: String,

    /// Raw refresh token. Delivered to the browser as an httpOnly cookie;
    /// only its hash is persisted.
    pub refresh_token: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Token service for issuing and rotating OAuth and session credentials.
pub struct TokenService {
    /// JWT service for encoding tokens.
    jwt_service: Arc<JwtService>,

    /// Authorization code storage.
    code_storage: Arc<dyn AuthorizationCodeStorage>,

    /// Refresh token storage.
    refresh_token_storage: Arc<dyn RefreshTokenStorage>,

    /// User lookup and password verification.
    user_storage: Arc<dyn UserStorage>,

    /// External source for organizational claims.
    claims_source: Arc<dyn ClaimsSource>,

    /// Fire-and-forget activity sink.
    activity: Arc<dyn ActivitySink>,

    /// Service configuration.
    config: TokenConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        jwt_service: Arc<JwtService>,
        code_storage: Arc<dyn AuthorizationCodeStorage>,
        refresh_token_storage: Arc<dyn RefreshTokenStorage>,
        user_storage: Arc<dyn UserStorage>,
        claims_source: Arc<dyn ClaimsSource>,
        activity: Arc<dyn ActivitySink>,
        config: TokenConfig,
    ) -> Self {
        Self {
            jwt_service,
            code_storage,
            refresh_token_storage,
            user_storage,
            claims_source,
            activity,
            config,
        }
    }

    // =========================================================================
    // Authorization code grant
    // =========================================================================

    /// Exchanges an authorization code for tokens.
    ///
    /// Validates the request against the stored code, verifies PKCE, consumes
    /// the code atomically, and only then mints tokens. Two concurrent
    /// exchanges of the same code get exactly one success.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the code is missing, unknown, expired,
    /// already used, bound to another client or redirect URI, or fails PKCE;
    /// `unsupported_grant_type` for a mismatched grant type.
    pub async fn exchange_code(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if request.grant_type != "authorization_code" {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        let code_value = request
            .code
            .as_ref()
            .ok_or_else(|| AuthError::invalid_grant("Missing code parameter"))?;

        let redirect_uri = request
            .redirect_uri
            .as_ref()
            .ok_or_else(|| AuthError::invalid_grant("Missing redirect_uri parameter"))?;

        // Not-found, expired, and already-used all collapse into the same
        // response so callers cannot probe stored state
        let record = self
            .code_storage
            .find_by_code(code_value)
            .await?
            .filter(AuthorizationCode::is_valid)
            .ok_or_else(|| AuthError::invalid_grant("Invalid authorization code"))?;

        if record.client_id != client.client_id {
            return Err(AuthError::invalid_grant(
                "Authorization code was issued to a different client",
            ));
        }

        if record.redirect_uri != *redirect_uri {
            return Err(AuthError::invalid_grant(
                "Redirect URI does not match authorization request",
            ));
        }

        if record.requires_pkce() {
            self.verify_pkce(&record, request)?;
        }

        // Single atomic consume; a concurrent exchange that lost the race
        // gets invalid_grant from the storage layer and no tokens are minted
        let record = self.code_storage.consume(code_value).await?;

        let user = self
            .user_storage
            .find_by_id(record.user_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AuthError::invalid_grant("User not found or inactive"))?;

        let now = OffsetDateTime::now_utc();
        let scopes = ScopeSet::parse(&record.scope);

        let access_token = self.mint_access_token(
            user.id,
            Some(record.scope.clone()),
            Some(client.client_id.clone()),
            now,
        )?;

        let (raw_refresh, _) = self
            .issue_refresh_token(user.id, Some(client.client_id.clone()), record.scope.clone())
            .await?;

        let mut response = TokenResponse::new(
            access_token,
            self.config.access_token_lifetime.whole_seconds() as u64,
            record.scope.clone(),
        )
        .with_refresh_token(raw_refresh);

        if scopes.openid {
            let id_token = self
                .mint_id_token(&user, &scopes, client, record.nonce.clone(), now)
                .await?;
            response = response.with_id_token(id_token);
        }

        self.activity
            .record(ActivityEvent::Login {
                user_id: user.id,
                method: LoginMethod::OAuth,
                client_id: Some(client.client_id.clone()),
                client_name: Some(client.name.clone()),
            })
            .await;

        tracing::info!(
            client_id = %client.client_id,
            user_id = %user.id,
            "Authorization code exchanged"
        );

        Ok(response)
    }

    fn verify_pkce(&self, record: &AuthorizationCode, request: &TokenRequest) -> AuthResult<()> {
        let verifier_value = request
            .code_verifier
            .as_ref()
            .ok_or_else(|| AuthError::invalid_grant("Missing code_verifier parameter"))?;

        let challenge_value = record
            .code_challenge
            .clone()
            .ok_or_else(|| AuthError::internal("Code record lost its PKCE challenge"))?;

        let method = match record.code_challenge_method.as_deref() {
            Some(method) => PkceChallengeMethod::parse(method)
                .map_err(|_| AuthError::PkceVerificationFailed)?,
            None => PkceChallengeMethod::default(),
        };

        let challenge = PkceChallenge::new(challenge_value)
            .map_err(|e| AuthError::invalid_grant(format!("Invalid PKCE challenge: {e}")))?;
        let verifier = PkceVerifier::new(verifier_value.clone())
            .map_err(|e| AuthError::invalid_grant(format!("Invalid PKCE verifier: {e}")))?;

        challenge
            .verify(&verifier, method)
            .map_err(|_| AuthError::PkceVerificationFailed)
    }

    // =========================================================================
    // Refresh token grant
    // =========================================================================

    /// Exchanges a refresh token for a new access/refresh token pair.
    ///
    /// Rotation is mandatory: the presented token is revoked and linked to
    /// its replacement in one atomic storage step before the response is
    /// produced, so the old value is dead even if the response is lost.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the token is missing, unknown, expired,
    /// revoked, or owned by a different client; `unsupported_grant_type`
    /// for a mismatched grant type.
    pub async fn refresh(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if request.grant_type != "refresh_token" {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        let raw_token = request
            .refresh_token
            .as_ref()
            .ok_or_else(|| AuthError::invalid_grant("Missing refresh_token parameter"))?;

        let token_hash = RefreshToken::hash_token(raw_token);
        let stored = self
            .refresh_token_storage
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        // Token issued to a different client (or a first-party session)
        // cannot be redeemed by this caller
        if stored.client_id.as_deref() != Some(client.client_id.as_str()) {
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to a different client",
            ));
        }

        self.check_replay(&stored)?;

        let user = self
            .user_storage
            .find_by_id(stored.user_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AuthError::invalid_grant("User not found or inactive"))?;

        let (raw_replacement, _) = self.rotate_refresh_token(&stored).await?;

        let now = OffsetDateTime::now_utc();
        let access_token = self.mint_access_token(
            user.id,
            Some(stored.scope.clone()),
            Some(client.client_id.clone()),
            now,
        )?;

        self.activity
            .record(ActivityEvent::TokenRefreshed {
                user_id: user.id,
                client_id: Some(client.client_id.clone()),
            })
            .await;

        // ID tokens are not reissued on refresh
        Ok(TokenResponse::new(
            access_token,
            self.config.access_token_lifetime.whole_seconds() as u64,
            stored.scope.clone(),
        )
        .with_refresh_token(raw_replacement))
    }

    /// Rejects expired or revoked tokens, flagging rotated-token reuse.
    fn check_replay(&self, stored: &RefreshToken) -> AuthResult<()> {
        if stored.is_revoked() {
            if let Some(successor) = stored.replaced_by {
                // Replay of a rotated token: the chain has to be treated
                // as compromised
                tracing::warn!(
                    token_id = %stored.id,
                    user_id = %stored.user_id,
                    client_id = ?stored.client_id,
                    replaced_by = %successor,
                    "Rotated refresh token was presented again"
                );
            }
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }

        if stored.is_expired() {
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }

        Ok(())
    }

    /// Atomically rotates a refresh token, returning the raw replacement.
    async fn rotate_refresh_token(
        &self,
        stored: &RefreshToken,
    ) -> AuthResult<(String, RefreshToken)> {
        let now = OffsetDateTime::now_utc();
        let raw = RefreshToken::generate_token();
        let replacement = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&raw),
            user_id: stored.user_id,
            client_id: stored.client_id.clone(),
            scope: stored.scope.clone(),
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
            replaced_by: None,
        };

        self.refresh_token_storage
            .rotate(&stored.token_hash, &replacement)
            .await?;

        Ok((raw, replacement))
    }

    // =========================================================================
    // First-party portal sessions
    // =========================================================================

    /// Authenticates a user with email and password and issues session
    /// tokens.
    ///
    /// The refresh token carries no client binding (`client_id = None`),
    /// marking it as a first-party session credential.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` with one indistinct message for unknown email,
    /// wrong password, and inactive account.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<SessionTokens> {
        let user = self
            .user_storage
            .find_by_email(email)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AuthError::unauthorized("Invalid email or password"))?;

        if !self.user_storage.verify_password(user.id, password).await? {
            return Err(AuthError::unauthorized("Invalid email or password"));
        }

        let now = OffsetDateTime::now_utc();
        let access_token = self.mint_access_token(user.id, None, None, now)?;
        let (raw_refresh, _) = self.issue_refresh_token(user.id, None, String::new()).await?;

        self.activity
            .record(ActivityEvent::Login {
                user_id: user.id,
                method: LoginMethod::Password,
                client_id: None,
                client_name: None,
            })
            .await;

        tracing::info!(user_id = %user.id, "Portal login");

        Ok(SessionTokens {
            user,
            access_token,
            refresh_token: raw_refresh,
            expires_in: self.config.access_token_lifetime.whole_seconds() as u64,
        })
    }

    /// Rotates a first-party session refresh token.
    ///
    /// # Errors
    ///
    /// Returns `invalid_grant` if the token is unknown, expired, revoked, or
    /// belongs to an OAuth client rather than a portal session.
    pub async fn refresh_session(&self, raw_token: &str) -> AuthResult<SessionTokens> {
        let token_hash = RefreshToken::hash_token(raw_token);
        let stored = self
            .refresh_token_storage
            .find_by_hash(&token_hash)
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

        if !stored.is_first_party() {
            return Err(AuthError::invalid_grant("Invalid refresh token"));
        }

        self.check_replay(&stored)?;

        let user = self
            .user_storage
            .find_by_id(stored.user_id)
            .await?
            .filter(|user| user.active)
            .ok_or_else(|| AuthError::invalid_grant("User not found or inactive"))?;

        let (raw_replacement, _) = self.rotate_refresh_token(&stored).await?;

        let now = OffsetDateTime::now_utc();
        let access_token = self.mint_access_token(user.id, None, None, now)?;

        self.activity
            .record(ActivityEvent::TokenRefreshed {
                user_id: user.id,
                client_id: None,
            })
            .await;

        Ok(SessionTokens {
            user,
            access_token,
            refresh_token: raw_replacement,
            expires_in: self.config.access_token_lifetime.whole_seconds() as u64,
        })
    }

    /// Revokes a refresh token by its raw value.
    ///
    /// Unknown tokens are not an error — the result distinguishes them only
    /// so callers can decide whether to emit activity events.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage operation fails.
    pub async fn revoke_by_value(&self, raw_token: &str) -> AuthResult<Option<RefreshToken>> {
        let token_hash = RefreshToken::hash_token(raw_token);
        let revoked = self.refresh_token_storage.revoke(&token_hash).await?;

        if let Some(ref token) = revoked {
            tracing::info!(token_id = %token.id, user_id = %token.user_id, "Refresh token revoked");
        }

        Ok(revoked)
    }

    /// Records a logout event for the given user.
    pub async fn record_logout(&self, user_id: Uuid) {
        self.activity
            .record(ActivityEvent::Logout { user_id })
            .await;
    }

    // =========================================================================
    // Minting helpers
    // =========================================================================

    fn mint_access_token(
        &self,
        user_id: Uuid,
        scope: Option<String>,
        client_id: Option<String>,
        now: OffsetDateTime,
    ) -> AuthResult<String> {
        let claims = AccessTokenClaims {
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            exp: (now + self.config.access_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
            scope,
            client_id,
        };

        self.jwt_service
            .encode(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode access token: {e}")))
    }

    async fn mint_id_token(
        &self,
        user: &User,
        scopes: &ScopeSet,
        client: &Client,
        nonce: Option<String>,
        now: OffsetDateTime,
    ) -> AuthResult<String> {
        let identity = assemble_identity_claims(user, scopes, self.claims_source.as_ref()).await?;

        let claims = IdTokenClaims {
            iss: self.config.issuer.clone(),
            sub: user.id.to_string(),
            aud: client.client_id.clone(),
            exp: (now + self.config.id_token_lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            auth_time: now.unix_timestamp(),
            nonce,
            identity,
        };

        self.jwt_service
            .encode(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode ID token: {e}")))
    }

    /// Issues and stores a new refresh token, returning the raw value.
    async fn issue_refresh_token(
        &self,
        user_id: Uuid,
        client_id: Option<String>,
        scope: String,
    ) -> AuthResult<(String, RefreshToken)> {
        let now = OffsetDateTime::now_utc();
        let raw = RefreshToken::generate_token();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token(&raw),
            user_id,
            client_id,
            scope,
            created_at: now,
            expires_at: now + self.config.refresh_token_lifetime,
            revoked_at: None,
            replaced_by: None,
        };

        self.refresh_token_storage.create(&token).await?;
        Ok((raw, token))
    }

    /// Gets the JWT service reference.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt_service
    }

    /// Gets the user storage reference.
    #[must_use]
    pub fn user_storage(&self) -> &Arc<dyn UserStorage> {
        &self.user_storage
    }

    /// Gets the claims source reference.
    #[must_use]
    pub fn claims_source(&self) -> &Arc<dyn ClaimsSource> {
        &self.claims_source
    }

    /// Gets the service configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{PermissionClaim, RoleClaim, TeamClaim, WorkspaceClaim};
    use crate::storage::activity::TracingActivitySink;
    use crate::token::jwt::{SigningAlgorithm, SigningKeyPair};
    use crate::types::ClientType;
    use std::collections::HashMap;
    use std::sync::RwLock;

    // -------------------------------------------------------------------------
    // Mock storages
    // -------------------------------------------------------------------------

    struct MockCodeStorage {
        codes: RwLock<HashMap<String, AuthorizationCode>>,
    }

    impl MockCodeStorage {
        fn new() -> Self {
            Self {
                codes: RwLock::new(HashMap::new()),
            }
        }

        fn add(&self, code: AuthorizationCode) {
            self.codes.write().unwrap().insert(code.code.clone(), code);
        }
    }

    #[async_trait::async_trait]
    impl AuthorizationCodeStorage for MockCodeStorage {
        async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
            self.add(code.clone());
            Ok(())
        }

        async fn find_by_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
            Ok(self.codes.read().unwrap().get(code).cloned())
        }

        async fn consume(&self, code: &str) -> AuthResult<AuthorizationCode> {
            let mut codes = self.codes.write().unwrap();
            let record = codes
                .get_mut(code)
                .ok_or_else(|| AuthError::invalid_grant("Invalid authorization code"))?;

            if !record.is_valid() {
                return Err(AuthError::invalid_grant("Invalid authorization code"));
            }

            record.consumed_at = Some(OffsetDateTime::now_utc());
            Ok(record.clone())
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }

        async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64> {
            let mut codes = self.codes.write().unwrap();
            let before = codes.len();
            codes.retain(|_, c| c.client_id != client_id);
            Ok((before - codes.len()) as u64)
        }
    }

    struct MockRefreshTokenStorage {
        tokens: RwLock<HashMap<String, RefreshToken>>,
    }

    impl MockRefreshTokenStorage {
        fn new() -> Self {
            Self {
                tokens: RwLock::new(HashMap::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl RefreshTokenStorage for MockRefreshTokenStorage {
        async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
            self.tokens
                .write()
                .unwrap()
                .insert(token.token_hash.clone(), token.clone());
            Ok(())
        }

        async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(self.tokens.read().unwrap().get(token_hash).cloned())
        }

        async fn rotate(&self, token_hash: &str, replacement: &RefreshToken) -> AuthResult<()> {
            let mut tokens = self.tokens.write().unwrap();
            let old = tokens
                .get_mut(token_hash)
                .ok_or_else(|| AuthError::invalid_grant("Invalid refresh token"))?;

            if !old.is_valid() {
                return Err(AuthError::invalid_grant("Invalid refresh token"));
            }

            old.revoked_at = Some(OffsetDateTime::now_utc());
            old.replaced_by = Some(replacement.id);
            tokens.insert(replacement.token_hash.clone(), replacement.clone());
            Ok(())
        }

        async fn revoke(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
            let mut tokens = self.tokens.write().unwrap();
            match tokens.get_mut(token_hash) {
                Some(token) => {
                    if token.revoked_at.is_none() {
                        token.revoked_at = Some(OffsetDateTime::now_utc());
                    }
                    Ok(Some(token.clone()))
                }
                None => Ok(None),
            }
        }

        async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let mut count = 0;
            for token in tokens.values_mut() {
                if token.client_id.as_deref() == Some(client_id) && token.revoked_at.is_none() {
                    token.revoked_at = Some(OffsetDateTime::now_utc());
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn revoke_by_user(&self, user_id: Uuid) -> AuthResult<u64> {
            let mut tokens = self.tokens.write().unwrap();
            let mut count = 0;
            for token in tokens.values_mut() {
                if token.user_id == user_id && token.revoked_at.is_none() {
                    token.revoked_at = Some(OffsetDateTime::now_utc());
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }

        async fn list_by_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
            Ok(self
                .tokens
                .read()
                .unwrap()
                .values()
                .filter(|t| t.user_id == user_id && t.is_valid())
                .cloned()
                .collect())
        }
    }

    struct MockUserStorage {
        users: RwLock<HashMap<Uuid, (User, String)>>,
    }

    impl MockUserStorage {
        fn new() -> Self {
            Self {
                users: RwLock::new(HashMap::new()),
            }
        }

        fn add(&self, user: User, password: &str) {
            self.users
                .write()
                .unwrap()
                .insert(user.id, (user, password.to_string()));
        }
    }

    #[async_trait::async_trait]
    impl UserStorage for MockUserStorage {
        async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
            Ok(self.users.read().unwrap().get(&id).map(|(u, _)| u.clone()))
        }

        async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
            Ok(self
                .users
                .read()
                .unwrap()
                .values()
                .find(|(u, _)| u.email == email)
                .map(|(u, _)| u.clone()))
        }

        async fn verify_password(&self, user_id: Uuid, password: &str) -> AuthResult<bool> {
            Ok(self
                .users
                .read()
                .unwrap()
                .get(&user_id)
                .is_some_and(|(_, stored)| stored == password))
        }
    }

    struct StubClaimsSource;

    #[async_trait::async_trait]
    impl ClaimsSource for StubClaimsSource {
        async fn teams(&self, _user_id: Uuid) -> AuthResult<Vec<TeamClaim>> {
            Ok(vec![TeamClaim {
                name: "Platform".to_string(),
                slug: "platform".to_string(),
            }])
        }

        async fn roles(&self, _user_id: Uuid) -> AuthResult<Vec<RoleClaim>> {
            Ok(vec![])
        }

        async fn workspaces(&self, _user_id: Uuid) -> AuthResult<Vec<WorkspaceClaim>> {
            Ok(vec![])
        }

        async fn permissions(&self, _user_id: Uuid) -> AuthResult<Vec<PermissionClaim>> {
            Ok(vec![])
        }
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    const VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";

    struct TestHarness {
        service: TokenService,
        codes: Arc<MockCodeStorage>,
        refresh_tokens: Arc<MockRefreshTokenStorage>,
        users: Arc<MockUserStorage>,
    }

    fn harness() -> TestHarness {
        let key_pair = SigningKeyPair::generate_rsa("test-key", SigningAlgorithm::RS256).unwrap();
        let jwt_service = Arc::new(JwtService::new(key_pair, "https://sso.example.com"));

        let codes = Arc::new(MockCodeStorage::new());
        let refresh_tokens = Arc::new(MockRefreshTokenStorage::new());
        let users = Arc::new(MockUserStorage::new());

        let service = TokenService::new(
            jwt_service,
            codes.clone(),
            refresh_tokens.clone(),
            users.clone(),
            Arc::new(StubClaimsSource),
            Arc::new(TracingActivitySink),
            TokenConfig::new("https://sso.example.com"),
        );

        TestHarness {
            service,
            codes,
            refresh_tokens,
            users,
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            avatar: None,
            active: true,
            system_owner: false,
        }
    }

    fn test_client() -> Client {
        let now = OffsetDateTime::now_utc();
        Client {
            client_id: "lat_app".to_string(),
            client_secret_hash: None,
            name: "Example App".to_string(),
            description: None,
            client_type: ClientType::Public,
            redirect_uris: vec!["https://app.example.com/callback".to_string()],
            allowed_scopes: vec!["openid".to_string(), "profile".to_string()],
            owner_id: Uuid::new_v4(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn test_code(user_id: Uuid, scope: &str) -> AuthorizationCode {
        let verifier = PkceVerifier::new(VERIFIER.to_string()).unwrap();
        let challenge = PkceChallenge::from_verifier(&verifier);
        let now = OffsetDateTime::now_utc();

        AuthorizationCode {
            id: Uuid::new_v4(),
            code: "test-auth-code".to_string(),
            client_id: "lat_app".to_string(),
            user_id,
            redirect_uri: "https://app.example.com/callback".to_string(),
            scope: scope.to_string(),
            nonce: Some("nonce-123".to_string()),
            code_challenge: Some(challenge.into_inner()),
            code_challenge_method: Some("S256".to_string()),
            created_at: now,
            expires_at: now + Duration::minutes(10),
            consumed_at: None,
        }
    }

    fn exchange_request(code: &str, verifier: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.to_string()),
            redirect_uri: Some("https://app.example.com/callback".to_string()),
            code_verifier: Some(verifier.to_string()),
            client_id: Some("lat_app".to_string()),
            client_secret: None,
            refresh_token: None,
        }
    }

    fn refresh_request(token: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "refresh_token".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id: Some("lat_app".to_string()),
            client_secret: None,
            refresh_token: Some(token.to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // Authorization code exchange
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_exchange_code_success() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid profile"));

        let response = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &test_client())
            .await
            .unwrap();

        assert!(!response.access_token.is_empty());
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 900);
        assert_eq!(response.scope, "openid profile");
        // Refresh token is always issued on code exchange
        assert!(response.refresh_token.is_some());
        // ID token issued because openid is in scope
        assert!(response.id_token.is_some());

        // The ID token carries the nonce and audience
        let decoded = h
            .service
            .jwt_service()
            .decode::<IdTokenClaims>(response.id_token.as_ref().unwrap())
            .unwrap();
        assert_eq!(decoded.claims.aud, "lat_app");
        assert_eq!(decoded.claims.nonce.as_deref(), Some("nonce-123"));
        assert_eq!(decoded.claims.sub, user.id.to_string());
    }

    #[tokio::test]
    async fn test_exchange_code_without_openid_scope_has_no_id_token() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "profile"));

        let response = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &test_client())
            .await
            .unwrap();

        assert!(response.id_token.is_none());
        assert!(response.refresh_token.is_some());
    }

    #[tokio::test]
    async fn test_exchange_code_twice_fails() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let request = exchange_request("test-auth-code", VERIFIER);
        assert!(h.service.exchange_code(&request, &test_client()).await.is_ok());

        let second = h.service.exchange_code(&request, &test_client()).await;
        assert!(matches!(second, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_unknown_code() {
        let h = harness();
        let result = h
            .service
            .exchange_code(&exchange_request("no-such-code", VERIFIER), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_expired_code() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");

        let mut code = test_code(user.id, "openid");
        code.expires_at = OffsetDateTime::now_utc() - Duration::minutes(1);
        h.codes.add(code);

        let result = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_client_mismatch() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let mut other = test_client();
        other.client_id = "lat_other".to_string();

        let result = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &other)
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));

        // The failed attempt must not have burned the code
        let record = h.codes.find_by_code("test-auth-code").await.unwrap().unwrap();
        assert!(!record.is_consumed());
    }

    #[tokio::test]
    async fn test_exchange_redirect_uri_mismatch() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let mut request = exchange_request("test-auth-code", VERIFIER);
        // Registered for the client, but not what the code was issued with
        request.redirect_uri = Some("https://app.example.com/other".to_string());

        let result = h.service.exchange_code(&request, &test_client()).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_pkce_failure() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let wrong = "wrong-verifier-that-is-long-enough-for-pkce";
        let result = h
            .service
            .exchange_code(&exchange_request("test-auth-code", wrong), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::PkceVerificationFailed)));
    }

    #[tokio::test]
    async fn test_exchange_missing_verifier() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let mut request = exchange_request("test-auth-code", VERIFIER);
        request.code_verifier = None;

        let result = h.service.exchange_code(&request, &test_client()).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_plain_pkce() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");

        let mut code = test_code(user.id, "openid");
        code.code_challenge = Some(VERIFIER.to_string());
        code.code_challenge_method = Some("plain".to_string());
        h.codes.add(code);

        let response = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &test_client())
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_exchange_without_pkce_challenge() {
        // Confidential-client code with no stored challenge: verifier unused
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");

        let mut code = test_code(user.id, "openid");
        code.code_challenge = None;
        code.code_challenge_method = None;
        h.codes.add(code);

        let mut request = exchange_request("test-auth-code", VERIFIER);
        request.code_verifier = None;

        assert!(h.service.exchange_code(&request, &test_client()).await.is_ok());
    }

    #[tokio::test]
    async fn test_exchange_inactive_user() {
        let h = harness();
        let mut user = test_user();
        user.active = false;
        h.users.add(user.clone(), "password");
        h.codes.add(test_code(user.id, "openid"));

        let result = h
            .service
            .exchange_code(&exchange_request("test-auth-code", VERIFIER), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_exchange_wrong_grant_type() {
        let h = harness();
        let mut request = exchange_request("test-auth-code", VERIFIER);
        request.grant_type = "client_credentials".to_string();

        let result = h.service.exchange_code(&request, &test_client()).await;
        assert!(matches!(result, Err(AuthError::UnsupportedGrantType { .. })));
    }

    // -------------------------------------------------------------------------
    // Refresh token grant
    // -------------------------------------------------------------------------

    async fn seeded_refresh_token(h: &TestHarness, user_id: Uuid, client_id: Option<&str>) -> String {
        let raw = RefreshToken::generate_token();
        let now = OffsetDateTime::now_utc();
        h.refresh_tokens
            .create(&RefreshToken {
                id: Uuid::new_v4(),
                token_hash: RefreshToken::hash_token(&raw),
                user_id,
                client_id: client_id.map(String::from),
                scope: "openid profile".to_string(),
                created_at: now,
                expires_at: now + Duration::days(7),
                revoked_at: None,
                replaced_by: None,
            })
            .await
            .unwrap();
        raw
    }

    #[tokio::test]
    async fn test_refresh_success_rotates() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        let raw = seeded_refresh_token(&h, user.id, Some("lat_app")).await;

        let response = h
            .service
            .refresh(&refresh_request(&raw), &test_client())
            .await
            .unwrap();

        assert!(!response.access_token.is_empty());
        assert!(response.id_token.is_none());
        let new_raw = response.refresh_token.clone().unwrap();
        assert_ne!(new_raw, raw);

        // Old token revoked and chained to its replacement
        let old = h
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&raw))
            .await
            .unwrap()
            .unwrap();
        assert!(old.is_revoked());
        let new = h
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&new_raw))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.replaced_by, Some(new.id));
        assert!(new.is_valid());
    }

    #[tokio::test]
    async fn test_refresh_replay_after_rotation_fails() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        let raw = seeded_refresh_token(&h, user.id, Some("lat_app")).await;

        let request = refresh_request(&raw);
        assert!(h.service.refresh(&request, &test_client()).await.is_ok());

        let replay = h.service.refresh(&request, &test_client()).await;
        assert!(matches!(replay, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let h = harness();
        let result = h
            .service
            .refresh(&refresh_request("unknown-token"), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_client_mismatch() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        let raw = seeded_refresh_token(&h, user.id, Some("lat_other")).await;

        let result = h
            .service
            .refresh(&refresh_request(&raw), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_rejects_first_party_token() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "password");
        let raw = seeded_refresh_token(&h, user.id, None).await;

        let result = h
            .service
            .refresh(&refresh_request(&raw), &test_client())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    // -------------------------------------------------------------------------
    // First-party sessions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_login_success() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "hunter2");

        let session = h.service.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(session.user.id, user.id);
        assert_eq!(session.expires_in, 900);

        // Session access tokens carry no OAuth claims
        let decoded = h
            .service
            .jwt_service()
            .decode::<AccessTokenClaims>(&session.access_token)
            .unwrap();
        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert!(decoded.claims.scope.is_none());
        assert!(decoded.claims.client_id.is_none());

        // The stored refresh token is first-party
        let stored = h
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&session.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_first_party());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let h = harness();
        h.users.add(test_user(), "hunter2");

        let result = h.service.login("ada@example.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_login_unknown_email_same_error() {
        let h = harness();
        let result = h.service.login("nobody@example.com", "hunter2").await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_login_inactive_user() {
        let h = harness();
        let mut user = test_user();
        user.active = false;
        h.users.add(user, "hunter2");

        let result = h.service.login("ada@example.com", "hunter2").await;
        assert!(matches!(result, Err(AuthError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_refresh_session_rotates() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "hunter2");

        let session = h.service.login("ada@example.com", "hunter2").await.unwrap();
        let renewed = h
            .service
            .refresh_session(&session.refresh_token)
            .await
            .unwrap();
        assert_ne!(renewed.refresh_token, session.refresh_token);

        // The original cookie value is now dead
        let replay = h.service.refresh_session(&session.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_refresh_session_rejects_client_token() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "hunter2");
        let raw = seeded_refresh_token(&h, user.id, Some("lat_app")).await;

        let result = h.service.refresh_session(&raw).await;
        assert!(matches!(result, Err(AuthError::InvalidGrant { .. })));
    }

    #[tokio::test]
    async fn test_revoke_by_value() {
        let h = harness();
        let user = test_user();
        h.users.add(user.clone(), "hunter2");
        let raw = seeded_refresh_token(&h, user.id, None).await;

        let revoked = h.service.revoke_by_value(&raw).await.unwrap();
        assert!(revoked.is_some());

        let stored = h
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&raw))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_revoked());

        // Unknown tokens are a non-error
        let unknown = h.service.revoke_by_value("does-not-exist").await.unwrap();
        assert!(unknown.is_none());
    }

    #[test]
    fn test_token_config_from_config() {
        let config = TokenConfig::from_config(&AuthConfig::default());
        assert_eq!(config.issuer, "http://localhost:8000");
        assert_eq!(config.access_token_lifetime, Duration::minutes(15));
        assert_eq!(config.refresh_token_lifetime, Duration::days(7));
        assert_eq!(config.id_token_lifetime, Duration::hours(1));
    }

    #[test]
    fn test_token_config_builder() {
        let config = TokenConfig::new("https://sso.example.com")
            .with_access_token_lifetime(Duration::minutes(5))
            .with_refresh_token_lifetime(Duration::days(30))
            .with_id_token_lifetime(Duration::minutes(30));

        assert_eq!(config.access_token_lifetime, Duration::minutes(5));
        assert_eq!(config.refresh_token_lifetime, Duration::days(30));
        assert_eq!(config.id_token_lifetime, Duration::minutes(30));
    }
}
