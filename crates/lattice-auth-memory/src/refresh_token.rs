//! In-memory refresh token storage.
//!
//! `rotate` revokes the old record and inserts its replacement under one
//! write lock, so concurrent refreshes of the same token get exactly one
//! winner.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use lattice_auth::AuthResult;
use lattice_auth::error::AuthError;
use lattice_auth::storage::refresh_token::RefreshTokenStorage;
use lattice_auth::types::refresh_token::RefreshToken;

/// In-memory implementation of [`RefreshTokenStorage`].
#[derive(Default)]
pub struct MemoryRefreshTokenStorage {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl MemoryRefreshTokenStorage {
    /// Creates an empty refresh token storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::storage("Refresh token hash collision"));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
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

        // Conditional update: only an unrevoked, unexpired token rotates.
        // Losers of a concurrent refresh observe revoked_at already set.
        if old.revoked_at.is_some() || OffsetDateTime::now_utc() > old.expires_at {
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
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| !t.is_expired());
        Ok((before - tokens.len()) as u64)
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
