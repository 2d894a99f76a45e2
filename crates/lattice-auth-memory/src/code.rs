//! In-memory authorization code storage.
//!
//! `consume` is a compare-and-set under the map's write lock, so two
//! concurrent exchanges of the same code get exactly one success.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use lattice_auth::AuthResult;
use lattice_auth::error::AuthError;
use lattice_auth::oauth::code::AuthorizationCode;
use lattice_auth::storage::code::AuthorizationCodeStorage;

/// In-memory implementation of [`AuthorizationCodeStorage`].
#[derive(Default)]
pub struct MemoryAuthorizationCodeStorage {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
}

impl MemoryAuthorizationCodeStorage {
    /// Creates an empty code storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for MemoryAuthorizationCodeStorage {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        let mut codes = self.codes.write().unwrap();
        if codes.contains_key(&code.code) {
            return Err(AuthError::storage("Authorization code collision"));
        }
        codes.insert(code.code.clone(), code.clone());
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

        // The whole check-and-set runs under the write lock; losers of a
        // concurrent exchange observe consumed_at already set
        if record.consumed_at.is_some() || OffsetDateTime::now_utc() > record.expires_at {
            return Err(AuthError::invalid_grant("Invalid authorization code"));
        }

        record.consumed_at = Some(OffsetDateTime::now_utc());
        Ok(record.clone())
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.is_valid());
        Ok((before - codes.len()) as u64)
    }

    async fn delete_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.client_id != client_id);
        Ok((before - codes.len()) as u64)
    }
}
