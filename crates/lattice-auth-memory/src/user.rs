//! In-memory user storage.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use uuid::Uuid;

use lattice_auth::AuthResult;
use lattice_auth::error::AuthError;
use lattice_auth::storage::user::{User, UserStorage};

struct StoredUser {
    user: User,
    password_hash: Option<String>,
}

/// In-memory implementation of [`UserStorage`].
///
/// Passwords are stored as Argon2id PHC hashes, same as a real backend.
#[derive(Default)]
pub struct MemoryUserStorage {
    users: RwLock<HashMap<Uuid, StoredUser>>,
}

impl MemoryUserStorage {
    /// Creates an empty user storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user with a password.
    ///
    /// # Errors
    ///
    /// Returns an error if password hashing fails.
    pub fn insert_with_password(&self, user: User, password: &str) -> AuthResult<()> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(format!("Failed to hash password: {e}")))?
            .to_string();

        self.users.write().unwrap().insert(
            user.id,
            StoredUser {
                user,
                password_hash: Some(hash),
            },
        );
        Ok(())
    }

    /// Inserts a user without a password (federated/SSO-only accounts).
    pub fn insert(&self, user: User) {
        self.users.write().unwrap().insert(
            user.id,
            StoredUser {
                user,
                password_hash: None,
            },
        );
    }
}

#[async_trait]
impl UserStorage for MemoryUserStorage {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .get(&id)
            .map(|stored| stored.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .values()
            .find(|stored| stored.user.email == email)
            .map(|stored| stored.user.clone()))
    }

    async fn verify_password(&self, user_id: Uuid, password: &str) -> AuthResult<bool> {
        let hash = {
            let users = self.users.read().unwrap();
            let stored = users
                .get(&user_id)
                .ok_or_else(|| AuthError::unauthorized("User not found"))?;
            stored.password_hash.clone()
        };

        let Some(hash) = hash else {
            // No password set: password login is not available
            return Ok(false);
        };

        let parsed = PasswordHash::new(&hash)
            .map_err(|e| AuthError::internal(format!("Stored password hash is invalid: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}
