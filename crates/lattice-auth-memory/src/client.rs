//! In-memory client storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;

use lattice_auth::client_secret::{hash_client_secret, verify_client_secret};
use lattice_auth::error::AuthError;
use lattice_auth::storage::client::ClientStorage;
use lattice_auth::AuthResult;
use lattice_auth::types::Client;

/// In-memory implementation of [`ClientStorage`].
#[derive(Default)]
pub struct MemoryClientStorage {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStorage {
    /// Creates an empty client storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientStorage for MemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.clients.read().unwrap().get(client_id).cloned())
    }

    async fn create(&self, client: &Client) -> AuthResult<Client> {
        client
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        let mut clients = self.clients.write().unwrap();
        if clients.contains_key(&client.client_id) {
            return Err(AuthError::invalid_request(format!(
                "Client {} already exists",
                client.client_id
            )));
        }

        clients.insert(client.client_id.clone(), client.clone());
        Ok(client.clone())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<()> {
        self.clients
            .write()
            .unwrap()
            .remove(client_id)
            .map(|_| ())
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))
    }

    async fn list(&self, limit: i64, offset: i64) -> AuthResult<Vec<Client>> {
        let clients = self.clients.read().unwrap();
        let mut all: Vec<Client> = clients.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
        let hash = {
            let clients = self.clients.read().unwrap();
            let client = clients
                .get(client_id)
                .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;
            client.client_secret_hash.clone()
        };

        match hash {
            Some(hash) => verify_client_secret(secret, &hash)
                .map_err(|e| AuthError::internal(format!("Stored secret hash is invalid: {e}"))),
            None => Ok(false),
        }
    }

    async fn regenerate_secret(&self, client_id: &str) -> AuthResult<(Client, String)> {
        // The new secret reuses the generator's secret half only; the
        // client_id is stable for the registration's lifetime
        let (_, new_secret) = lattice_auth::client_secret::generate_client_credentials();
        let new_hash = hash_client_secret(&new_secret)
            .map_err(|e| AuthError::internal(format!("Failed to hash client secret: {e}")))?;

        let mut clients = self.clients.write().unwrap();
        let client = clients
            .get_mut(client_id)
            .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.is_confidential() {
            return Err(AuthError::invalid_request(
                "Public clients don't have secrets",
            ));
        }

        client.client_secret_hash = Some(new_hash);
        client.updated_at = OffsetDateTime::now_utc();
        Ok((client.clone(), new_secret))
    }
}
