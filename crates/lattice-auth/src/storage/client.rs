//! Client storage trait.
//!
//! Defines the interface for OAuth client persistence operations.
//! Implementations are provided by storage backends.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for OAuth 2.0 clients.
///
/// This trait defines the interface for persisting and retrieving OAuth
/// client registrations. Implementations handle the actual database
/// operations.
///
/// # Example
///
/// ```ignore
/// use lattice_auth::storage::ClientStorage;
///
/// async fn example(storage: &impl ClientStorage) {
///     if let Some(client) = storage.find_by_client_id("lat_9f8e7d6c").await? {
///         println!("Found client: {}", client.name);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns `None` if no such client exists. Callers decide how to treat
    /// inactive clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Create a new client.
    ///
    /// The client is validated before creation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client validation fails
    /// - A client with the same client_id already exists
    /// - The storage operation fails
    async fn create(&self, client: &Client) -> AuthResult<Client>;

    /// Delete a client registration.
    ///
    /// Callers are responsible for cascading: the client's outstanding
    /// authorization codes and refresh tokens must be invalidated alongside
    /// (see `AuthorizationCodeStorage::delete_by_client` and
    /// `RefreshTokenStorage::revoke_by_client`).
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist or the operation fails.
    async fn delete(&self, client_id: &str) -> AuthResult<()>;

    /// List registered clients.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of clients to return
    /// * `offset` - Number of clients to skip for pagination
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self, limit: i64, offset: i64) -> AuthResult<Vec<Client>>;

    /// Verify a client secret.
    ///
    /// Compares the provided secret against the stored Argon2 hash.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the secret matches
    /// - `Ok(false)` if the secret doesn't match or the client has no secret
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist or the operation fails.
    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool>;

    /// Rotate a confidential client's secret.
    ///
    /// Generates a new secret, persists only its hash, and returns the
    /// updated client together with the plaintext secret. The plaintext is
    /// shown once and never stored; authentication attempts with the old
    /// secret fail immediately, while outstanding refresh tokens remain
    /// valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist, is not confidential,
    /// or the operation fails.
    async fn regenerate_secret(&self, client_id: &str) -> AuthResult<(Client, String)>;
}
