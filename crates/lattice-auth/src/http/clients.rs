//! OAuth client management endpoints.
//!
//! Administrative surface, restricted to system owners:
//!
//! - `GET /auth/clients` - list registrations
//! - `POST /auth/clients` - register a client (secret shown once)
//! - `GET /auth/clients/{client_id}` - registration details
//! - `DELETE /auth/clients/{client_id}` - delete, cascading to the client's
//!   codes and refresh tokens
//! - `POST /auth/clients/{client_id}/rotate-secret` - rotate the secret
//!
//! These endpoints are not part of the OAuth protocol surface.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::client_secret::{generate_client_credentials, hash_client_secret};
use crate::error::AuthError;
use crate::middleware::{AuthState, BearerAuth};
use crate::storage::client::ClientStorage;
use crate::storage::code::AuthorizationCodeStorage;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::types::{Client, ClientType};

/// State required for the client management endpoints.
#[derive(Clone)]
pub struct ClientAdminState {
    /// Bearer authentication for the admin check.
    pub auth_state: AuthState,

    /// Client registrations.
    pub client_storage: Arc<dyn ClientStorage>,

    /// Authorization codes, for the delete cascade.
    pub code_storage: Arc<dyn AuthorizationCodeStorage>,

    /// Refresh tokens, for the delete cascade.
    pub refresh_token_storage: Arc<dyn RefreshTokenStorage>,
}

impl ClientAdminState {
    /// Creates a new client admin state.
    pub fn new(
        auth_state: AuthState,
        client_storage: Arc<dyn ClientStorage>,
        code_storage: Arc<dyn AuthorizationCodeStorage>,
        refresh_token_storage: Arc<dyn RefreshTokenStorage>,
    ) -> Self {
        Self {
            auth_state,
            client_storage,
            code_storage,
            refresh_token_storage,
        }
    }
}

impl axum::extract::FromRef<ClientAdminState> for AuthState {
    fn from_ref(state: &ClientAdminState) -> Self {
        state.auth_state.clone()
    }
}

/// Request body for registering a client.
#[derive(Debug, Deserialize)]
pub struct ClientCreateRequest {
    /// Display name.
    pub name: String,

    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,

    /// Public or confidential.
    pub client_type: ClientType,

    /// Allowed redirect URIs (exact matches).
    pub redirect_uris: Vec<String>,

    /// Scopes the client may request.
    pub allowed_scopes: Vec<String>,
}

/// Client registration as returned by the admin endpoints.
/// Never includes the secret hash.
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    /// OAuth client identifier.
    pub client_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Public or confidential.
    pub client_type: ClientType,
    /// Allowed redirect URIs.
    pub redirect_uris: Vec<String>,
    /// Allowed scopes.
    pub allowed_scopes: Vec<String>,
    /// Whether the client is active.
    pub active: bool,
    /// Creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last update timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            client_id: client.client_id,
            name: client.name,
            description: client.description,
            client_type: client.client_type,
            redirect_uris: client.redirect_uris,
            allowed_scopes: client.allowed_scopes,
            active: client.active,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// Client registration plus the plaintext secret, returned exactly once at
/// creation and rotation.
#[derive(Debug, Serialize)]
pub struct ClientWithSecret {
    /// The registration.
    #[serde(flatten)]
    pub client: ClientResponse,

    /// Plaintext client secret. Absent for public clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// Handler for `GET /auth/clients`.
pub async fn list_clients_handler(
    State(state): State<ClientAdminState>,
    BearerAuth(auth): BearerAuth,
) -> Result<Json<Vec<ClientResponse>>, AuthError> {
    auth.require_system_owner()?;

    let clients = state.client_storage.list(100, 0).await?;
    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

/// Handler for `POST /auth/clients`.
///
/// Generates the client credentials; only the secret's hash is persisted and
/// the plaintext appears in this response alone.
pub async fn create_client_handler(
    State(state): State<ClientAdminState>,
    BearerAuth(auth): BearerAuth,
    Json(request): Json<ClientCreateRequest>,
) -> Result<Json<ClientWithSecret>, AuthError> {
    auth.require_system_owner()?;

    let (client_id, client_secret) = generate_client_credentials();

    let client_secret_hash = match request.client_type {
        ClientType::Confidential => Some(
            hash_client_secret(&client_secret)
                .map_err(|e| AuthError::internal(format!("Failed to hash client secret: {e}")))?,
        ),
        ClientType::Public => None,
    };

    let now = OffsetDateTime::now_utc();
    let client = Client {
        client_id,
        client_secret_hash,
        name: request.name,
        description: request.description,
        client_type: request.client_type,
        redirect_uris: request.redirect_uris,
        allowed_scopes: request.allowed_scopes,
        owner_id: auth.user.id,
        active: true,
        created_at: now,
        updated_at: now,
    };

    client
        .validate()
        .map_err(|e| AuthError::invalid_request(e.to_string()))?;

    let created = state.client_storage.create(&client).await?;

    tracing::info!(
        client_id = %created.client_id,
        client_type = %created.client_type,
        owner_id = %auth.user.id,
        "OAuth client registered"
    );

    Ok(Json(ClientWithSecret {
        client: created.into(),
        client_secret: match request.client_type {
            ClientType::Confidential => Some(client_secret),
            ClientType::Public => None,
        },
    }))
}

/// Handler for `GET /auth/clients/{client_id}`.
pub async fn get_client_handler(
    State(state): State<ClientAdminState>,
    BearerAuth(auth): BearerAuth,
    Path(client_id): Path<String>,
) -> Result<Json<ClientResponse>, AuthError> {
    auth.require_system_owner()?;

    let client = state
        .client_storage
        .find_by_client_id(&client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    Ok(Json(client.into()))
}

/// Handler for `DELETE /auth/clients/{client_id}`.
///
/// Deletes the registration and cascades: the client's authorization codes
/// are removed and its refresh tokens revoked, so nothing issued to the
/// client remains redeemable.
pub async fn delete_client_handler(
    State(state): State<ClientAdminState>,
    BearerAuth(auth): BearerAuth,
    Path(client_id): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    auth.require_system_owner()?;

    state.client_storage.delete(&client_id).await?;
    let codes = state.code_storage.delete_by_client(&client_id).await?;
    let tokens = state
        .refresh_token_storage
        .revoke_by_client(&client_id)
        .await?;

    tracing::info!(
        client_id = %client_id,
        codes_deleted = codes,
        tokens_revoked = tokens,
        "OAuth client deleted"
    );

    Ok(Json(json!({ "message": "Client deleted" })))
}

/// Handler for `POST /auth/clients/{client_id}/rotate-secret`.
///
/// The old secret stops working immediately; outstanding refresh tokens
/// remain valid.
pub async fn rotate_secret_handler(
    State(state): State<ClientAdminState>,
    BearerAuth(auth): BearerAuth,
    Path(client_id): Path<String>,
) -> Result<Json<ClientWithSecret>, AuthError> {
    auth.require_system_owner()?;

    let client = state
        .client_storage
        .find_by_client_id(&client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.is_confidential() {
        return Err(AuthError::invalid_request(
            "Public clients don't have secrets",
        ));
    }

    let (updated, secret) = state.client_storage.regenerate_secret(&client_id).await?;

    tracing::info!(client_id = %client_id, "Client secret rotated");

    Ok(Json(ClientWithSecret {
        client: updated.into(),
        client_secret: Some(secret),
    }))
}
