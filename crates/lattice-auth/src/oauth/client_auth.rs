//! Client authentication for the token and revocation endpoints.
//!
//! Clients authenticate using one of:
//!
//! - HTTP Basic Auth header: `Authorization: Basic <base64(client_id:secret)>`
//! - Request body: `client_id` and `client_secret` parameters
//! - Public client: just `client_id` (authorization_code with PKCE)
//!
//! Confidential clients must present a correct secret on every call; the
//! secret is verified against the stored Argon2 hash by the client storage.

use std::sync::Arc;

use axum::http::HeaderMap;
use base64::Engine;

use crate::error::AuthError;
use crate::storage::client::ClientStorage;
use crate::types::Client;

/// Client authentication credentials extracted from a request.
#[derive(Debug)]
pub enum ClientAuth {
    /// HTTP Basic authentication.
    Basic {
        /// Client identifier.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// Client credentials in the request body.
    Body {
        /// Client identifier.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
    /// Public client (no secret).
    Public {
        /// Client identifier.
        client_id: String,
    },
    /// No client credentials provided.
    None,
}

impl ClientAuth {
    /// Extract client authentication from headers and body parameters.
    ///
    /// The Authorization header wins over body credentials when both are
    /// present.
    #[must_use]
    pub fn extract(
        headers: &HeaderMap,
        client_id: Option<&str>,
        client_secret: Option<&str>,
    ) -> Self {
        if let Some((id, secret)) = parse_basic_auth(headers) {
            return Self::Basic {
                client_id: id,
                client_secret: secret,
            };
        }

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Self::Body {
                client_id: id.to_string(),
                client_secret: secret.to_string(),
            },
            (Some(id), None) => Self::Public {
                client_id: id.to_string(),
            },
            _ => Self::None,
        }
    }
}

/// Parses HTTP Basic credentials from the Authorization header.
#[must_use]
pub fn parse_basic_auth(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = credentials.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}

/// Authenticates a client from extracted credentials.
///
/// Looks the client up, checks that it is active, and verifies the secret
/// for confidential clients. Public clients pass with only their identifier;
/// their protection is PKCE at code exchange.
///
/// # Errors
///
/// Returns `InvalidClient` for unknown or inactive clients, missing
/// credentials, or a failed secret check.
pub async fn authenticate_client(
    client_storage: &Arc<dyn ClientStorage>,
    auth: ClientAuth,
) -> Result<Client, AuthError> {
    let (client_id, secret) = match auth {
        ClientAuth::Basic {
            client_id,
            client_secret,
        }
        | ClientAuth::Body {
            client_id,
            client_secret,
        } => (client_id, Some(client_secret)),
        ClientAuth::Public { client_id } => (client_id, None),
        ClientAuth::None => {
            return Err(AuthError::invalid_client("No client credentials provided"));
        }
    };

    let client = client_storage
        .find_by_client_id(&client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.active {
        return Err(AuthError::invalid_client("Client is inactive"));
    }

    if client.is_confidential() {
        let provided = secret.ok_or_else(|| {
            AuthError::invalid_client("Client secret required for confidential client")
        })?;

        let valid = client_storage.verify_secret(&client_id, &provided).await?;
        if !valid {
            return Err(AuthError::invalid_client("Invalid client secret"));
        }
    }

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basic_auth() {
        let mut headers = HeaderMap::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode("lat_app:sekrit");
        headers.insert("authorization", format!("Basic {encoded}").parse().unwrap());

        let auth = ClientAuth::extract(&headers, None, None);
        match auth {
            ClientAuth::Basic {
                client_id,
                client_secret,
            } => {
                assert_eq!(client_id, "lat_app");
                assert_eq!(client_secret, "sekrit");
            }
            other => panic!("expected Basic auth, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_basic_auth_wins_over_body() {
        let mut headers = HeaderMap::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode("lat_header:header-secret");
        headers.insert("authorization", format!("Basic {encoded}").parse().unwrap());

        let auth = ClientAuth::extract(&headers, Some("lat_body"), Some("body-secret"));
        assert!(matches!(auth, ClientAuth::Basic { client_id, .. } if client_id == "lat_header"));
    }

    #[test]
    fn test_extract_body_auth() {
        let auth = ClientAuth::extract(&HeaderMap::new(), Some("lat_app"), Some("sekrit"));
        match auth {
            ClientAuth::Body {
                client_id,
                client_secret,
            } => {
                assert_eq!(client_id, "lat_app");
                assert_eq!(client_secret, "sekrit");
            }
            other => panic!("expected Body auth, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_public_client() {
        let auth = ClientAuth::extract(&HeaderMap::new(), Some("lat_app"), None);
        assert!(matches!(auth, ClientAuth::Public { client_id } if client_id == "lat_app"));
    }

    #[test]
    fn test_extract_none() {
        let auth = ClientAuth::extract(&HeaderMap::new(), None, None);
        assert!(matches!(auth, ClientAuth::None));
    }

    #[test]
    fn test_parse_basic_auth_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Basic not-base64!!!".parse().unwrap());
        assert!(parse_basic_auth(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer some-token".parse().unwrap());
        assert!(parse_basic_auth(&headers).is_none());

        // No colon separator
        let mut headers = HeaderMap::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode("no-separator");
        headers.insert("authorization", format!("Basic {encoded}").parse().unwrap());
        assert!(parse_basic_auth(&headers).is_none());
    }
}
