//! OpenID Connect discovery endpoint.
//!
//! Provides `GET /.well-known/openid-configuration`. The advertised values
//! come from the same configuration the signer and token services use, so
//! the document can never disagree with actual behavior.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::config::AuthConfig;

/// State for the discovery endpoint.
#[derive(Clone)]
pub struct DiscoveryState {
    /// Authentication configuration.
    pub config: AuthConfig,
}

impl DiscoveryState {
    /// Creates a new discovery state.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

/// Handler for `GET /.well-known/openid-configuration`.
pub async fn openid_configuration_handler(
    State(state): State<DiscoveryState>,
) -> Json<serde_json::Value> {
    let base = state.config.issuer.trim_end_matches('/');

    let doc = json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/auth/authorize"),
        "token_endpoint": format!("{base}/auth/token"),
        "userinfo_endpoint": format!("{base}/auth/userinfo"),
        "jwks_uri": format!("{base}/.well-known/jwks.json"),
        "revocation_endpoint": format!("{base}/auth/revoke"),
        "scopes_supported": [
            "openid",
            "email",
            "profile",
            "teams",
            "roles",
            "workspaces",
            "permissions",
        ],
        "response_types_supported": ["code"],
        "grant_types_supported": ["authorization_code", "refresh_token"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": [state.config.signing.algorithm],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
        "code_challenge_methods_supported": ["S256", "plain"],
    });

    Json(doc)
}
