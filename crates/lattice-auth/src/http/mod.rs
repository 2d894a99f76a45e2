//! Axum HTTP handlers for the authorization server.
//!
//! Routing and dependency wiring live in the embedding application; this
//! module only provides the handlers and their state types.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

pub mod authorize;
pub mod clients;
pub mod discovery;
pub mod jwks;
pub mod revoke;
pub mod session;
pub mod token;
pub mod userinfo;

pub use authorize::{AuthorizeState, authorize_handler};
pub use clients::{
    ClientAdminState, ClientCreateRequest, ClientResponse, ClientWithSecret, create_client_handler,
    delete_client_handler, get_client_handler, list_clients_handler, rotate_secret_handler,
};
pub use discovery::{DiscoveryState, openid_configuration_handler};
pub use jwks::{JwksState, jwks_handler};
pub use revoke::{RevocationState, revoke_handler};
pub use session::{
    LoginRequest, SessionResponse, SessionState, login_handler, logout_handler,
    refresh_session_handler,
};
pub use token::{TokenState, token_handler};
pub use userinfo::{UserInfoResponse, UserInfoState, userinfo_handler};

/// Builds a 302 Found redirect, the status OAuth front-channel responses use.
pub(crate) fn found(location: &str) -> Response {
    match header::HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
