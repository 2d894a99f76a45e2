//! HTTP response mapping for auth errors.
//!
//! Lets handlers and extractors return `AuthError` directly; the error is
//! rendered as an OAuth-style JSON body with the matching status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = if self.is_server_error() {
            // Internal details stay out of the response body
            tracing::error!(error = %self, category = %self.category(), "Internal auth error");
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            match &self {
                AuthError::InvalidClient { .. }
                | AuthError::Unauthorized { .. }
                | AuthError::InvalidToken { .. }
                | AuthError::TokenExpired
                | AuthError::TokenRevoked => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden { .. } | AuthError::AccessDenied { .. } => {
                    StatusCode::FORBIDDEN
                }
                _ => StatusCode::BAD_REQUEST,
            }
        };

        let description = if self.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "error": self.oauth_error_code(),
            "error_description": description,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let response = AuthError::invalid_client("nope").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::invalid_grant("nope").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = AuthError::storage("db down").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
