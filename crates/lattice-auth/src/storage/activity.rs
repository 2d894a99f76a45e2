//! Activity event sink.
//!
//! The authorization server reports login/logout/refresh events to an
//! external activity log. The sink is fire-and-forget: recording never fails
//! the request that produced the event, and implementations swallow their
//! own errors.

use async_trait::async_trait;
use uuid::Uuid;

/// How a login was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    /// Email/password login against the portal.
    Password,
    /// OAuth authorization code exchange by a registered client.
    OAuth,
}

impl LoginMethod {
    /// Returns the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::OAuth => "oauth",
        }
    }
}

/// An event worth recording in the activity log.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    /// A user logged in, either first-party or through an OAuth client.
    Login {
        /// The user that logged in.
        user_id: Uuid,
        /// How the login happened.
        method: LoginMethod,
        /// OAuth client identity, when the login came through one.
        /// Distinguishes first-party from third-party logins.
        client_id: Option<String>,
        /// Client display name for human-readable logs.
        client_name: Option<String>,
    },

    /// A user's session ended.
    Logout {
        /// The user that logged out.
        user_id: Uuid,
    },

    /// A refresh token was rotated.
    TokenRefreshed {
        /// The token's owner.
        user_id: Uuid,
        /// OAuth client identity, absent for first-party sessions.
        client_id: Option<String>,
    },
}

/// Fire-and-forget activity recording.
///
/// Implementations must not propagate failures; a lost activity record never
/// fails the authentication that produced it.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    /// Records an activity event.
    async fn record(&self, event: ActivityEvent);
}

/// Default sink that emits activity events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingActivitySink;

#[async_trait]
impl ActivitySink for TracingActivitySink {
    async fn record(&self, event: ActivityEvent) {
        match event {
            ActivityEvent::Login {
                user_id,
                method,
                client_id,
                client_name,
            } => {
                tracing::info!(
                    user_id = %user_id,
                    method = method.as_str(),
                    client_id = ?client_id,
                    client_name = ?client_name,
                    "User logged in"
                );
            }
            ActivityEvent::Logout { user_id } => {
                tracing::info!(user_id = %user_id, "User logged out");
            }
            ActivityEvent::TokenRefreshed { user_id, client_id } => {
                tracing::debug!(
                    user_id = %user_id,
                    client_id = ?client_id,
                    "Refresh token rotated"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_method_as_str() {
        assert_eq!(LoginMethod::Password.as_str(), "password");
        assert_eq!(LoginMethod::OAuth.as_str(), "oauth");
    }

    #[tokio::test]
    async fn test_tracing_sink_accepts_events() {
        let sink = TracingActivitySink;
        sink.record(ActivityEvent::Login {
            user_id: Uuid::new_v4(),
            method: LoginMethod::OAuth,
            client_id: Some("lat_app".to_string()),
            client_name: Some("Example App".to_string()),
        })
        .await;
        sink.record(ActivityEvent::Logout {
            user_id: Uuid::new_v4(),
        })
        .await;
    }
}
