//! HTTP middleware for authentication.

pub mod auth;
mod error;

pub use auth::{AuthContext, AuthState, BearerAuth, OptionalBearerAuth};
