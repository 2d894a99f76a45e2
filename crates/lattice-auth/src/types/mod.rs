//! Domain types for the authorization server.

pub mod client;
pub mod refresh_token;

pub use client::{Client, ClientType, ClientValidationError};
pub use refresh_token::RefreshToken;
