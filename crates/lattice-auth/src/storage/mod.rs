//! Storage and collaborator traits for the authorization server.
//!
//! This module defines the interfaces the core depends on:
//!
//! - OAuth client registrations
//! - Authorization codes
//! - Refresh tokens
//! - User lookup and password authentication
//! - The fire-and-forget activity sink
//!
//! # Implementations
//!
//! Storage implementations are provided in separate crates:
//!
//! - `lattice-auth-memory` - in-memory backend for tests and single-node
//!   development

pub mod activity;
pub mod client;
pub mod code;
pub mod refresh_token;
pub mod user;

pub use activity::{ActivityEvent, ActivitySink, LoginMethod, TracingActivitySink};
pub use client::ClientStorage;
pub use code::AuthorizationCodeStorage;
pub use refresh_token::RefreshTokenStorage;
pub use user::{User, UserStorage};
