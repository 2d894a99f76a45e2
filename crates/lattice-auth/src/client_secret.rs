//! Client credential generation and verification.
//!
//! This module provides cryptographically secure credential generation and
//! Argon2-based hashing for OAuth client authentication.
//!
//! # Security
//!
//! - Client IDs are `lat_`-prefixed 128-bit random identifiers
//! - Secrets are 256-bit random values, base64url encoded
//! - Hashing uses Argon2id (hybrid mode) with default parameters
//! - Salts are generated using OsRng (cryptographically secure RNG)
//!
//! # Example
//!
//! ```
//! use lattice_auth::client_secret::{
//!     generate_client_credentials, hash_client_secret, verify_client_secret,
//! };
//!
//! let (client_id, secret) = generate_client_credentials();
//! assert!(client_id.starts_with("lat_"));
//!
//! // Only the hash is persisted
//! let hash = hash_client_secret(&secret).unwrap();
//! assert!(verify_client_secret(&secret, &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Generate a fresh OAuth client ID / client secret pair.
///
/// The client ID is a `lat_`-prefixed 128-bit random hex identifier; the
/// secret is a 256-bit random value encoded as base64url. Only the secret's
/// hash may be persisted — the plaintext is shown to the administrator once.
#[must_use]
pub fn generate_client_credentials() -> (String, String) {
    let id_bytes: [u8; 16] = rand::thread_rng().r#gen();
    let client_id = format!("lat_{}", hex::encode(id_bytes));

    let mut secret_bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut secret_bytes);
    let client_secret = URL_SAFE_NO_PAD.encode(secret_bytes);

    (client_id, client_secret)
}

/// Hash a client secret for storage using Argon2id.
///
/// Returns a PHC-formatted hash string suitable for database storage.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_client_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a client secret against a stored PHC hash.
///
/// Returns `Ok(false)` for a mismatched secret; other errors indicate a
/// malformed stored hash.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if the stored hash cannot be parsed.
pub fn verify_client_secret(
    secret: &str,
    stored_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored_hash)?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
