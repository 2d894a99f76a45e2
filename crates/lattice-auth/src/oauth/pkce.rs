//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with the S256 and plain methods. S256 is the default
//! when a challenge arrives without a method; any other method name fails
//! closed.
//!
//! # Example
//!
//! ```
//! use lattice_auth::oauth::{PkceChallenge, PkceChallengeMethod, PkceVerifier};
//!
//! // Client generates a verifier and challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server stores the challenge, later verifies with the verifier from
//! // the token request
//! let stored = PkceChallenge::new(challenge.as_str().to_string()).unwrap();
//! assert!(stored.verify(&verifier, PkceChallengeMethod::S256).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be URL-safe base64 ([A-Za-z0-9-._~])")]
    InvalidVerifierCharacters,

    /// Challenge format is invalid.
    #[error("Invalid challenge format: must be valid base64url")]
    InvalidChallengeFormat,

    /// Unsupported challenge method.
    #[error("Unsupported challenge method: {0}")]
    UnsupportedMethod(String),

    /// PKCE verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

impl PkceError {
    /// Create an `InvalidVerifierLength` error.
    #[must_use]
    pub fn invalid_verifier_length(len: usize) -> Self {
        Self::InvalidVerifierLength(len)
    }

    /// Create an `InvalidVerifierCharacters` error.
    #[must_use]
    pub fn invalid_verifier_characters() -> Self {
        Self::InvalidVerifierCharacters
    }

    /// Create an `InvalidChallengeFormat` error.
    #[must_use]
    pub fn invalid_challenge_format() -> Self {
        Self::InvalidChallengeFormat
    }

    /// Create an `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod(method.into())
    }

    /// Create a `VerificationFailed` error.
    #[must_use]
    pub fn verification_failed() -> Self {
        Self::VerificationFailed
    }

    /// Get the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidVerifierLength(_)
            | Self::InvalidVerifierCharacters
            | Self::InvalidChallengeFormat
            | Self::UnsupportedMethod(_) => "invalid_request",
            Self::VerificationFailed => "invalid_grant",
        }
    }
}

// =============================================================================
// PKCE Challenge Method
// =============================================================================

/// PKCE challenge method.
///
/// `S256` is the default and should be used by all new clients; `plain`
/// exists for legacy clients that cannot hash. Anything else fails closed
/// at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkceChallengeMethod {
    /// SHA-256 hash of the verifier (default).
    S256,
    /// Direct string comparison.
    Plain,
}

impl PkceChallengeMethod {
    /// Parse challenge method from string.
    ///
    /// # Errors
    ///
    /// Returns `PkceError::UnsupportedMethod` for anything other than
    /// "S256" or "plain".
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(PkceError::unsupported_method(other)),
        }
    }

    /// Get the method as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for PkceChallengeMethod {
    fn default() -> Self {
        Self::S256
    }
}

// =============================================================================
// PKCE Verifier
// =============================================================================

/// PKCE code verifier.
///
/// A high-entropy cryptographic random string using the unreserved characters
/// `[A-Z] / [a-z] / [0-9] / "-" / "." / "_" / "~"`, with a minimum length of
/// 43 characters and a maximum length of 128 characters (RFC 7636 §4.1).
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Create a new verifier from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Length is not between 43 and 128 characters
    /// - Contains characters other than `[A-Za-z0-9-._~]`
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        let len = verifier.len();

        // RFC 7636: verifier must be 43-128 characters
        if !(43..=128).contains(&len) {
            return Err(PkceError::invalid_verifier_length(len));
        }

        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
        {
            return Err(PkceError::invalid_verifier_characters());
        }

        Ok(Self(verifier))
    }

    /// Generate a cryptographically random verifier.
    ///
    /// Generates 32 random bytes and encodes them as base64url (43 characters).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Get the verifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the verifier and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PKCE Challenge
// =============================================================================

/// PKCE code challenge.
///
/// For S256 the challenge is `BASE64URL(SHA256(ASCII(code_verifier)))`
/// (RFC 7636 §4.2); for plain it is the verifier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Create a challenge from a verifier using the S256 method.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.0.as_bytes());
        let hash = hasher.finalize();
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    /// Create a challenge from a raw string (received from a client).
    ///
    /// # Errors
    ///
    /// Returns `PkceError::InvalidChallengeFormat` if the string is empty or
    /// contains characters outside the verifier alphabet.
    pub fn new(challenge: String) -> Result<Self, PkceError> {
        // The plain method allows the full verifier alphabet, which is a
        // superset of base64url
        if challenge.is_empty()
            || !challenge
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '~')
        {
            return Err(PkceError::invalid_challenge_format());
        }
        Ok(Self(challenge))
    }

    /// Verify that a verifier matches this challenge under the given method.
    ///
    /// - `S256`: compares `base64url(sha256(verifier))` with the challenge
    /// - `Plain`: compares the verifier string directly
    ///
    /// # Errors
    ///
    /// Returns `PkceError::VerificationFailed` if the verifier doesn't match.
    pub fn verify(
        &self,
        verifier: &PkceVerifier,
        method: PkceChallengeMethod,
    ) -> Result<(), PkceError> {
        let matches = match method {
            PkceChallengeMethod::S256 => Self::from_verifier(verifier).0 == self.0,
            PkceChallengeMethod::Plain => verifier.0 == self.0,
        };

        if matches {
            Ok(())
        } else {
            Err(PkceError::verification_failed())
        }
    }

    /// Get the challenge as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the challenge and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for PkceChallenge {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Tests
// =============================================================================
