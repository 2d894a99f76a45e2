//! JWT signing keys and token encode/decode.
//!
//! This module owns the server's asymmetric signing key pair and provides
//! JWT support for access and ID tokens. RSA signing (RS256, RS384) is
//! supported; the published JWK carries the RSA `n`/`e` components.
//!
//! # Key Resolution
//!
//! `SigningKeyPair::resolve` loads key material in a fixed order:
//!
//! 1. PEM strings supplied directly in configuration
//! 2. PEM files at configured paths
//! 3. Ephemeral generation — development only; in production a missing key
//!    is a fatal startup error, never a silently generated one
//!
//! The resolved pair is wrapped in a `JwtService` behind an `Arc` at startup
//! and shared read-only by every request handler.

use std::fmt;
use std::fs;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::claims::IdentityClaims;
use crate::config::{Environment, SigningConfig};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// Key material could not be resolved for the current environment.
    #[error("Key resolution error: {message}")]
    KeyResolution {
        /// Description of the resolution failure.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `KeyResolution` error.
    #[must_use]
    pub fn key_resolution(message: impl Into<String>) -> Self {
        Self::KeyResolution {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error (expired, bad signature,
    /// bad claims).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::InvalidClaims { .. }
        )
    }

    /// Returns `true` if this is a key-related error.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGenerationError { .. } | Self::InvalidKey { .. } | Self::KeyResolution { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms for JWT tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256 (default, widely compatible).
    RS256,
    /// RSA with SHA-384.
    RS384,
}

impl SigningAlgorithm {
    /// Parses an algorithm name.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::InvalidKey` for unsupported algorithm names.
    pub fn parse(name: &str) -> Result<Self, JwtError> {
        match name {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            other => Err(JwtError::invalid_key(format!(
                "Unsupported signing algorithm: {other}"
            ))),
        }
    }

    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (the SSO server URL).
    pub iss: String,

    /// Subject (user ID).
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT ID (unique identifier).
    pub jti: String,

    /// Space-separated scopes. Absent on first-party session tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// OAuth client ID. Absent on first-party session tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

/// ID token claims for OpenID Connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Issuer (the SSO server URL).
    pub iss: String,

    /// Subject (user ID).
    pub sub: String,

    /// Audience (client ID).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// When the end-user authentication occurred (Unix timestamp).
    pub auth_time: i64,

    /// Nonce from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Scope-gated identity claims, flattened into the payload.
    #[serde(flatten)]
    pub identity: IdentityClaims,
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key (RSA).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Key ID.
    pub kid: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// The server's asymmetric signing key pair.
///
/// The private key never leaves this struct; only the public components are
/// exported, via `to_jwk`.
#[derive(Debug)]
pub struct SigningKeyPair {
    /// Stable key identifier published in headers and the JWKS.
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (public key) for verification.
    decoding_key: DecodingKey,

    /// RSA modulus for JWKS export.
    n: Vec<u8>,

    /// RSA exponent for JWKS export.
    e: Vec<u8>,

    /// When the key was loaded or generated.
    pub created_at: OffsetDateTime,
}

impl SigningKeyPair {
    /// Resolves key material from configuration.
    ///
    /// Tries, in order: inline PEM strings, key files, ephemeral generation.
    /// Ephemeral generation is only permitted in development; in production
    /// an unresolvable key is a fatal startup error.
    ///
    /// # Errors
    ///
    /// Returns an error if configured material is unreadable or invalid, or
    /// if production mode has no material configured.
    pub fn resolve(config: &SigningConfig, environment: Environment) -> Result<Self, JwtError> {
        let algorithm = SigningAlgorithm::parse(&config.algorithm)?;

        if let (Some(private_pem), Some(public_pem)) = (&config.private_key, &config.public_key) {
            return Self::from_pem(&config.kid, algorithm, private_pem, public_pem);
        }

        if let (Some(private_path), Some(public_path)) =
            (&config.private_key_path, &config.public_key_path)
        {
            let private_pem = fs::read_to_string(private_path).map_err(|e| {
                JwtError::key_resolution(format!(
                    "Cannot read private key file {}: {e}",
                    private_path.display()
                ))
            })?;
            let public_pem = fs::read_to_string(public_path).map_err(|e| {
                JwtError::key_resolution(format!(
                    "Cannot read public key file {}: {e}",
                    public_path.display()
                ))
            })?;
            return Self::from_pem(&config.kid, algorithm, &private_pem, &public_pem);
        }

        if environment.is_production() {
            return Err(JwtError::key_resolution(
                "No signing key material configured; refusing to generate an \
                 ephemeral key in production",
            ));
        }

        tracing::warn!(
            kid = %config.kid,
            "No signing key material configured; generating an ephemeral \
             development key (tokens will not survive a restart)"
        );
        Self::generate_rsa(&config.kid, algorithm)
    }

    /// Generates a new RSA-2048 key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate_rsa(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
    ) -> Result<Self, JwtError> {
        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::key_generation_error(e.to_string()))?;

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
            decoding_key,
            n,
            e,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Loads a key pair from PEM strings.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;

        // Parse the public key to extract the JWKS components
        let public_key = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| JwtError::invalid_key(e.to_string()))?;
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
            decoding_key,
            n,
            e,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            use_: "sig".to_string(),
            kid: self.kid.clone(),
            alg: self.algorithm.as_str().to_string(),
            n: URL_SAFE_NO_PAD.encode(&self.n),
            e: URL_SAFE_NO_PAD.encode(&self.e),
        }
    }
}

// ============================================================================
// JWT Service
// ============================================================================

/// Service for encoding and decoding JWT tokens.
///
/// Thread-safe (`Send + Sync`); resolved once at startup and shared behind
/// an `Arc` by all request handlers.
pub struct JwtService {
    signing_key: SigningKeyPair,
    issuer: String,
}

impl JwtService {
    /// Creates a new JWT service.
    ///
    /// # Arguments
    /// * `signing_key` - The key pair to use for signing/verification
    /// * `issuer` - The issuer claim value (the SSO server URL)
    #[must_use]
    pub fn new(signing_key: SigningKeyPair, issuer: impl Into<String>) -> Self {
        Self {
            signing_key,
            issuer: issuer.into(),
        }
    }

    /// Encodes claims into a compact JWT string.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(self.signing_key.algorithm.to_jwt_algorithm());
        header.kid = Some(self.signing_key.kid.clone());

        encode(&header, claims, &self.signing_key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Decodes and validates a JWT string (signature, `exp`, `iss`).
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or validation fails.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<TokenData<T>, JwtError> {
        let mut validation = Validation::new(self.signing_key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.validate_aud = false; // Audience validated at application layer

        decode(token, &self.signing_key.decoding_key, &validation).map_err(JwtError::from)
    }

    /// Returns the current signing key ID.
    #[must_use]
    pub fn current_kid(&self) -> &str {
        &self.signing_key.kid
    }

    /// Returns the signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.signing_key.algorithm
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the JWKS containing the public key.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.signing_key.to_jwk()],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_claims(expires_in: i64) -> AccessTokenClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        AccessTokenClaims {
            iss: "https://sso.example.com".to_string(),
            sub: Uuid::new_v4().to_string(),
            exp: now + expires_in,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            scope: Some("openid profile".to_string()),
            client_id: Some("lat_app".to_string()),
        }
    }

    #[test]
    fn test_generate_rsa_key_pair() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        assert_eq!(key_pair.algorithm, SigningAlgorithm::RS256);
        assert_eq!(key_pair.kid, "key-1");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let service = JwtService::new(key_pair, "https://sso.example.com");

        let claims = test_claims(900);
        let token = service.encode(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = service.decode::<AccessTokenClaims>(&token).unwrap();
        assert_eq!(decoded.claims, claims);
        assert_eq!(decoded.header.kid.as_deref(), Some("key-1"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let service = JwtService::new(key_pair, "https://sso.example.com");

        let claims = test_claims(-3600); // expired an hour ago
        let token = service.encode(&claims).unwrap();

        let result = service.decode::<AccessTokenClaims>(&token);
        assert!(matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let key_pair1 = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let key_pair2 = SigningKeyPair::generate_rsa("key-2", SigningAlgorithm::RS256).unwrap();

        let service1 = JwtService::new(key_pair1, "https://sso.example.com");
        let service2 = JwtService::new(key_pair2, "https://sso.example.com");

        // Sign with key1, verify with key2
        let token = service1.encode(&test_claims(900)).unwrap();
        let result = service2.decode::<AccessTokenClaims>(&token);

        assert!(matches!(result.unwrap_err(), JwtError::InvalidSignature));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let service = JwtService::new(key_pair, "https://sso.example.com");

        let mut claims = test_claims(900);
        claims.iss = "https://other.example.com".to_string();
        let token = service.encode(&claims).unwrap();

        let result = service.decode::<AccessTokenClaims>(&token);
        assert!(matches!(result.unwrap_err(), JwtError::InvalidClaims { .. }));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let service = JwtService::new(key_pair, "https://sso.example.com");

        let result = service.decode::<AccessTokenClaims>("not.a.jwt");
        assert!(result.is_err());
        assert!(!matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_session_token_omits_oauth_claims() {
        let mut claims = test_claims(900);
        claims.scope = None;
        claims.client_id = None;

        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("scope"));
        assert!(!json.contains("client_id"));
    }

    #[test]
    fn test_jwk_export() {
        let key_pair = SigningKeyPair::generate_rsa("lattice-key-1", SigningAlgorithm::RS256).unwrap();
        let jwk = key_pair.to_jwk();

        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.use_, "sig");
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.kid, "lattice-key-1");
        assert!(!jwk.n.is_empty());
        // 65537 big-endian == [1, 0, 1]
        assert_eq!(jwk.e, "AQAB");
    }

    #[test]
    fn test_jwks_set() {
        let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256).unwrap();
        let service = JwtService::new(key_pair, "https://sso.example.com");

        let jwks = service.jwks();
        assert_eq!(jwks.keys.len(), 1);

        let json = serde_json::to_string(&jwks).unwrap();
        assert!(json.contains("\"keys\":["));
        assert!(json.contains("\"use\":\"sig\""));
    }

    #[test]
    fn test_resolve_inline_pem() {
        // Round-trip: generate, export PEMs, then resolve via inline config
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let private_pem = private_key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .unwrap();

        let config = SigningConfig {
            private_key: Some(private_pem),
            public_key: Some(public_pem),
            ..SigningConfig::default()
        };

        let pair = SigningKeyPair::resolve(&config, Environment::Production).unwrap();
        assert_eq!(pair.kid, "lattice-key-1");

        let service = JwtService::new(pair, "https://sso.example.com");
        let token = service.encode(&test_claims(900)).unwrap();
        assert!(service.decode::<AccessTokenClaims>(&token).is_ok());
    }

    #[test]
    fn test_resolve_generates_ephemeral_in_development() {
        let config = SigningConfig::default();
        let pair = SigningKeyPair::resolve(&config, Environment::Development).unwrap();
        assert_eq!(pair.algorithm, SigningAlgorithm::RS256);
    }

    #[test]
    fn test_resolve_fails_fast_in_production() {
        let config = SigningConfig::default();
        let result = SigningKeyPair::resolve(&config, Environment::Production);
        assert!(matches!(result.unwrap_err(), JwtError::KeyResolution { .. }));
    }

    #[test]
    fn test_resolve_missing_key_file_is_an_error() {
        let config = SigningConfig {
            private_key_path: Some("/nonexistent/private.pem".into()),
            public_key_path: Some("/nonexistent/public.pem".into()),
            ..SigningConfig::default()
        };

        let result = SigningKeyPair::resolve(&config, Environment::Development);
        assert!(matches!(result.unwrap_err(), JwtError::KeyResolution { .. }));
    }

    #[test]
    fn test_signing_algorithm_parse() {
        assert_eq!(
            SigningAlgorithm::parse("RS256").unwrap(),
            SigningAlgorithm::RS256
        );
        assert_eq!(
            SigningAlgorithm::parse("RS384").unwrap(),
            SigningAlgorithm::RS384
        );
        assert!(SigningAlgorithm::parse("ES384").is_err());
        assert!(SigningAlgorithm::parse("HS256").is_err());
    }

    #[test]
    fn test_jwt_error_predicates() {
        assert!(JwtError::Expired.is_validation_error());
        assert!(JwtError::InvalidSignature.is_validation_error());
        assert!(JwtError::invalid_claims("test").is_validation_error());

        assert!(!JwtError::Expired.is_key_error());
        assert!(JwtError::key_generation_error("err").is_key_error());
        assert!(JwtError::key_resolution("err").is_key_error());
    }
}
