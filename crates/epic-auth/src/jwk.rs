//! RSA public key to JWK Set conversion.
//!
//! Epic's authorization server verifies client assertions against a JWK Set
//! fetched from a registered URL. This module produces that document from a
//! PEM-encoded RSA public key.
//!
//! Integers (`n`, `e`) are encoded per RFC 7518 §6.3.1: big-endian, minimal
//! length, base64url without padding.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "keys": [
//!     {
//!       "kty": "RSA",
//!       "use": "sig",
//!       "alg": "RS256",
//!       "n": "base64url-encoded-modulus",
//!       "e": "AQAB",
//!       "kid": "epic-fhir-key-1"
//!     }
//!   ]
//! }
//! ```
//!
//! # References
//!
//! - [RFC 7517 - JSON Web Key](https://tools.ietf.org/html/rfc7517)
//! - [RFC 7518 - JSON Web Algorithms](https://tools.ietf.org/html/rfc7518)
//! - [RFC 7638 - JWK Thumbprint](https://tools.ietf.org/html/rfc7638)

use std::fs;
use std::path::Path;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::AuthResult;
use crate::error::AuthError;

/// Key ID used when the caller does not assign one.
pub const DEFAULT_KID: &str = "epic-fhir-key-1";

/// Encodes a big-endian unsigned integer as base64url without padding.
///
/// Leading zero bytes are stripped first so the encoding is the minimal
/// form. Zero itself is encoded as a single `0x00` byte (`"AA"`).
#[must_use]
pub fn encode_uint(be_bytes: &[u8]) -> String {
    let minimal = match be_bytes.iter().position(|b| *b != 0) {
        Some(first) => &be_bytes[first..],
        None => &[0u8][..],
    };
    URL_SAFE_NO_PAD.encode(minimal)
}

/// Decodes a base64url unsigned integer back to minimal big-endian bytes.
///
/// # Errors
/// Returns an error if the value is empty or not valid unpadded base64url.
pub fn decode_uint(value: &str) -> AuthResult<Vec<u8>> {
    if value.is_empty() {
        return Err(AuthError::invalid_jwks("empty integer value"));
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| AuthError::invalid_jwks(format!("invalid base64url integer: {e}")))?;
    let minimal = match bytes.iter().position(|b| *b != 0) {
        Some(first) => bytes[first..].to_vec(),
        None => vec![0],
    };
    Ok(minimal)
}

/// Parses a PEM-encoded RSA public key.
///
/// Accepts SubjectPublicKeyInfo (`-----BEGIN PUBLIC KEY-----`, what
/// `openssl rsa -pubout` writes) and PKCS#1 (`-----BEGIN RSA PUBLIC KEY-----`).
///
/// # Errors
/// Returns [`AuthError::InvalidKey`] if the input is not an RSA public key.
pub fn parse_public_key_pem(pem: &str) -> AuthResult<RsaPublicKey> {
    let pem = pem.trim();
    RsaPublicKey::from_public_key_pem(pem).or_else(|spki_err| {
        RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| {
            AuthError::invalid_key(format!("not a valid RSA public key: {spki_err}"))
        })
    })
}

/// How the `kid` of a newly encoded key is chosen.
///
/// Epic matches the `kid` header of a signed assertion against the JWK Set,
/// so the identifier must stay the same for the lifetime of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyId {
    /// A caller-assigned identifier.
    Named(String),
    /// The RFC 7638 thumbprint of the key.
    Thumbprint,
}

impl Default for KeyId {
    fn default() -> Self {
        Self::Named(DEFAULT_KID.to_string())
    }
}

impl From<&str> for KeyId {
    fn from(kid: &str) -> Self {
        Self::Named(kid.to_string())
    }
}

/// JSON Web Key for an RSA signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key use, always "sig".
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm, always "RS256".
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,

    /// Key ID.
    pub kid: String,
}

impl Jwk {
    /// Builds the JWK for an RSA public key.
    #[must_use]
    pub fn from_public_key(key: &RsaPublicKey, kid: &KeyId) -> Self {
        let mut jwk = Self {
            kty: "RSA".to_string(),
            use_: "sig".to_string(),
            alg: "RS256".to_string(),
            n: encode_uint(&key.n().to_bytes_be()),
            e: encode_uint(&key.e().to_bytes_be()),
            kid: String::new(),
        };
        jwk.kid = match kid {
            KeyId::Named(name) => name.clone(),
            KeyId::Thumbprint => jwk.thumbprint(),
        };
        jwk
    }

    /// Builds the JWK for a PEM-encoded RSA public key.
    ///
    /// # Errors
    /// Returns an error if the PEM is not a valid RSA public key.
    pub fn from_public_key_pem(pem: &str, kid: &KeyId) -> AuthResult<Self> {
        let key = parse_public_key_pem(pem)?;
        Ok(Self::from_public_key(&key, kid))
    }

    /// Computes the RFC 7638 SHA-256 thumbprint of this key.
    ///
    /// The hash input is the required members in lexicographic order with no
    /// whitespace, so the result does not depend on `kid`, `use` or `alg`.
    #[must_use]
    pub fn thumbprint(&self) -> String {
        let canonical = format!(
            r#"{{"e":"{}","kty":"{}","n":"{}"}}"#,
            self.e, self.kty, self.n
        );
        URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Reconstructs the RSA public key from `n` and `e`.
    ///
    /// # Errors
    /// Returns an error if the integers do not decode or do not form a
    /// valid RSA key.
    pub fn to_public_key(&self) -> AuthResult<RsaPublicKey> {
        if self.kty != "RSA" {
            return Err(AuthError::invalid_jwks(format!(
                "unsupported key type: {}",
                self.kty
            )));
        }
        let n = BigUint::from_bytes_be(&decode_uint(&self.n)?);
        let e = BigUint::from_bytes_be(&decode_uint(&self.e)?);
        RsaPublicKey::new(n, e).map_err(|e| AuthError::invalid_key(e.to_string()))
    }

    /// Returns `true` if both JWKs describe the same RSA key material.
    #[must_use]
    pub fn same_key(&self, other: &Jwk) -> bool {
        self.kty == other.kty && self.n == other.n && self.e == other.e
    }
}

/// JSON Web Key Set.
///
/// Key IDs are unique within a set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Creates a new empty JWKS.
    #[must_use]
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Creates a JWKS holding a single key.
    #[must_use]
    pub fn single(key: Jwk) -> Self {
        Self { keys: vec![key] }
    }

    /// Adds a key to the set.
    ///
    /// # Errors
    /// Returns an error if a key with the same `kid` is already present.
    pub fn add_key(&mut self, key: Jwk) -> AuthResult<()> {
        if self.find(&key.kid).is_some() {
            return Err(AuthError::invalid_jwks(format!(
                "duplicate key id: {}",
                key.kid
            )));
        }
        self.keys.push(key);
        Ok(())
    }

    /// Looks up a key by its `kid`.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Serializes the set as pretty-printed JSON (two-space indent).
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> AuthResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AuthError::invalid_jwks(e.to_string()))
    }

    /// Parses a JWK Set document.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or holds duplicate key IDs.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let parsed: Jwks =
            serde_json::from_str(json).map_err(|e| AuthError::invalid_jwks(e.to_string()))?;
        let mut jwks = Jwks::new();
        for key in parsed.keys {
            jwks.add_key(key)?;
        }
        Ok(jwks)
    }

    /// Reads a JWK Set file.
    ///
    /// # Errors
    /// Returns [`AuthError::JwksFileNotFound`] if the file does not exist, or
    /// a parse error if its contents are not a valid JWK Set.
    pub fn load(path: &Path) -> AuthResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AuthError::JwksFileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                AuthError::io(path, e)
            }
        })?;
        Self::from_json(&json)
    }

    /// Writes the set to `path`, replacing any existing file atomically.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> AuthResult<()> {
        let mut json = self.to_json_pretty()?;
        json.push('\n');
        crate::fs::write_atomic(path, json.as_bytes(), crate::fs::FileMode::Public)
    }
}

/// Reads a PEM public key from `public_key_path`, encodes it and writes the
/// resulting single-key JWK Set to `output_path`.
///
/// # Errors
/// - [`AuthError::KeyFileNotFound`] if the public key file does not exist
/// - [`AuthError::InvalidKey`] if it is not an RSA public key
/// - [`AuthError::InvalidJwks`] if a named `kid` is blank
/// - [`AuthError::Io`] if the output cannot be written
pub fn create_jwks_file(
    public_key_path: &Path,
    output_path: &Path,
    kid: &KeyId,
) -> AuthResult<Jwks> {
    if matches!(kid, KeyId::Named(name) if name.trim().is_empty()) {
        return Err(AuthError::invalid_jwks("key id must not be empty"));
    }
    let pem =
        fs::read_to_string(public_key_path).map_err(|e| AuthError::key_io(public_key_path, e))?;
    let jwk = Jwk::from_public_key_pem(&pem, kid)?;
    tracing::debug!(
        path = %public_key_path.display(),
        kid = %jwk.kid,
        "Encoded RSA public key"
    );

    let jwks = Jwks::single(jwk);
    jwks.save(output_path)?;
    tracing::info!(path = %output_path.display(), "JWK Set written");
    Ok(jwks)
}
