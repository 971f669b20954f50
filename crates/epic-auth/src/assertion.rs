//! Client assertion construction for SMART Backend Services.
//!
//! Epic backend apps authenticate with a short-lived JWT signed by the
//! app's private key (RFC 7523, `private_key_jwt`). The assertion must carry:
//!
//! - `iss` and `sub`: the client ID
//! - `aud`: the token endpoint URL
//! - `exp`: no more than 5 minutes in the future
//! - `jti`: a value never reused while the assertion is valid
//! - `iat`: issue time
//!
//! Each [`SignedAssertion`] is meant for exactly one token request.

use jsonwebtoken::{Algorithm, Header, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::keys::SigningKey;

/// Value of the `client_assertion_type` parameter for JWT assertions.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of every assertion, in seconds.
pub const ASSERTION_LIFETIME_SECONDS: i64 = 300;

/// JWT claims of a client assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    /// Issuer, the client ID.
    pub iss: String,

    /// Subject, the client ID.
    pub sub: String,

    /// Audience, the token endpoint URL.
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Unique assertion ID (UUID v4).
    pub jti: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,
}

impl ClientAssertionClaims {
    /// Creates claims issued at `issued_at` with a fresh random `jti`.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        token_endpoint: impl Into<String>,
        issued_at: OffsetDateTime,
    ) -> Self {
        let client_id = client_id.into();
        let iat = issued_at.unix_timestamp();
        Self {
            iss: client_id.clone(),
            sub: client_id,
            aud: token_endpoint.into(),
            exp: iat + ASSERTION_LIFETIME_SECONDS,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
        }
    }
}

/// A signed client assertion.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    token: String,
    claims: ClientAssertionClaims,
}

impl SignedAssertion {
    /// Returns the compact JWS string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Returns the claims that were signed.
    #[must_use]
    pub fn claims(&self) -> &ClientAssertionClaims {
        &self.claims
    }

    /// Returns the expiration time as a Unix timestamp.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    /// Consumes the assertion and returns the compact JWS string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.token
    }
}

/// Builds and signs client assertions for one client and token endpoint.
#[derive(Debug)]
pub struct AssertionBuilder {
    client_id: String,
    token_endpoint: String,
    signing_key: SigningKey,
}

impl AssertionBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        token_endpoint: impl Into<String>,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            token_endpoint: token_endpoint.into(),
            signing_key,
        }
    }

    /// Returns the client ID used as `iss` and `sub`.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the token endpoint used as `aud`.
    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Returns the signing key.
    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Builds and signs an assertion issued now.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn build(&self) -> AuthResult<SignedAssertion> {
        self.build_at(OffsetDateTime::now_utc())
    }

    /// Builds and signs an assertion issued at `issued_at`.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn build_at(&self, issued_at: OffsetDateTime) -> AuthResult<SignedAssertion> {
        let claims = ClientAssertionClaims::new(&self.client_id, &self.token_endpoint, issued_at);
        let token = self.sign(&claims)?;
        tracing::debug!(
            client_id = %self.client_id,
            jti = %claims.jti,
            exp = claims.exp,
            "Client assertion signed"
        );
        Ok(SignedAssertion { token, claims })
    }

    /// Signs arbitrary assertion claims with RS256.
    ///
    /// # Errors
    /// Returns an error if the key cannot produce a signature.
    pub fn sign(&self, claims: &ClientAssertionClaims) -> AuthResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.signing_key.kid().to_string());

        encode(&header, claims, self.signing_key.encoding_key())
            .map_err(|e| AuthError::signing(e.to_string()))
    }
}
