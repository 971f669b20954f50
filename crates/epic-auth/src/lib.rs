//! # epic-auth
//!
//! Building blocks for Epic FHIR backend-services authentication
//! (SMART Backend Services, OAuth 2.0 `client_credentials` with a JWT
//! client assertion).
//!
//! This crate provides:
//! - RSA public key to JWK Set conversion
//! - RS256 client assertion construction and signing
//! - Token endpoint exchange with explicit success/failure results
//! - A development HTTP server that publishes the JWK Set
//!
//! ## Modules
//!
//! - [`jwk`] - JWK / JWK Set types and RFC 7518 integer encoding
//! - [`keys`] - Private key loading and key pair generation
//! - [`assertion`] - Client assertion claims and signing
//! - [`token`] - Token endpoint client and response types
//! - [`client`] - Assertion + exchange in one call
//! - [`publisher`] - Axum handlers serving the JWK Set
//! - [`config`] - Configuration types and loader
//! - [`error`] - Error types

pub mod assertion;
pub mod client;
pub mod config;
pub mod error;
mod fs;
pub mod jwk;
pub mod keys;
pub mod publisher;
pub mod token;

pub use assertion::{
    ASSERTION_LIFETIME_SECONDS, AssertionBuilder, CLIENT_ASSERTION_TYPE, ClientAssertionClaims,
    SignedAssertion,
};
pub use client::BackendServicesClient;
pub use config::{ConfigError, EpicAuthConfig};
pub use error::{AuthError, ErrorCategory};
pub use jwk::{DEFAULT_KID, Jwk, Jwks, KeyId, create_jwks_file};
pub use keys::{GeneratedKeyPair, PrivateKeySource, SigningKey, generate_key_pair};
pub use publisher::PublisherState;
pub use token::{TokenClient, TokenErrorResponse, TokenResponse};

/// Type alias for results of this crate.
pub type AuthResult<T> = Result<T, AuthError>;
