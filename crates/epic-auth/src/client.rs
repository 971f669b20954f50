//! One-call access token acquisition for backend services.

use crate::AuthResult;
use crate::assertion::AssertionBuilder;
use crate::config::EpicAuthConfig;
use crate::keys::{PrivateKeySource, SigningKey};
use crate::token::{TokenClient, TokenResponse};

/// Builds a fresh client assertion and exchanges it for an access token.
///
/// Each call to [`fetch_token`](Self::fetch_token) signs a new assertion;
/// nothing is cached between calls.
#[derive(Debug)]
pub struct BackendServicesClient {
    assertions: AssertionBuilder,
    tokens: TokenClient,
}

impl BackendServicesClient {
    /// Creates a client from its parts.
    #[must_use]
    pub fn new(assertions: AssertionBuilder, tokens: TokenClient) -> Self {
        Self { assertions, tokens }
    }

    /// Creates a client from configuration, loading the private key.
    ///
    /// # Errors
    /// Returns an error if no client ID is configured or the private key is
    /// missing or malformed. No request is sent in that case.
    pub fn from_config(config: &EpicAuthConfig) -> AuthResult<Self> {
        Self::from_config_with_key(config, &config.private_key_source(), &config.keys.kid)
    }

    /// Creates a client from configuration, signing with `source` under
    /// `kid` instead of the configured key.
    ///
    /// # Errors
    /// Returns an error if no client ID is configured, `kid` is blank, or the
    /// private key is missing or malformed.
    pub fn from_config_with_key(
        config: &EpicAuthConfig,
        source: &PrivateKeySource,
        kid: &str,
    ) -> AuthResult<Self> {
        let client_id = config.require_client_id()?;
        let signing_key = SigningKey::load(source, kid)?;
        Ok(Self::new(
            AssertionBuilder::new(client_id, &config.token_endpoint, signing_key),
            TokenClient::new(&config.token_endpoint),
        ))
    }

    /// Returns the assertion builder.
    #[must_use]
    pub fn assertions(&self) -> &AssertionBuilder {
        &self.assertions
    }

    /// Returns the token endpoint client.
    #[must_use]
    pub fn tokens(&self) -> &TokenClient {
        &self.tokens
    }

    /// Signs a new assertion and exchanges it for an access token.
    ///
    /// # Errors
    /// Returns an error if signing fails or the token endpoint does not
    /// return an access token.
    pub async fn fetch_token(&self) -> AuthResult<TokenResponse> {
        let assertion = self.assertions.build()?;
        self.tokens
            .exchange(&assertion, self.assertions.client_id())
            .await
    }
}
