//! Token endpoint client for the `client_credentials` grant.
//!
//! A signed client assertion is exchanged for an access token with a single
//! form-encoded POST:
//!
//! ```text
//! grant_type=client_credentials
//! &client_assertion_type=urn:ietf:params:oauth:client-assertion-type:jwt-bearer
//! &client_assertion=<JWT>
//! &client_id=<client id>
//! ```
//!
//! The request is sent once. Retries and timeouts beyond the transport
//! defaults are left to the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuthResult;
use crate::assertion::{CLIENT_ASSERTION_TYPE, SignedAssertion};
use crate::error::AuthError;

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "system/Patient.read"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Access token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Token type, normally "Bearer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// OAuth 2.0 error response body (RFC 6749 §5.2).
///
/// # Example Response
///
/// ```json
/// {
///   "error": "invalid_client",
///   "error_description": "Client assertion signature is invalid"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    /// OAuth 2.0 error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl fmt::Display for TokenErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{} ({})", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_assertion_type: &'a str,
    client_assertion: &'a str,
    client_id: &'a str,
}

/// Client for an OAuth 2.0 token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    token_endpoint: String,
}

impl TokenClient {
    /// Creates a client with a default HTTP client.
    #[must_use]
    pub fn new(token_endpoint: impl Into<String>) -> Self {
        Self::with_http_client(reqwest::Client::new(), token_endpoint)
    }

    /// Creates a client around an existing HTTP client.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client, token_endpoint: impl Into<String>) -> Self {
        Self {
            http,
            token_endpoint: token_endpoint.into(),
        }
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Exchanges a signed assertion for an access token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenRejected`] for a non-200 status with an OAuth error body
    /// - [`AuthError::UnexpectedResponse`] for any other non-200 status, or a
    ///   200 response without `access_token`
    /// - [`AuthError::Transport`] if the request could not be sent
    pub async fn exchange(
        &self,
        assertion: &SignedAssertion,
        client_id: &str,
    ) -> AuthResult<TokenResponse> {
        let request = TokenRequest {
            grant_type: "client_credentials",
            client_assertion_type: CLIENT_ASSERTION_TYPE,
            client_assertion: assertion.as_str(),
            client_id,
        };

        tracing::debug!(
            endpoint = %self.token_endpoint,
            client_id = %client_id,
            jti = %assertion.claims().jti,
            "Requesting access token"
        );

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(
                    endpoint = %self.token_endpoint,
                    error = %e,
                    "Failed to reach token endpoint"
                );
                AuthError::Transport(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let result = classify_response(status, &body);

        match &result {
            Ok(token) => tracing::info!(
                status,
                expires_in = ?token.expires_in,
                "Access token received"
            ),
            Err(e) => tracing::warn!(status, error = %e, "Token request failed"),
        }
        result
    }
}

/// Classifies a token endpoint response.
///
/// Only HTTP 200 with an `access_token` string is a success. The optional
/// fields are read leniently: an `expires_in` sent as a string or a float is
/// still accepted, and values that cannot be interpreted become `None`.
///
/// # Errors
/// See [`TokenClient::exchange`].
pub fn classify_response(status: u16, body: &str) -> AuthResult<TokenResponse> {
    if status != 200 {
        return match serde_json::from_str::<TokenErrorResponse>(body) {
            Ok(error) => Err(AuthError::TokenRejected { status, error }),
            Err(_) => Err(AuthError::unexpected_response(status, body)),
        };
    }

    let value: Value =
        serde_json::from_str(body).map_err(|_| AuthError::unexpected_response(status, body))?;
    let Some(access_token) = value.get("access_token").and_then(Value::as_str) else {
        return Err(AuthError::unexpected_response(status, body));
    };

    Ok(TokenResponse {
        access_token: access_token.to_string(),
        expires_in: value.get("expires_in").and_then(lenient_seconds),
        token_type: optional_string(&value, "token_type"),
        scope: optional_string(&value, "scope"),
    })
}

/// Reads a lifetime given as a JSON number or a numeric string.
fn lenient_seconds(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| whole_seconds(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| whole_seconds(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn whole_seconds(secs: f64) -> Option<u64> {
    (0.0..=u64::MAX as f64)
        .contains(&secs)
        .then(|| secs.trunc() as u64)
}

fn optional_string(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}
