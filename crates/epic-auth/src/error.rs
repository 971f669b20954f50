//! Error types for key handling, assertion signing and token exchange.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::token::TokenErrorResponse;

/// Errors that can occur while encoding keys, signing assertions or
/// exchanging them for access tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A key file does not exist at the configured location.
    #[error("Key file not found: {}", path.display())]
    KeyFileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The JWK Set file does not exist at the configured location.
    #[error("JWK Set file not found: {}", path.display())]
    JwksFileNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// No private key was configured, neither inline nor as a path.
    #[error("No private key configured")]
    MissingPrivateKey,

    /// The key material could not be parsed or is unusable.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// A JWK Set document or a JWK value is malformed.
    #[error("Invalid JWK Set: {message}")]
    InvalidJwks {
        /// Description of the problem.
        message: String,
    },

    /// The assertion could not be signed.
    #[error("Failed to sign client assertion: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// The token endpoint rejected the request with a structured OAuth error.
    #[error("Token endpoint returned HTTP {status}: {}", .error)]
    TokenRejected {
        /// HTTP status code.
        status: u16,
        /// Parsed `error` / `error_description` body.
        error: TokenErrorResponse,
    },

    /// The token endpoint answered with something other than a token or a
    /// structured OAuth error.
    #[error("Unexpected token endpoint response (HTTP {status}): {body}")]
    UnexpectedResponse {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The HTTP request could not be completed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Required configuration is missing or invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl AuthError {
    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidJwks` error.
    #[must_use]
    pub fn invalid_jwks(message: impl Into<String>) -> Self {
        Self::InvalidJwks {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `UnexpectedResponse` error.
    #[must_use]
    pub fn unexpected_response(status: u16, body: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            status,
            body: body.into(),
        }
    }

    /// Wraps an I/O error, mapping `NotFound` on key reads to
    /// [`AuthError::KeyFileNotFound`].
    pub(crate) fn key_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::KeyFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::io(path, source)
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the HTTP status for remote protocol errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TokenRejected { status, .. } | Self::UnexpectedResponse { status, .. } => {
                Some(*status)
            }
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if a required file was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::KeyFileNotFound { .. } | Self::JwksFileNotFound { .. }
        )
    }

    /// Returns the error category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyFileNotFound { .. }
            | Self::JwksFileNotFound { .. }
            | Self::MissingPrivateKey => ErrorCategory::MissingFile,
            Self::InvalidKey { .. } | Self::InvalidJwks { .. } | Self::Signing { .. } => {
                ErrorCategory::MalformedInput
            }
            Self::TokenRejected { .. } | Self::UnexpectedResponse { .. } => {
                ErrorCategory::RemoteProtocol
            }
            Self::Transport(_) | Self::Io { .. } => ErrorCategory::Transport,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Categories of errors, used for logging and exit handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A key or JWK Set file was not found.
    MissingFile,
    /// PEM, key or JSON input could not be parsed.
    MalformedInput,
    /// The authorization server returned an error or an unexpected body.
    RemoteProtocol,
    /// Network or file system failure.
    Transport,
    /// Missing or invalid configuration.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => write!(f, "missing_file"),
            Self::MalformedInput => write!(f, "malformed_input"),
            Self::RemoteProtocol => write!(f, "remote_protocol"),
            Self::Transport => write!(f, "transport"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
