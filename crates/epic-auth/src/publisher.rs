//! Development HTTP server for the JWK Set.
//!
//! Epic fetches the registered JWK Set URL when it validates a client
//! assertion. For local testing this server exposes the generated file at
//! `/jwks.json` and `/.well-known/jwks.json` (typically behind a tunnel such
//! as ngrok). Production deployments should host the file on a proper HTTPS
//! web server instead.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Path the JWK Set is served at.
pub const JWKS_PATH: &str = "/jwks.json";

/// Well-known path the JWK Set is also served at.
pub const WELL_KNOWN_JWKS_PATH: &str = "/.well-known/jwks.json";

const NOT_FOUND_BODY: &str = "JWK Set file not found. Run `epic-auth jwks` first.";

const INDEX_HTML: &str = r#"<html>
<head><title>JWK Set Server</title></head>
<body>
    <h1>JWK Set Server</h1>
    <p>This server hosts your JWK Set for Epic FHIR authentication.</p>
    <p><a href="/jwks.json">View JWK Set</a></p>
    <p><strong>For testing:</strong> expose this server with a tunnel, e.g.</p>
    <pre>ngrok http 8000</pre>
    <p>Then register the public URL in Epic app settings.</p>
</body>
</html>
"#;

/// State for the JWK Set handlers.
#[derive(Debug, Clone)]
pub struct PublisherState {
    /// Location of the JWK Set file on disk.
    pub jwks_path: Arc<PathBuf>,
}

impl PublisherState {
    /// Creates a new publisher state.
    pub fn new(jwks_path: impl Into<PathBuf>) -> Self {
        Self {
            jwks_path: Arc::new(jwks_path.into()),
        }
    }

    /// Returns the JWK Set file path.
    #[must_use]
    pub fn jwks_path(&self) -> &Path {
        &self.jwks_path
    }
}

/// Builds the publisher router.
pub fn router(state: PublisherState) -> Router {
    Router::new()
        .route(JWKS_PATH, get(jwks_handler))
        .route(WELL_KNOWN_JWKS_PATH, get(jwks_handler))
        .fallback(index_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the publisher on `listener` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    state: PublisherState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, jwks = %state.jwks_path.display(), "JWK Set server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Handler for `GET /jwks.json` and `GET /.well-known/jwks.json`.
///
/// The file is read whole on every request, so a regenerated JWK Set is
/// picked up without a restart.
///
/// # Response
///
/// - 200 with the file bytes, `application/json` and
///   `Access-Control-Allow-Origin: *`
/// - 404 if the file does not exist
pub async fn jwks_handler(State(state): State<PublisherState>) -> Response {
    match tokio::fs::read(state.jwks_path.as_path()).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %state.jwks_path.display(), "JWK Set file not found");
            (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
        }
        Err(e) => {
            tracing::warn!(
                path = %state.jwks_path.display(),
                error = %e,
                "Failed to read JWK Set file"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read JWK Set file").into_response()
        }
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_state_new() {
        let state = PublisherState::new("/tmp/jwks.json");
        assert_eq!(state.jwks_path(), Path::new("/tmp/jwks.json"));
    }

    #[test]
    fn test_publisher_state_clone() {
        let state = PublisherState::new("jwks.json");
        let cloned = state.clone();

        // Cloned state should share the same Arc
        assert!(Arc::ptr_eq(&state.jwks_path, &cloned.jwks_path));
    }

    #[tokio::test]
    async fn test_handler_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = PublisherState::new(dir.path().join("jwks.json"));
        let response = jwks_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwks.json");
        std::fs::write(&path, br#"{"keys":[]}"#).unwrap();

        let response = jwks_handler(State(PublisherState::new(path))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
