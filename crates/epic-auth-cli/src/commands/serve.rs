use anyhow::{Context, Result, bail};
use colored::Colorize;
use epic_auth::EpicAuthConfig;
use epic_auth::PublisherState;
use epic_auth::publisher::{self, JWKS_PATH, WELL_KNOWN_JWKS_PATH};
use tokio::net::TcpListener;

use crate::cli::ServeArgs;
use crate::output::print_success;

pub async fn serve(config: &EpicAuthConfig, args: &ServeArgs) -> Result<()> {
    let jwks_path = args.jwks.clone().unwrap_or_else(|| config.jwks.path.clone());
    if !jwks_path.exists() {
        bail!(
            "JWK Set file not found: {} (run `epic-auth jwks` first)",
            jwks_path.display()
        );
    }

    let host = args.host.as_deref().unwrap_or(&config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local = listener.local_addr()?;

    print_success(&format!(
        "Serving {} on http://{local}",
        jwks_path.display().to_string().cyan()
    ));
    println!("  http://{local}{JWKS_PATH}");
    println!("  http://{local}{WELL_KNOWN_JWKS_PATH}");
    println!("Press Ctrl+C to stop");

    publisher::serve(listener, PublisherState::new(jwks_path), shutdown_signal())
        .await
        .context("JWK Set server failed")?;
    println!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
