use anyhow::{Context, Result};
use colored::Colorize;
use epic_auth::{
    AuthError, BackendServicesClient, EpicAuthConfig, Jwks, PrivateKeySource, SigningKey,
};

use crate::cli::TokenArgs;
use crate::output::{eprint_steps, print_error, print_token, print_warning};

pub async fn token(config: &EpicAuthConfig, args: &TokenArgs) -> Result<()> {
    let source = match &args.private_key {
        Some(path) => PrivateKeySource::File(path.clone()),
        None => config.private_key_source(),
    };
    let kid = args.kid.as_deref().unwrap_or(&config.keys.kid);

    let client = BackendServicesClient::from_config_with_key(config, &source, kid)
        .context("Failed to prepare token request")?;
    check_local_jwks(config, client.assertions().signing_key());

    // stdout carries only the token output.
    eprintln!(
        "Requesting access token from {}...",
        config.token_endpoint.cyan()
    );
    match client.fetch_token().await {
        Ok(token) => print_token(&token, args.format),
        Err(e) => {
            print_troubleshooting(&e);
            Err(e.into())
        }
    }
}

/// Warns when the local JWK Set does not publish the key being signed with.
fn check_local_jwks(config: &EpicAuthConfig, signing_key: &SigningKey) {
    let path = &config.jwks.path;
    if !path.exists() {
        return;
    }
    let jwks = match Jwks::load(path) {
        Ok(jwks) => jwks,
        Err(e) => {
            print_warning(&format!("Could not read {}: {e}", path.display()));
            return;
        }
    };
    let local = signing_key.to_jwk();
    match jwks.find(signing_key.kid()) {
        None => print_warning(&format!(
            "{} has no key with kid \"{}\"; Epic will not be able to verify this assertion",
            path.display(),
            signing_key.kid()
        )),
        Some(published) if !published.same_key(&local) => print_warning(&format!(
            "Key \"{}\" in {} does not match the private key; regenerate it with `epic-auth jwks`",
            signing_key.kid(),
            path.display()
        )),
        Some(_) => {}
    }
}

fn print_troubleshooting(error: &AuthError) {
    print_error(&format!("Token request failed ({})", error.category()));
    let mut tips = vec![
        "Check that the client ID matches your Epic app registration".to_string(),
        "Confirm the JWK Set URL is registered and publicly reachable".to_string(),
        "Make sure the published JWK Set was generated from this key pair".to_string(),
    ];
    if matches!(error, AuthError::TokenRejected { .. }) {
        tips.push(
            "Newly registered or changed keys can take a while to propagate in Epic".to_string(),
        );
    }
    eprint_steps("Troubleshooting:", &tips);
}
