use anyhow::Result;
use colored::Colorize;
use epic_auth::{AuthError, EpicAuthConfig, KeyId, create_jwks_file};

use crate::cli::JwksArgs;
use crate::output::{print_steps, print_success};

pub fn jwks(config: &EpicAuthConfig, args: &JwksArgs) -> Result<()> {
    let public_key = args
        .public_key
        .as_deref()
        .unwrap_or(&config.keys.public_key_path);
    let output = args.output.as_deref().unwrap_or(&config.jwks.path);
    let kid = if args.thumbprint_kid {
        KeyId::Thumbprint
    } else {
        KeyId::Named(args.kid.clone().unwrap_or_else(|| config.keys.kid.clone()))
    };

    let jwks = match create_jwks_file(public_key, output, &kid) {
        Ok(jwks) => jwks,
        Err(e @ AuthError::KeyFileNotFound { .. }) => {
            return Err(anyhow::Error::new(e).context(
                "Generate a key pair with `epic-auth keygen` or pass --public-key",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    print_success(&format!(
        "JWK Set written to {}",
        output.display().to_string().cyan()
    ));
    println!("{}", jwks.to_json_pretty()?);
    print_steps(
        "Next steps:",
        &[
            format!(
                "Host {} at a public HTTPS URL (or run `epic-auth serve` behind a tunnel)",
                output.display()
            ),
            "Register that URL as the JWK Set URL in your Epic app settings".to_string(),
            "Request a token with `epic-auth token`".to_string(),
        ],
    );
    Ok(())
}
