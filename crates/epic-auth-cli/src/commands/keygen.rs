use anyhow::{Context, Result, bail};
use colored::Colorize;
use epic_auth::{EpicAuthConfig, generate_key_pair};

use crate::cli::KeygenArgs;
use crate::output::{print_steps, print_success};

pub fn keygen(config: &EpicAuthConfig, args: &KeygenArgs) -> Result<()> {
    let private_path = args
        .private_key
        .clone()
        .unwrap_or_else(|| config.keys.private_key_path.clone());
    let public_path = args
        .public_key
        .clone()
        .unwrap_or_else(|| config.keys.public_key_path.clone());

    if !args.force {
        for path in [&private_path, &public_path] {
            if path.exists() {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
        }
    }

    println!("Generating {}-bit RSA key pair...", args.bits);
    let pair = generate_key_pair(args.bits).context("Failed to generate key pair")?;
    pair.write_private_key(&private_path)?;
    pair.write_public_key(&public_path)?;

    print_success(&format!(
        "Private key written to {}",
        private_path.display().to_string().cyan()
    ));
    print_success(&format!(
        "Public key written to {}",
        public_path.display().to_string().cyan()
    ));
    print_steps(
        "Next steps:",
        &[
            "Keep the private key secret; never commit it".to_string(),
            "Run `epic-auth jwks` to create the JWK Set".to_string(),
        ],
    );
    Ok(())
}
