use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "epic-auth")]
#[command(about = "Epic FHIR backend services authentication: keys, JWK Sets and access tokens")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a TOML configuration file (default: ./epic-auth.toml if present)
    #[arg(short, long, global = true, env = "EPIC_AUTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// OAuth client ID (overrides config)
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// Token endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub token_endpoint: Option<String>,

    /// Log level: trace, debug, info, warn, error, off (RUST_LOG wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an RSA key pair (PKCS#8 private key, SPKI public key)
    Keygen(KeygenArgs),
    /// Convert the public key into a JWK Set file
    Jwks(JwksArgs),
    /// Sign a client assertion and exchange it for an access token
    Token(TokenArgs),
    /// Serve the JWK Set over HTTP for local testing
    Serve(ServeArgs),
}

#[derive(clap::Args)]
pub struct KeygenArgs {
    /// Key size in bits (2048-4096)
    #[arg(long, default_value_t = 2048)]
    pub bits: usize,
    /// Where to write the private key (default: keys.private_key_path)
    #[arg(long)]
    pub private_key: Option<PathBuf>,
    /// Where to write the public key (default: keys.public_key_path)
    #[arg(long)]
    pub public_key: Option<PathBuf>,
    /// Overwrite existing key files
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args)]
pub struct JwksArgs {
    /// PEM public key to encode (default: keys.public_key_path)
    #[arg(long)]
    pub public_key: Option<PathBuf>,
    /// Output file (default: jwks.path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Key ID (default: keys.kid)
    #[arg(long, conflicts_with = "thumbprint_kid", value_parser = non_blank)]
    pub kid: Option<String>,
    /// Use the RFC 7638 thumbprint as the key ID
    #[arg(long)]
    pub thumbprint_kid: bool,
}

#[derive(clap::Args)]
pub struct TokenArgs {
    /// PEM private key (default: keys.private_key or keys.private_key_path)
    #[arg(long)]
    pub private_key: Option<PathBuf>,
    /// Key ID placed in the assertion header (default: keys.kid)
    #[arg(long, value_parser = non_blank)]
    pub kid: Option<String>,
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Bind address (default: server.host)
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port (default: server.port)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// JWK Set file to serve (default: jwks.path)
    #[arg(long)]
    pub jwks: Option<PathBuf>,
}

fn non_blank(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}
