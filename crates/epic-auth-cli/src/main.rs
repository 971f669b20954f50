mod cli;
mod commands;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;
use epic_auth::EpicAuthConfig;
use epic_auth::config::loader::load_config;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("{e:#}"));
            std::process::exit(2);
        }
    };

    observability::init_tracing(&config.logging.level);

    if let Err(e) = run(&cli, &config).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Loads configuration and applies global command-line overrides.
fn resolve_config(cli: &Cli) -> Result<EpicAuthConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(client_id) = &cli.client_id {
        config.client_id = client_id.clone();
    }
    if let Some(endpoint) = &cli.token_endpoint {
        config.token_endpoint = endpoint.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: &Cli, config: &EpicAuthConfig) -> Result<()> {
    match &cli.command {
        Commands::Keygen(args) => commands::keygen::keygen(config, args)?,
        Commands::Jwks(args) => commands::jwks::jwks(config, args)?,
        Commands::Token(args) => commands::token::token(config, args).await?,
        Commands::Serve(args) => commands::serve::serve(config, args).await?,
    }
    Ok(())
}
