//! Auth command - report which credentials each provider would use.

use anyhow::Result;
use clap::{Args, Subcommand};
use websearch_config::{
    AuthSource, AuthStore, Credentials, ProcessEnv, SecretSource, resolve_credentials,
};
use websearch_types::Provider;

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Show credential status per provider (never prints secrets)
    Status,
}

/// Run the auth command.
pub fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Status => cmd_status(ctx),
    }
}

fn cmd_status(ctx: &Context) -> Result<()> {
    let store = AuthStore::open_default()?;
    match store.path() {
        Some(path) => println!("Auth store: {}", path.display()),
        None => println!("Auth store: (no config directory)"),
    }
    println!();

    for provider in Provider::ALL {
        let model = ctx
            .loaded
            .config
            .model_for(provider)
            .unwrap_or("(not configured)");

        let status = store
            .load(provider)
            .and_then(|record| resolve_credentials(provider, record.as_ref(), &ProcessEnv));
        let line = match status {
            Ok(credentials) => describe(&credentials),
            Err(e) => format!("unavailable: {}", e),
        };

        println!("{:<8} {}", provider.id(), line);
        println!("{:<8} model: {}", "", model);
    }
    Ok(())
}

fn describe(credentials: &Credentials) -> String {
    match credentials {
        Credentials::ApiKey {
            source: SecretSource::AuthStore,
            ..
        } => "api key (auth store)".to_string(),
        Credentials::ApiKey {
            source: SecretSource::EnvVar(var),
            ..
        } => format!("api key (${})", var),
        Credentials::OAuth(_) => "oauth (auth store, refreshed on demand)".to_string(),
        Credentials::WellKnown { .. } => "well-known key and token (auth store)".to_string(),
    }
}
