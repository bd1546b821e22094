//! Config command - show the merged configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the merged configuration and the files it came from
    Show,

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    println!("# websearch configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("# No config files loaded (using defaults)\n");
    } else {
        for path in sources {
            println!("# loaded: {}", path.display());
        }
        println!();
    }

    for warning in &loaded.warnings {
        println!("# warning: {}", warning);
    }

    let mut config = loaded.config.clone();
    if let Some(oauth) = config.oauth.as_mut() {
        for flavor in oauth.flavor.values_mut() {
            if flavor.client_secret.is_some() {
                flavor.client_secret = Some("<redacted>".to_string());
            }
        }
    }
    print!("{}", config.to_toml()?);

    if ctx.verbose {
        println!("\n# effective endpoints");
        print!("{}", toml_endpoints(&config)?);
    }
    Ok(())
}

fn toml_endpoints(config: &websearch_config::WebSearchConfig) -> Result<String> {
    let mut only = websearch_config::WebSearchConfig::new();
    only.endpoints = Some(config.endpoints());
    Ok(only.to_toml()?)
}

fn cmd_path() -> Result<()> {
    match websearch_config::xdg_config_path() {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("Could not determine config directory"),
    }
    Ok(())
}
