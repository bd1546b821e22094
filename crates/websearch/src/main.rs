//! websearch - provider-grounded web search from the command line.
//!
//! Main entry point for the websearch CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{auth, config, search, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// websearch - web search answers with inline citations
#[derive(Parser)]
#[command(name = "websearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a web search and print the JSON result
    Search(search::SearchArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Credential status
    Auth(auth::AuthArgs),

    /// Print the search tool definitions as JSON
    Tools(tools::ToolsArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

const CRATE_TARGETS: &[&str] = &[
    "websearch",
    "websearch_agent",
    "websearch_llm",
    "websearch_oauth",
    "websearch_config",
];

fn filter_for(level: &str, fallback: &str) -> String {
    let mut directives: Vec<String> = CRATE_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    directives.push(fallback.to_string());
    directives.join(",")
}

/// Console (human-readable, stderr) plus an optional rolling JSON file.
///
/// The returned guard must live until exit so buffered lines get flushed.
fn init_logging(
    verbose: bool,
    log_dir: Option<PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let console_filter = if verbose {
        filter_for("debug", "info")
    } else {
        filter_for("info", "warn")
    };
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::EnvFilter::new(console_filter));

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "websearch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(filter_for("trace", "info")));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = websearch_config::load_config(None)?;
    let logging = loaded.config.logging.clone().unwrap_or_default();
    let log_dir = if logging.file {
        logging
            .dir
            .or_else(|| websearch_config::xdg_config_dir().map(|d| d.join("logs")))
    } else {
        None
    };
    let _guard = init_logging(cli.verbose, log_dir);

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        loaded,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Search(args) => search::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).map(|()| ExitCode::SUCCESS),
        Commands::Auth(args) => auth::run(args, &ctx).map(|()| ExitCode::SUCCESS),
        Commands::Tools(args) => tools::run(args, &ctx).map(|()| ExitCode::SUCCESS),
    }
}
