//! Tools command - print the tool definitions a host registers.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use websearch_agent::{SearchServices, ToolRegistry, register_search_tools};
use websearch_config::{ProcessEnv, StaticAuth};

use super::Context;

/// Arguments for the tools command.
#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

/// Run the tools command.
///
/// Definitions do not depend on credentials, so no auth store is read.
pub fn run(args: ToolsArgs, ctx: &Context) -> Result<()> {
    let services = SearchServices::new(
        ctx.loaded.config.clone(),
        Arc::new(StaticAuth::new()),
        Arc::new(ProcessEnv),
    )?;

    let mut registry = ToolRegistry::new();
    register_search_tools(&mut registry, &services);

    let definitions = registry.definitions();
    let output = if args.pretty {
        serde_json::to_string_pretty(&definitions)?
    } else {
        serde_json::to_string(&definitions)?
    };
    println!("{}", output);
    Ok(())
}
