//! Search command - runs one query through the registered search tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use websearch_agent::{
    CancellationToken, GOOGLE_SEARCH_TOOL, SearchServices, ToolContext, ToolRegistry,
    WEB_SEARCH_TOOL, WebSearchTool, register_search_tools,
};
use websearch_config::{AuthStore, ProcessEnv};
use websearch_types::{Provider, WebSearchError, WebSearchResult};

use super::Context;

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// The search query (multiple words are joined with spaces)
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Use this provider instead of picking one from available credentials
    #[arg(long, value_parser = clap::value_parser!(Provider))]
    pub provider: Option<Provider>,

    /// Use the legacy google_search tool (Gemini API key only)
    #[arg(long, conflicts_with = "provider")]
    pub legacy: bool,

    /// Give up after this many seconds (no limit by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Run the search command.
///
/// Prints the JSON result on stdout; exits with status 2 when it carries
/// an error.
pub async fn run(args: SearchArgs, ctx: &Context) -> Result<ExitCode> {
    let query = args.query.join(" ");

    let auth = match AuthStore::open_default() {
        Ok(store) => store,
        Err(e) => return Ok(print_failure(WebSearchError::invalid_auth(e.to_string()))),
    };

    let services = match SearchServices::new(
        ctx.loaded.config.clone(),
        Arc::new(auth),
        Arc::new(ProcessEnv),
    ) {
        Ok(services) => services,
        Err(e) => return Ok(print_failure(WebSearchError::invalid_auth(e.to_string()))),
    };

    let mut registry = ToolRegistry::new();
    register_search_tools(&mut registry, &services);
    let tool_name = match (args.legacy, args.provider) {
        (true, _) => GOOGLE_SEARCH_TOOL,
        (false, Some(provider)) => {
            registry.register(WebSearchTool::pinned(services.clone(), provider));
            WEB_SEARCH_TOOL
        }
        (false, None) => WEB_SEARCH_TOOL,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling search");
            on_interrupt.cancel();
        }
    });
    if let Some(secs) = args.timeout {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!(timeout_secs = secs, "Search timed out, cancelling");
            on_deadline.cancel();
        });
    }

    if ctx.verbose {
        eprintln!("Searching with {}: {}", tool_name, query);
    }

    let output = registry
        .execute(
            tool_name,
            serde_json::json!({ "query": query }),
            &ToolContext::with_cancellation(cancel),
        )
        .await?;

    println!("{}", output.to_llm_content());

    Ok(if output.is_error() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

/// Print a failure result built before any tool ran.
fn print_failure(error: WebSearchError) -> ExitCode {
    println!("{}", failure_json(error));
    ExitCode::from(2)
}

fn failure_json(error: WebSearchError) -> String {
    WebSearchResult::failure(error).to_json_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_failure_is_a_result() {
        let json: serde_json::Value = serde_json::from_str(&failure_json(
            WebSearchError::invalid_auth("Configuration error: bad client"),
        ))
        .unwrap();
        assert_eq!(json["error"]["type"], "INVALID_AUTH");
        assert_eq!(json["returnDisplay"], "Error performing web search.");
        assert_eq!(
            json["llmContent"],
            "Error: Configuration error: bad client"
        );
    }
}
