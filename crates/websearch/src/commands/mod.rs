//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod search;
pub mod tools;

use websearch_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration and the files it came from.
    pub loaded: LoadedConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}
