//! Tool layer for the web search plugin.
//!
//! This crate provides the tool framework the host calls into and the two
//! search tools built on it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                               │
//! │  - Looks tools up by name                                   │
//! │  - Runs them with a ToolContext (cancellation, call id)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!       ┌──────────────┐                ┌───────────────┐
//!       │  web_search  │                │ google_search │
//!       │  (grounded)  │                │   (legacy)    │
//!       └──────────────┘                └───────────────┘
//!              │                               │
//!              └──────────► SearchServices ◄───┘
//!                   config, auth, backends (websearch-llm)
//! ```
//!
//! Tools always return a JSON-serialized `WebSearchResult`; search failures
//! travel inside it rather than as `Err`.

pub mod error;
pub mod tool;
pub mod tools;

pub use error::{AgentError, Result};

// Re-export tool types
pub use tool::{Tool, ToolContext, ToolDefinition, ToolRegistry, ToolResult};

// Re-export parameter validation types
pub use tool::{ParamExt, ParamResult, ParameterValidationError};

// Re-export search tools
pub use tools::{
    DEFAULT_LEGACY_MODEL, GOOGLE_SEARCH_TOOL, SearchServices, WEB_SEARCH_TOOL, WebSearchTool,
    register_search_tools,
};

pub use tokio_util::sync::CancellationToken;
