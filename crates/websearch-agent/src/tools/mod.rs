//! Built-in tools.
//!
//! - `web_search`: grounded search with inline citations
//! - `google_search`: legacy Gemini API search

mod web_search;

pub use web_search::{
    DEFAULT_LEGACY_MODEL, GOOGLE_SEARCH_TOOL, SearchServices, WEB_SEARCH_TOOL, WebSearchTool,
};

use crate::tool::ToolRegistry;

/// Register both search tools against shared services.
pub fn register_search_tools(registry: &mut ToolRegistry, services: &SearchServices) {
    registry.register(WebSearchTool::grounded(services.clone()));
    registry.register(WebSearchTool::legacy(services.clone()));
}
