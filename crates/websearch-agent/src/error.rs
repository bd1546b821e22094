//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for tool plumbing.
///
/// Search failures never surface here; the search tools embed them in the
/// result they return.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Search backend error.
    #[error("LLM error: {0}")]
    Llm(#[from] websearch_llm::LlmError),

    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found() {
        let err = AgentError::ToolNotFound("unknown_tool".to_string());
        assert!(err.to_string().contains("Tool not found"));
    }

    #[test]
    fn test_from_llm_error() {
        let err: AgentError = websearch_llm::LlmError::Cancelled.into();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
