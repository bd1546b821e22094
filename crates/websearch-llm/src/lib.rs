//! Grounded web search backends for the web search plugin.
//!
//! Each provider turns a query into a [`GroundedAnswer`]; the formatter then
//! splices citation markers into the text and appends the source list.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  SearchBackend trait                         │
//! │  - search(query, cancel) -> GroundedAnswer   │
//! └──────────────────────────────────────────────┘
//!                       │
//!      ┌────────────────┼────────────────┐
//!      ▼                ▼                ▼
//! ┌─────────┐   ┌──────────────┐   ┌─────────┐
//! │ Gemini  │   │ Code Assist  │   │ OpenAI  │
//! │ API key │   │    OAuth     │   │Responses│
//! └─────────┘   └──────────────┘   └─────────┘
//!                       │
//!                       ▼
//!        format_answer() -> WebSearchResult
//! ```

pub mod backend;
pub mod citation;
pub mod client;
pub mod error;
pub mod format;
pub mod types;

// Provider implementations
pub mod code_assist;
pub mod gemini;
pub mod openai;

pub use backend::{MockSearchBackend, SearchBackend, SharedSearchBackend, send_for_text};
pub use citation::{CitationInsertion, citation_marker, insert_citations, support_insertions};
pub use client::BackendFactory;
pub use code_assist::CodeAssistBackend;
pub use error::{LlmError, Result};
pub use format::{GroundedAnswer, format_answer, format_response};
pub use gemini::{DEFAULT_GEMINI_BASE, GeminiAuth, GeminiBackend, GeminiConfig};
pub use openai::{DEFAULT_OPENAI_BASE, OpenAiBackend, OpenAiConfig};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, GroundingMetadata,
    GroundingSupport, Part, ResponseEnvelope, Segment,
};
