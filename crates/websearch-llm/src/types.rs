//! Gemini `generateContent` wire types.
//!
//! Shared by the Gemini API (API key) and Cloud Code Assist (OAuth) paths.
//! Code Assist wraps the same payloads, see [`ResponseEnvelope`].

use serde::{Deserialize, Serialize};
use websearch_types::Source;

use crate::error::{LlmError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// A `generateContent` request with Google Search grounding enabled.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub tools: Vec<SearchTool>,
}

impl GenerateContentRequest {
    /// A single user turn carrying `query`, with the search tool attached.
    pub fn grounded_search(query: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(query)],
            }],
            tools: vec![SearchTool::default()],
        }
    }
}

/// Code Assist request wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct CodeAssistRequest<'a> {
    pub project: &'a str,
    pub model: &'a str,
    pub request: &'a GenerateContentRequest,
}

/// The `{ "googleSearch": {} }` tool declaration.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

/// One conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One fragment of a turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on internal reasoning fragments, which never reach the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }

    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A `generateContent` response.
///
/// `candidates` is required so that an error object or an unrelated JSON
/// body never decodes as an empty answer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    pub fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

impl Candidate {
    /// Concatenated non-thought text parts, in order.
    pub fn answer_text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| !p.is_thought())
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

/// Grounding evidence attached to a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    /// Citable sources, shaped exactly like the canonical [`Source`].
    #[serde(default)]
    pub grounding_chunks: Vec<Source>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
}

/// A span of answer text and the chunks supporting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub segment: Option<Segment>,
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
}

impl GroundingSupport {
    /// A support ending at `end_index` backed by `chunks`.
    pub fn new(end_index: usize, chunks: impl Into<Vec<usize>>) -> Self {
        Self {
            segment: Some(Segment {
                start_index: None,
                end_index: Some(end_index),
                text: None,
            }),
            grounding_chunk_indices: chunks.into(),
        }
    }
}

/// A span of the answer text, in UTF-8 byte offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: Option<usize>,
    #[serde(default)]
    pub text: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// The outer shapes a `generateContent` payload arrives in.
///
/// Tried in order: a JSON array of payloads (first element wins), an object
/// nesting the payload under `response`, then the bare payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Batched(Vec<ResponseEnvelope>),
    Wrapped { response: GenerateContentResponse },
    Direct(GenerateContentResponse),
}

impl ResponseEnvelope {
    /// Decode a raw body into the inner response.
    ///
    /// A payload with no candidates is rejected rather than treated as an
    /// empty answer.
    pub fn decode(body: &str) -> Result<GenerateContentResponse> {
        let envelope: ResponseEnvelope = serde_json::from_str(body).map_err(|e| {
            LlmError::InvalidResponse(format!("unrecognized generateContent payload: {}", e))
        })?;
        let response = envelope.into_response()?;
        if response.candidates.is_empty() {
            return Err(LlmError::InvalidResponse(
                "generateContent response has no candidates".to_string(),
            ));
        }
        Ok(response)
    }

    fn into_response(self) -> Result<GenerateContentResponse> {
        match self {
            ResponseEnvelope::Batched(items) => match items.into_iter().next() {
                Some(first) => first.into_response(),
                None => Err(LlmError::InvalidResponse(
                    "empty generateContent response array".to_string(),
                )),
            },
            ResponseEnvelope::Wrapped { response } => Ok(response),
            ResponseEnvelope::Direct(response) => Ok(response),
        }
    }
}
