//! The canonical web search result and its error envelope.
//!
//! Every invocation of the search capability produces exactly one
//! [`WebSearchResult`], serialized to JSON for the host. Failures are never
//! raised across the tool boundary; they travel inside the `error` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Provider;

// ─────────────────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Web page metadata for a single citable source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// One citable source document.
///
/// The position of a source in [`WebSearchResult::sources`] plus one is the
/// number used by the inline `[n]` markers in the answer text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

impl Source {
    /// Create a web source from an optional title and URI.
    pub fn web(title: Option<String>, uri: Option<String>) -> Self {
        Self {
            web: Some(WebSource { title, uri }),
        }
    }

    /// Title of the source, if the provider supplied one.
    pub fn title(&self) -> Option<&str> {
        self.web.as_ref().and_then(|w| w.title.as_deref())
    }

    /// URI of the source, if the provider supplied one.
    pub fn uri(&self) -> Option<&str> {
        self.web.as_ref().and_then(|w| w.uri.as_deref())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Classification of a search failure.
///
/// Serialized as the upper-snake-case `type` string seen by the host, e.g.
/// `INVALID_QUERY` or `GOOGLE_WEB_SEARCH_FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown argument keys were supplied.
    InvalidToolArguments,
    /// The query was missing or blank.
    InvalidQuery,
    /// The required model configuration was missing or blank.
    InvalidModel,
    /// Credentials were missing, malformed, or of an unsupported type.
    InvalidAuth,
    /// The provider call failed after validation passed.
    WebSearchFailed(Provider),
}

impl ErrorKind {
    /// The wire representation of this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidToolArguments => "INVALID_TOOL_ARGUMENTS",
            ErrorKind::InvalidQuery => "INVALID_QUERY",
            ErrorKind::InvalidModel => "INVALID_MODEL",
            ErrorKind::InvalidAuth => "INVALID_AUTH",
            ErrorKind::WebSearchFailed(Provider::Google) => "GOOGLE_WEB_SEARCH_FAILED",
            ErrorKind::WebSearchFailed(Provider::OpenAi) => "OPENAI_WEB_SEARCH_FAILED",
        }
    }

    /// Parse the wire representation back into a kind.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s {
            "INVALID_TOOL_ARGUMENTS" => ErrorKind::InvalidToolArguments,
            "INVALID_QUERY" => ErrorKind::InvalidQuery,
            "INVALID_MODEL" => ErrorKind::InvalidModel,
            "INVALID_AUTH" => ErrorKind::InvalidAuth,
            "GOOGLE_WEB_SEARCH_FAILED" => ErrorKind::WebSearchFailed(Provider::Google),
            "OPENAI_WEB_SEARCH_FAILED" => ErrorKind::WebSearchFailed(Provider::OpenAi),
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ErrorKind::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error type '{}'", s)))
    }
}

/// A typed failure embedded in a [`WebSearchResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

impl WebSearchError {
    /// Create a new error envelope.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Unknown argument keys were supplied.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToolArguments, message)
    }

    /// The query was missing or blank.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidQuery, message)
    }

    /// The model was not configured.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidModel, message)
    }

    /// Credentials were unusable.
    pub fn invalid_auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidAuth, message)
    }

    /// The provider call failed.
    pub fn search_failed(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WebSearchFailed(provider), message)
    }
}

impl std::fmt::Display for WebSearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for WebSearchError {}

// ─────────────────────────────────────────────────────────────────────────────
// Result
// ─────────────────────────────────────────────────────────────────────────────

/// Canonical outcome of a web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchResult {
    /// Content handed back to the model.
    pub llm_content: String,
    /// Short human-facing summary.
    pub return_display: String,
    /// Sources in provider chunk order; present only when at least one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WebSearchError>,
}

impl WebSearchResult {
    /// Create a successful result without sources.
    pub fn success(llm_content: impl Into<String>, return_display: impl Into<String>) -> Self {
        Self {
            llm_content: llm_content.into(),
            return_display: return_display.into(),
            sources: None,
            error: None,
        }
    }

    /// Attach sources; an empty list leaves the field absent.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = if sources.is_empty() {
            None
        } else {
            Some(sources)
        };
        self
    }

    /// Create a failure result carrying the given error.
    pub fn failure(error: WebSearchError) -> Self {
        Self {
            llm_content: format!("Error: {}", error.message),
            return_display: "Error performing web search.".to_string(),
            sources: None,
            error: Some(error),
        }
    }

    /// Check if this result carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize to the JSON string returned to the host.
    pub fn to_json_string(&self) -> String {
        // Only strings and plain structs; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"llmContent\":{:?},\"returnDisplay\":{:?}}}",
                self.llm_content, self.return_display
            )
        })
    }
}

impl From<WebSearchError> for WebSearchResult {
    fn from(error: WebSearchError) -> Self {
        Self::failure(error)
    }
}
