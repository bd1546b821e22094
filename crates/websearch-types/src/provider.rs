//! Upstream providers that can answer a grounded web search.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A provider backing the web search capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (API key) or Cloud Code Assist (OAuth).
    Google,
    /// OpenAI Responses API with the `web_search` tool.
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// All supported providers, in default preference order.
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::OpenAi];

    /// Identifier used as the key in the config file and the auth store.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenAi => "openai",
        }
    }

    /// Prefix used for the provider-specific failure error type.
    pub fn error_prefix(&self) -> &'static str {
        match self {
            Provider::Google => "GOOGLE",
            Provider::OpenAi => "OPENAI",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::OpenAi => "OpenAI",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when a provider id is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider '{0}' (expected one of: google, openai)")]
pub struct ParseProviderError(pub String);

impl FromStr for Provider {
    type Err = ParseProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(Provider::Google),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ParseProviderError(other.to_string())),
        }
    }
}
