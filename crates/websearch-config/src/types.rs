//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [provider.google.options]   # per-provider options
//! model = "gemini-2.5-flash"
//!
//! [oauth]                     # OAuth refresh behavior
//! refresh_buffer_secs = 60
//! flavors = ["gemini-cli", "antigravity"]
//!
//! [oauth.flavor.gemini-cli]   # client credentials per flavor
//! client_id = "..."
//! client_secret = "..."
//!
//! [endpoints]                 # upstream base URLs
//! [logging]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use websearch_types::Provider;

use crate::resolver::EnvSource;

/// Default refresh buffer before token expiry, in seconds.
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 60;

/// Default OAuth client flavors, in preference order.
pub const DEFAULT_FLAVORS: [&str; 2] = ["gemini-cli", "antigravity"];

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Per-provider configuration keyed by provider id.
    pub provider: HashMap<String, ProviderConfig>,

    /// OAuth refresh configuration.
    pub oauth: Option<OAuthConfig>,

    /// Upstream endpoint overrides.
    pub endpoints: Option<EndpointsConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl WebSearchConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: WebSearchConfig) {
        for (name, config) in other.provider {
            self.provider.insert(name, config);
        }

        if other.oauth.is_some() {
            self.oauth = other.oauth;
        }

        if other.endpoints.is_some() {
            self.endpoints = other.endpoints;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Get the configuration block for a provider.
    pub fn provider_config(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.provider.get(provider.id())
    }

    /// Get the configured model for a provider.
    ///
    /// Absent and blank values both mean "not configured".
    pub fn model_for(&self, provider: Provider) -> Option<&str> {
        self.provider_config(provider).and_then(|p| p.model())
    }

    /// Set the model for a provider, creating the block if needed.
    pub fn set_model(&mut self, provider: Provider, model: impl Into<String>) {
        self.provider
            .entry(provider.id().to_string())
            .or_default()
            .options
            .model = Some(model.into());
    }

    /// Effective endpoints (configured or default).
    pub fn endpoints(&self) -> EndpointsConfig {
        self.endpoints.clone().unwrap_or_default()
    }

    /// Effective OAuth configuration (configured or default).
    pub fn oauth(&self) -> OAuthConfig {
        self.oauth.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration block for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider options.
    pub options: ProviderOptions,
}

impl ProviderConfig {
    /// The configured model, trimmed; `None` if absent or blank.
    pub fn model(&self) -> Option<&str> {
        self.options
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Options for one provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    /// Model used for grounded search.
    pub model: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// OAuth Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Seconds before expiry at which a cached token is refreshed proactively.
    pub refresh_buffer_secs: u64,

    /// Flavor names in preference order.
    pub flavors: Vec<String>,

    /// Client credentials per flavor name.
    pub flavor: HashMap<String, FlavorCredentials>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            flavors: DEFAULT_FLAVORS.iter().map(|s| s.to_string()).collect(),
            flavor: HashMap::new(),
        }
    }
}

impl OAuthConfig {
    /// Resolve each preferred flavor's client credentials.
    ///
    /// Config values win; otherwise `WEBSEARCH_<FLAVOR>_CLIENT_ID` and
    /// `WEBSEARCH_<FLAVOR>_CLIENT_SECRET` are consulted. A flavor with no
    /// credentials is still returned so that it can be reported as failed.
    pub fn resolve_flavors(&self, env: &dyn EnvSource) -> Vec<ResolvedFlavor> {
        let mut seen = Vec::new();
        let mut resolved = Vec::new();

        for name in &self.flavors {
            let name = name.trim();
            if name.is_empty() || seen.contains(&name) {
                continue;
            }
            seen.push(name);

            let configured = self.flavor.get(name);
            let prefix = flavor_env_prefix(name);

            let client_id = configured
                .and_then(|c| non_blank(c.client_id.as_deref()))
                .or_else(|| non_blank(env.var(&format!("{}_CLIENT_ID", prefix)).as_deref()));
            let client_secret = configured
                .and_then(|c| non_blank(c.client_secret.as_deref()))
                .or_else(|| non_blank(env.var(&format!("{}_CLIENT_SECRET", prefix)).as_deref()));

            resolved.push(ResolvedFlavor {
                name: name.to_string(),
                client_id,
                client_secret,
            });
        }

        resolved
    }
}

/// Client credentials for one OAuth flavor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlavorCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// A flavor with its credentials looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFlavor {
    pub name: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

fn flavor_env_prefix(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("WEBSEARCH_{}", normalized)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoints
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream base URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Gemini API base (API-key mode).
    pub generative_language: String,
    /// Cloud Code Assist base (OAuth mode).
    pub code_assist: String,
    /// OAuth token endpoint.
    pub token: String,
    /// OpenAI API base.
    pub openai: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            generative_language: "https://generativelanguage.googleapis.com".to_string(),
            code_assist: "https://cloudcode-pa.googleapis.com".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            openai: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl EndpointsConfig {
    /// Point every endpoint at one base URL (for mock servers).
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            generative_language: base.to_string(),
            code_assist: base.to_string(),
            token: format!("{}/token", base),
            openai: format!("{}/v1", base),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for rolling JSON log files. Defaults to `<config dir>/logs`.
    pub dir: Option<PathBuf>,
    /// Whether to write the JSON log file at all.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
