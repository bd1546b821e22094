//! Web search tools backed by provider grounding.
//!
//! Two tools share one pipeline:
//!
//! - `web_search` (grounded) requires a configured model and picks the
//!   provider from the available credentials, Google first.
//! - `google_search` (legacy) only talks to the Gemini API with a key and
//!   falls back to a default model.
//!
//! Validation runs in a fixed order (arguments, query, model, credentials)
//! and every failure is returned inside the [`WebSearchResult`], never as
//! an `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use websearch_config::{AuthSource, Credentials, EnvSource, WebSearchConfig, resolve_credentials};
use websearch_llm::{BackendFactory, SharedSearchBackend, format_answer};
use websearch_types::{Provider, WebSearchError, WebSearchResult};

use crate::error::Result;
use crate::tool::{ParamExt, ParameterValidationError, Tool, ToolContext, ToolResult};

/// Name of the grounded tool.
pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Name of the legacy Google-only tool.
pub const GOOGLE_SEARCH_TOOL: &str = "google_search";

/// Model used by the legacy tool when none is configured.
pub const DEFAULT_LEGACY_MODEL: &str = "gemini-2.5-flash";

const ALLOWED_PARAMS: &[&str] = &["query"];

// ─────────────────────────────────────────────────────────────────────────────
// Shared Services
// ─────────────────────────────────────────────────────────────────────────────

enum Backends {
    Factory(BackendFactory),
    /// One backend for every call, regardless of credential mode.
    Fixed(SharedSearchBackend),
}

/// Configuration, credential sources and backends shared by the search tools.
#[derive(Clone)]
pub struct SearchServices {
    config: Arc<WebSearchConfig>,
    auth: Arc<dyn AuthSource>,
    env: Arc<dyn EnvSource>,
    backends: Arc<Backends>,
}

impl std::fmt::Debug for SearchServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchServices").finish_non_exhaustive()
    }
}

impl SearchServices {
    /// Services that build real provider backends.
    pub fn new(
        config: WebSearchConfig,
        auth: Arc<dyn AuthSource>,
        env: Arc<dyn EnvSource>,
    ) -> Result<Self> {
        let factory = BackendFactory::from_config(&config, env.as_ref())?;
        Ok(Self {
            config: Arc::new(config),
            auth,
            env,
            backends: Arc::new(Backends::Factory(factory)),
        })
    }

    /// Route every search to `backend`. Credentials are still validated.
    pub fn with_backend(mut self, backend: SharedSearchBackend) -> Self {
        self.backends = Arc::new(Backends::Fixed(backend));
        self
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }

    /// Resolve credentials for `provider` from the auth store and environment.
    pub fn credentials(&self, provider: Provider) -> websearch_config::Result<Credentials> {
        let record = self.auth.load(provider)?;
        resolve_credentials(provider, record.as_ref(), self.env.as_ref())
    }

    fn backend(
        &self,
        provider: Provider,
        credentials: Credentials,
        model: &str,
    ) -> websearch_llm::Result<SharedSearchBackend> {
        match self.backends.as_ref() {
            Backends::Factory(factory) => factory.build(provider, credentials, model),
            Backends::Fixed(backend) => Ok(backend.clone()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchMode {
    Grounded { pinned: Option<Provider> },
    Legacy,
}

/// A provider-grounded web search tool.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    services: SearchServices,
    mode: SearchMode,
}

/// What a validated call will run with.
struct SearchPlan {
    provider: Provider,
    model: String,
    credentials: Credentials,
}

impl WebSearchTool {
    /// The grounded `web_search` tool.
    pub fn grounded(services: SearchServices) -> Self {
        Self {
            services,
            mode: SearchMode::Grounded { pinned: None },
        }
    }

    /// The grounded tool, always using `provider`.
    pub fn pinned(services: SearchServices, provider: Provider) -> Self {
        Self {
            services,
            mode: SearchMode::Grounded {
                pinned: Some(provider),
            },
        }
    }

    /// The legacy `google_search` tool.
    pub fn legacy(services: SearchServices) -> Self {
        Self {
            services,
            mode: SearchMode::Legacy,
        }
    }

    /// Run a search and always produce a result.
    pub async fn search(&self, params: &Value, ctx: &ToolContext) -> WebSearchResult {
        let query = match validate_params(params) {
            Ok(query) => query,
            Err(e) => return e.into(),
        };

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(tool = self.name(), error = %e, "Search rejected before any request");
                return e.into();
            }
        };

        let backend = match self
            .services
            .backend(plan.provider, plan.credentials, &plan.model)
        {
            Ok(backend) => backend,
            Err(e) => return WebSearchError::invalid_auth(e.to_string()).into(),
        };

        tracing::debug!(
            tool = self.name(),
            provider = %plan.provider,
            backend = backend.name(),
            model = %plan.model,
            "Running web search"
        );

        match backend.search(query, &ctx.cancellation).await {
            Ok(answer) => format_answer(&answer, query),
            Err(e) => {
                tracing::error!(
                    tool = self.name(),
                    provider = %plan.provider,
                    error = %e,
                    "Web search failed"
                );
                WebSearchError::search_failed(
                    plan.provider,
                    format!("Error during web search for query \"{}\": {}", query, e),
                )
                .into()
            }
        }
    }

    fn plan(&self) -> std::result::Result<SearchPlan, WebSearchError> {
        match self.mode {
            SearchMode::Legacy => {
                let provider = Provider::Google;
                let model = self
                    .services
                    .config
                    .model_for(provider)
                    .unwrap_or(DEFAULT_LEGACY_MODEL)
                    .to_string();
                let credentials = self.credentials(provider)?;
                if !matches!(credentials, Credentials::ApiKey { .. }) {
                    return Err(WebSearchError::invalid_auth(format!(
                        "{} requires a Google API key, found {} credentials. Use {} instead.",
                        GOOGLE_SEARCH_TOOL,
                        credentials.mode(),
                        WEB_SEARCH_TOOL
                    )));
                }
                Ok(SearchPlan {
                    provider,
                    model,
                    credentials,
                })
            }
            SearchMode::Grounded { pinned } => {
                let provider = pinned.unwrap_or_else(|| self.preferred_provider());
                let model = self
                    .services
                    .config
                    .model_for(provider)
                    .ok_or_else(|| {
                        WebSearchError::invalid_model(format!(
                            "No model configured for {} web search. Set provider.{}.options.model in the config file.",
                            provider,
                            provider.id()
                        ))
                    })?
                    .to_string();
                let credentials = self.credentials(provider)?;
                Ok(SearchPlan {
                    provider,
                    model,
                    credentials,
                })
            }
        }
    }

    /// First provider with usable credentials; Google when none has any.
    fn preferred_provider(&self) -> Provider {
        Provider::ALL
            .into_iter()
            .find(|p| self.services.credentials(*p).is_ok())
            .unwrap_or(Provider::Google)
    }

    fn credentials(&self, provider: Provider) -> std::result::Result<Credentials, WebSearchError> {
        self.services
            .credentials(provider)
            .map_err(|e| WebSearchError::invalid_auth(e.to_string()))
    }
}

/// Check arguments then query, returning the query on success.
fn validate_params(params: &Value) -> std::result::Result<&str, WebSearchError> {
    params
        .check_allowed_keys(ALLOWED_PARAMS)
        .map_err(|e| WebSearchError::invalid_arguments(format!("Invalid tool arguments: {}", e)))?;

    let query = params
        .required_str("query", "provide the search query as a string")
        .map_err(|e| WebSearchError::invalid_query(e.to_string()))?;

    if query.trim().is_empty() {
        return Err(WebSearchError::invalid_query(
            ParameterValidationError::invalid_value("query", query, "query cannot be empty")
                .to_string(),
        ));
    }
    Ok(query)
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        match self.mode {
            SearchMode::Grounded { .. } => WEB_SEARCH_TOOL,
            SearchMode::Legacy => GOOGLE_SEARCH_TOOL,
        }
    }

    fn description(&self) -> &str {
        match self.mode {
            SearchMode::Grounded { .. } => {
                "Search the web and answer with inline citations. Returns the answer text, \
                 numbered [n] markers, and the list of sources they refer to."
            }
            SearchMode::Legacy => {
                "Search the web via Google Search grounding in the Gemini API. Returns a \
                 cited answer and its sources."
            }
        }
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        let result = self.search(&params, ctx).await;
        Ok(ToolResult::json(serde_json::to_value(&result)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
