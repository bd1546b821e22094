//! Backend construction from resolved credentials.
//!
//! [`BackendFactory`] owns the HTTP client, the configured endpoints and the
//! shared token manager, and picks the right [`SearchBackend`] for a
//! provider and credential mode.

use std::sync::Arc;

use websearch_config::{Credentials, EndpointsConfig, EnvSource, WebSearchConfig};
use websearch_oauth::{OAuthTokenManager, SharedTokenManager, TokenCache, TokenManagerConfig};
use websearch_types::Provider;

use crate::backend::SharedSearchBackend;
use crate::code_assist::CodeAssistBackend;
use crate::error::{LlmError, Result};
use crate::gemini::{GeminiAuth, GeminiBackend, GeminiConfig};
use crate::openai::{OpenAiBackend, OpenAiConfig};

/// Builds search backends that share one HTTP client and token cache.
#[derive(Clone)]
pub struct BackendFactory {
    http: reqwest::Client,
    endpoints: EndpointsConfig,
    tokens: SharedTokenManager,
}

impl std::fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendFactory")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl BackendFactory {
    pub fn new(http: reqwest::Client, endpoints: EndpointsConfig, tokens: SharedTokenManager) -> Self {
        Self {
            http,
            endpoints,
            tokens,
        }
    }

    /// Build a factory from loaded configuration with a fresh token cache.
    ///
    /// The client carries no request timeout; callers bound a search through
    /// its cancellation token.
    pub fn from_config(config: &WebSearchConfig, env: &dyn EnvSource) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let tokens: SharedTokenManager = Arc::new(OAuthTokenManager::new(
            http.clone(),
            Arc::new(TokenCache::new()),
            TokenManagerConfig::from_config(config, env),
        ));

        Ok(Self::new(http, config.endpoints(), tokens))
    }

    pub fn endpoints(&self) -> &EndpointsConfig {
        &self.endpoints
    }

    /// The backend for `provider` authenticated with `credentials`.
    ///
    /// OAuth and well-known credentials are only meaningful for Google.
    pub fn build(
        &self,
        provider: Provider,
        credentials: Credentials,
        model: &str,
    ) -> Result<SharedSearchBackend> {
        tracing::debug!(
            provider = %provider,
            mode = credentials.mode(),
            model,
            "Building search backend"
        );

        match (provider, credentials) {
            (Provider::Google, Credentials::ApiKey { key, .. }) => Ok(Arc::new(GeminiBackend::new(
                self.http.clone(),
                GeminiConfig::api_key(key, model)
                    .with_base_url(&self.endpoints.generative_language),
            ))),
            (Provider::Google, Credentials::WellKnown { key, token }) => {
                Ok(Arc::new(GeminiBackend::new(
                    self.http.clone(),
                    GeminiConfig::api_key("", model)
                        .with_base_url(&self.endpoints.generative_language)
                        .with_auth(GeminiAuth::WellKnown { key, token }),
                )))
            }
            (Provider::Google, Credentials::OAuth(credentials)) => {
                Ok(Arc::new(CodeAssistBackend::new(
                    self.http.clone(),
                    &self.endpoints.code_assist,
                    model,
                    credentials,
                    self.tokens.clone(),
                )))
            }
            (Provider::OpenAi, Credentials::ApiKey { key, .. }) => Ok(Arc::new(OpenAiBackend::new(
                self.http.clone(),
                OpenAiConfig::new(key, model).with_base_url(&self.endpoints.openai),
            ))),
            (Provider::OpenAi, other) => Err(LlmError::Config(format!(
                "OpenAI does not support {} credentials",
                other.mode()
            ))),
        }
    }
}
