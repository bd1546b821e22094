//! Gemini API backend (API key or well-known key/token pair).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use websearch_types::Provider;

use crate::backend::{SearchBackend, send_for_text};
use crate::error::Result;
use crate::format::GroundedAnswer;
use crate::types::{GenerateContentRequest, ResponseEnvelope};

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";

/// How requests to the Gemini API are authenticated.
#[derive(Clone)]
pub enum GeminiAuth {
    /// `x-goog-api-key` header.
    ApiKey(String),
    /// `x-goog-api-key` plus a bearer token, used as-is.
    WellKnown { key: String, token: String },
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiAuth::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
            GeminiAuth::WellKnown { .. } => write!(f, "WellKnown(<redacted>)"),
        }
    }
}

/// Configuration for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub auth: GeminiAuth,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    /// Config for an API key against the public endpoint.
    pub fn api_key(key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            auth: GeminiAuth::ApiKey(key.into()),
            base_url: DEFAULT_GEMINI_BASE.to_string(),
            model: model.into(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Switch to well-known key/token auth.
    pub fn with_auth(mut self, auth: GeminiAuth) -> Self {
        self.auth = auth;
        self
    }
}

/// Gemini `generateContent` with Google Search grounding.
pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    /// `{base}/v1beta/models/{model}:generateContent`, with the model URL-encoded.
    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.model)
        )
    }

    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            GeminiAuth::ApiKey(key) => builder.header("x-goog-api-key", key),
            GeminiAuth::WellKnown { key, token } => builder
                .header("x-goog-api-key", key)
                .bearer_auth(token),
        }
    }
}

#[async_trait]
impl SearchBackend for GeminiBackend {
    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<GroundedAnswer> {
        let request = GenerateContentRequest::grounded_search(query);

        tracing::debug!(
            backend = "gemini",
            model = %self.config.model,
            "Sending grounded generateContent request"
        );

        let builder = self.add_headers(self.client.post(self.generate_url()).json(&request));
        let body = send_for_text(builder, cancel).await?;
        let response = ResponseEnvelope::decode(&body)?;
        Ok(GroundedAnswer::from_gemini(&response))
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, auth: GeminiAuth, model: &str) -> GeminiBackend {
        GeminiBackend::new(
            reqwest::Client::new(),
            GeminiConfig::api_key("unused", model)
                .with_base_url(server.uri())
                .with_auth(auth),
        )
    }

    #[tokio::test]
    async fn test_api_key_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "latest rust release"}]}],
                "tools": [{"googleSearch": {}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Rust 1.93"}]},
                    "groundingMetadata": {
                        "groundingChunks": [{"web": {"title": "blog", "uri": "https://blog.rust-lang.org"}}],
                        "groundingSupports": [{"segment": {"endIndex": 9}, "groundingChunkIndices": [0]}]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = backend(
            &server,
            GeminiAuth::ApiKey("test-key".to_string()),
            "gemini-2.5-flash",
        )
        .search("latest rust release", &CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(answer.text, "Rust 1.93");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.supports.len(), 1);
    }

    #[tokio::test]
    async fn test_model_is_url_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/tuned%2Fmodel:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]})))
            .expect(1)
            .mount(&server)
            .await;

        let answer = backend(&server, GeminiAuth::ApiKey("k".to_string()), "tuned/model")
            .search("q", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.text, "ok");
    }

    #[tokio::test]
    async fn test_well_known_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-goog-api-key", "K"))
            .and(header("authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]})))
            .expect(1)
            .mount(&server)
            .await;

        let auth = GeminiAuth::WellKnown {
            key: "K".to_string(),
            token: "T".to_string(),
        };
        backend(&server, auth, "gemini-2.5-flash")
            .search("q", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(&server, GeminiAuth::ApiKey("bad".to_string()), "gemini-2.5-flash")
            .search("q", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_error_object_with_200_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": 500, "message": "internal"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(&server, GeminiAuth::ApiKey("k".to_string()), "gemini-2.5-flash")
            .search("q", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_cancelled_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = backend(&server, GeminiAuth::ApiKey("k".to_string()), "m")
            .search("q", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Cancelled));
    }
}
