//! OpenAI Responses API backend with the hosted `web_search` tool.
//!
//! The answer is the concatenation of every `output_text` item. Each
//! `url_citation` annotation contributes one source and one support whose
//! end offset is converted from characters to UTF-8 bytes of the answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use websearch_types::{Provider, Source};

use crate::backend::{SearchBackend, send_for_text};
use crate::error::{LlmError, Result};
use crate::format::GroundedAnswer;
use crate::types::GroundingSupport;

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for [`OpenAiBackend`].
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE.to_string(),
            model: model.into(),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(client: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { client, config }
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchBackend for OpenAiBackend {
    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<GroundedAnswer> {
        let request = ResponsesRequest {
            model: &self.config.model,
            input: query,
            tools: vec![ResponsesTool {
                kind: "web_search",
            }],
        };

        tracing::debug!(backend = "openai", model = %self.config.model, "Sending responses request");

        let builder = self
            .client
            .post(self.responses_url())
            .bearer_auth(&self.config.api_key)
            .json(&request);
        let body = send_for_text(builder, cancel).await?;
        Ok(ResponsesResponse::decode(&body)?.into_answer())
    }

    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    tools: Vec<ResponsesTool>,
}

#[derive(Debug, Serialize)]
struct ResponsesTool {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<MessageContent>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent {
    OutputText {
        #[serde(default)]
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Annotation {
    UrlCitation {
        #[serde(default)]
        end_index: Option<usize>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl ResponsesResponse {
    /// Decode a body, rejecting anything without output items.
    fn decode(body: &str) -> Result<Self> {
        let response: ResponsesResponse = serde_json::from_str(body)?;
        if response.output.is_empty() {
            return Err(LlmError::InvalidResponse(
                "responses payload has no output items".to_string(),
            ));
        }
        Ok(response)
    }

    fn into_answer(self) -> GroundedAnswer {
        let mut answer = GroundedAnswer::default();

        let texts = self.output.into_iter().flat_map(|item| match item {
            OutputItem::Message { content } => content,
            OutputItem::Other => Vec::new(),
        });

        for content in texts {
            let MessageContent::OutputText { text, annotations } = content else {
                continue;
            };
            let base = answer.text.len();

            for annotation in annotations {
                let Annotation::UrlCitation {
                    end_index,
                    url,
                    title,
                } = annotation
                else {
                    continue;
                };
                let chunk = answer.sources.len();
                answer.sources.push(Source::web(title, url));
                if let Some(end) = end_index {
                    answer
                        .supports
                        .push(GroundingSupport::new(base + char_to_byte(&text, end), [chunk]));
                }
            }

            answer.text.push_str(&text);
        }

        answer
    }
}

/// Byte offset of the `chars`-th character, clamped to the end of `text`.
fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format_answer;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::new(
            reqwest::Client::new(),
            OpenAiConfig::new("sk-test", "gpt-4.1").with_base_url(server.uri()),
        )
    }

    #[test]
    fn test_char_to_byte() {
        assert_eq!(char_to_byte("abc", 2), 2);
        assert_eq!(char_to_byte("héllo", 2), 3);
        assert_eq!(char_to_byte("日本", 1), 3);
        assert_eq!(char_to_byte("日本", 2), 6);
        assert_eq!(char_to_byte("日本", 99), 6);
    }

    #[test]
    fn test_normalizes_text_and_citations() {
        let response: ResponsesResponse = serde_json::from_value(json!({
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "Café opens.", "annotations": [
                        {"type": "url_citation", "start_index": 0, "end_index": 4,
                         "url": "https://cafe.example", "title": "Café"}
                    ]},
                    {"type": "refusal", "refusal": "ignored"},
                    {"type": "output_text", "text": " Closes late.", "annotations": [
                        {"type": "url_citation", "end_index": 13, "url": "https://late.example"},
                        {"type": "file_citation", "file_id": "f"}
                    ]}
                ]}
            ]
        }))
        .unwrap();

        let answer = response.into_answer();
        assert_eq!(answer.text, "Café opens. Closes late.");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].title(), Some("Café"));
        assert_eq!(answer.sources[1].title(), None);
        // "Café" is 5 bytes; second part starts at byte 12.
        assert_eq!(answer.supports[0], GroundingSupport::new(5, [0]));
        assert_eq!(answer.supports[1], GroundingSupport::new(12 + 13, [1]));

        let result = format_answer(&answer, "cafe");
        assert!(
            result
                .llm_content
                .contains("Café[1] opens. Closes late.[2]\n\nSources:\n[1] Café (https://cafe.example)\n[2] Untitled (https://late.example)")
        );
    }

    #[tokio::test]
    async fn test_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "gpt-4.1",
                "input": "rust news",
                "tools": [{"type": "web_search"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [{"type": "message", "content": [
                    {"type": "output_text", "text": "News.", "annotations": []}
                ]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = backend(&server)
            .search("rust news", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.text, "News.");
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(&server)
            .search("q", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Auth { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .search("q", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Serialization(_)));
    }

    #[test]
    fn test_decode_rejects_bodies_without_output() {
        for body in [
            json!({}),
            json!({"foo": 1}),
            json!({"error": {"message": "server_error"}}),
        ] {
            let err = ResponsesResponse::decode(&body.to_string()).unwrap_err();
            assert!(
                matches!(err, LlmError::Serialization(_)),
                "{} decoded as {:?}",
                body,
                err
            );
        }

        let err = ResponsesResponse::decode(r#"{"output": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_error_object_with_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"message": "server_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = backend(&server)
            .search("q", &CancellationToken::new())
            .await;
        assert!(result.is_err());
    }
}
