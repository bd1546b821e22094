//! Search backend trait and shared request plumbing.
//!
//! Each provider implements [`SearchBackend`], turning a query into a
//! [`GroundedAnswer`] that the formatter renders.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use websearch_oauth::with_cancel;
use websearch_types::Provider;

use crate::error::{LlmError, Result};
use crate::format::GroundedAnswer;

/// A provider capable of answering a query with web-search grounding.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a grounded search for `query`.
    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<GroundedAnswer>;

    /// The provider this backend talks to.
    fn provider(&self) -> Provider;

    /// Name of this backend, for logs.
    fn name(&self) -> &str;
}

/// Shared search backend for use across async contexts.
pub type SharedSearchBackend = Arc<dyn SearchBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Request Plumbing
// ─────────────────────────────────────────────────────────────────────────────

/// Send a request and return the body of a successful response.
///
/// Non-success statuses become [`LlmError::Auth`] (401/403) or
/// [`LlmError::Backend`]; the body is kept in the message for diagnosis.
pub async fn send_for_text(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<String> {
    with_cancel(cancel, async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), body));
        }
        Ok::<_, LlmError>(body)
    })
    .await
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing purposes.
///
/// Answers are returned in order; once exhausted, every call fails.
pub struct MockSearchBackend {
    provider: Provider,
    answers: parking_lot::Mutex<Vec<Result<GroundedAnswer>>>,
    queries: parking_lot::Mutex<Vec<String>>,
}

impl MockSearchBackend {
    pub fn new(provider: Provider, answers: Vec<Result<GroundedAnswer>>) -> Self {
        Self {
            provider,
            answers: parking_lot::Mutex::new(answers),
            queries: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// A mock that answers once with plain text.
    pub fn with_text(provider: Provider, text: impl Into<String>) -> Self {
        Self::new(
            provider,
            vec![Ok(GroundedAnswer {
                text: text.into(),
                ..Default::default()
            })],
        )
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<GroundedAnswer> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        self.queries.lock().push(query.to_string());

        let mut answers = self.answers.lock();
        if answers.is_empty() {
            return Err(LlmError::Backend(
                "MockSearchBackend: no more answers available".to_string(),
            ));
        }
        answers.remove(0)
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn name(&self) -> &str {
        "mock"
    }
}
