//! Cloud Code Assist backend for OAuth credentials.
//!
//! Tokens and the project come from a [`TokenManager`]. A 401/403 from
//! `generateContent` forces one refresh and one retry, unless this request
//! already refreshed; a rejection after that also drops the cached project.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use websearch_config::OAuthCredentials;
use websearch_oauth::{OAuthSession, SharedTokenManager, code_assist_headers};
use websearch_types::Provider;

use crate::backend::{SearchBackend, send_for_text};
use crate::error::Result;
use crate::format::GroundedAnswer;
use crate::types::{CodeAssistRequest, GenerateContentRequest, ResponseEnvelope};

/// Code Assist `generateContent` with Google Search grounding.
pub struct CodeAssistBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    credentials: OAuthCredentials,
    tokens: SharedTokenManager,
}

impl CodeAssistBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        credentials: OAuthCredentials,
        tokens: SharedTokenManager,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            credentials,
            tokens,
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1internal:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn generate(
        &self,
        access_token: &str,
        project: &str,
        request: &GenerateContentRequest,
        cancel: &CancellationToken,
    ) -> Result<GroundedAnswer> {
        let body = CodeAssistRequest {
            project,
            model: &self.model,
            request,
        };
        let builder = code_assist_headers(self.client.post(self.generate_url()), access_token)
            .json(&body);
        let text = send_for_text(builder, cancel).await?;
        let response = ResponseEnvelope::decode(&text)?;
        Ok(GroundedAnswer::from_gemini(&response))
    }
}

#[async_trait]
impl SearchBackend for CodeAssistBackend {
    async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<GroundedAnswer> {
        let mut session = OAuthSession::new(&self.credentials);
        let request = GenerateContentRequest::grounded_search(query);

        let access_token = self.tokens.access_token(&mut session, cancel).await?;
        let project = self.tokens.project_id(&mut session, cancel).await?;
        // Project discovery may have refreshed the token.
        let access_token = if session.refreshed() {
            self.tokens.access_token(&mut session, cancel).await?
        } else {
            access_token
        };

        tracing::debug!(
            backend = "code_assist",
            model = %self.model,
            project = %project,
            "Sending grounded generateContent request"
        );

        match self.generate(&access_token, &project, &request, cancel).await {
            Err(e) if e.is_auth_failure() && !session.refreshed() => {
                let access_token = self.tokens.force_refresh(&mut session, cancel).await?;
                let retried = self.generate(&access_token, &project, &request, cancel).await;
                if let Err(e) = &retried
                    && e.is_auth_failure()
                {
                    self.tokens.invalidate_project(&session);
                }
                retried
            }
            Err(e) if e.is_auth_failure() => {
                self.tokens.invalidate_project(&session);
                Err(e)
            }
            other => other,
        }
    }

    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn name(&self) -> &str {
        "code_assist"
    }
}
