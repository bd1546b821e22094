//! Refresh-token grant against the Google OAuth token endpoint.

use std::future::Future;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use websearch_config::ResolvedFlavor;

use crate::error::{OAuthError, Result};

/// One set of OAuth client credentials usable to refresh a token.
#[derive(Clone)]
pub struct ClientFlavor {
    pub name: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ClientFlavor {
    pub fn new(
        name: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
        }
    }
}

impl From<ResolvedFlavor> for ClientFlavor {
    fn from(flavor: ResolvedFlavor) -> Self {
        Self {
            name: flavor.name,
            client_id: flavor.client_id,
            client_secret: flavor.client_secret,
        }
    }
}

impl std::fmt::Debug for ClientFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFlavor")
            .field("name", &self.name)
            .field("has_client_id", &self.client_id.is_some())
            .field("has_client_secret", &self.client_secret.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh Payload
// ─────────────────────────────────────────────────────────────────────────────

/// A stored refresh string, `refreshToken|projectId|managedProjectId`.
///
/// Only the first segment is required. Blank segments are treated as absent.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshPayload {
    pub refresh_token: String,
    pub project_id: Option<String>,
    pub managed_project_id: Option<String>,
}

impl RefreshPayload {
    /// Split a stored refresh string into its parts.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split('|').map(str::trim);
        let refresh_token = parts.next().unwrap_or_default().to_string();
        let mut segment = || {
            parts
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let project_id = segment();
        let managed_project_id = segment();

        Self {
            refresh_token,
            project_id,
            managed_project_id,
        }
    }

    /// Project id carried in the payload; the managed project wins.
    pub fn project(&self) -> Option<&str> {
        self.managed_project_id
            .as_deref()
            .or(self.project_id.as_deref())
    }
}

impl std::fmt::Debug for RefreshPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshPayload")
            .field("refresh_token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("managed_project_id", &self.managed_project_id)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token Refresh
// ─────────────────────────────────────────────────────────────────────────────

/// A freshly minted access token.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Expiry in epoch milliseconds.
    pub expires_at_ms: i64,
}

impl std::fmt::Debug for RefreshedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Fallback lifetime when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Exchange a refresh token for a new access token using one client flavor.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    flavor: &ClientFlavor,
    refresh_token: &str,
    cancel: &CancellationToken,
) -> Result<RefreshedToken> {
    let (Some(client_id), Some(client_secret)) = (&flavor.client_id, &flavor.client_secret) else {
        return Err(OAuthError::Config(
            "missing client credentials".to_string(),
        ));
    };

    let form = [
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let response = with_cancel(cancel, async {
        client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Token refresh request failed: {}", e)))
    })
    .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(OAuthError::Backend(format!(
            "Token refresh failed ({}): {}",
            status.as_u16(),
            error_text
        )));
    }

    let tokens: TokenResponse = with_cancel(cancel, async {
        response
            .json()
            .await
            .map_err(|e| OAuthError::Serialization(format!("Failed to parse refresh response: {}", e)))
    })
    .await?;

    if tokens.access_token.trim().is_empty() {
        return Err(OAuthError::Backend(
            "Token refresh returned an empty access token".to_string(),
        ));
    }

    let expires_in = tokens.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Ok(RefreshedToken {
        access_token: tokens.access_token,
        expires_at_ms: now_ms() + expires_in * 1000,
    })
}

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Run a future unless the caller cancels first.
///
/// An already-cancelled token short-circuits without polling the future.
/// Cancellation surfaces as [`OAuthError::Cancelled`] converted into the
/// caller's error type.
pub async fn with_cancel<T, E, F>(cancel: &CancellationToken, fut: F) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: From<OAuthError>,
{
    if cancel.is_cancelled() {
        return Err(OAuthError::Cancelled.into());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OAuthError::Cancelled.into()),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_bare_refresh_token() {
        let payload = RefreshPayload::parse("1//abc");
        assert_eq!(payload.refresh_token, "1//abc");
        assert!(payload.project_id.is_none());
        assert!(payload.project().is_none());
    }

    #[test]
    fn test_parse_full_payload() {
        let payload = RefreshPayload::parse("tok|proj-a|managed-b");
        assert_eq!(payload.refresh_token, "tok");
        assert_eq!(payload.project_id.as_deref(), Some("proj-a"));
        assert_eq!(payload.project(), Some("managed-b"));
    }

    #[test]
    fn test_parse_blank_segments() {
        let payload = RefreshPayload::parse("tok||");
        assert!(payload.project_id.is_none());
        assert!(payload.managed_project_id.is_none());

        let payload = RefreshPayload::parse("tok|proj-a|");
        assert_eq!(payload.project(), Some("proj-a"));
    }

    #[test]
    fn test_payload_debug_redacts_token() {
        let debug = format!("{:?}", RefreshPayload::parse("secret-refresh|p"));
        assert!(!debug.contains("secret-refresh"));
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=id-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let before = now_ms();
        let token = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{}/token", server.uri()),
            &ClientFlavor::new("gemini-cli", "id-1", "secret-1"),
            "refresh",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(token.access_token, "fresh");
        assert!(token.expires_at_ms >= before + 3599 * 1000);
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{}/token", server.uri()),
            &ClientFlavor::new("gemini-cli", "id", "secret"),
            "refresh",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OAuthError::Backend(_)));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_refresh_without_client_credentials() {
        let flavor = ClientFlavor {
            name: "antigravity".to_string(),
            client_id: None,
            client_secret: None,
        };
        let err = refresh_access_token(
            &reqwest::Client::new(),
            "http://127.0.0.1:9/token",
            &flavor,
            "refresh",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OAuthError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = refresh_access_token(
            &reqwest::Client::new(),
            &format!("{}/token", server.uri()),
            &ClientFlavor::new("gemini-cli", "id", "secret"),
            "refresh",
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OAuthError::Cancelled));
    }
}
