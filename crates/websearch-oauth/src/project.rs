//! Code Assist project discovery via `loadCodeAssist`.

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{OAuthError, Result};
use crate::oauth::with_cancel;

/// Client identification headers expected by the Code Assist API.
pub const CODE_ASSIST_USER_AGENT: &str = "google-api-nodejs-client/9.15.1";
pub const CODE_ASSIST_API_CLIENT: &str = "gl-node/22.17.0";
pub const CODE_ASSIST_CLIENT_METADATA: &str =
    "ideType=IDE_UNSPECIFIED,platform=PLATFORM_UNSPECIFIED,pluginType=GEMINI";

/// Attach the Code Assist bearer token and client identification headers.
pub fn code_assist_headers(
    builder: reqwest::RequestBuilder,
    access_token: &str,
) -> reqwest::RequestBuilder {
    builder
        .bearer_auth(access_token)
        .header("User-Agent", CODE_ASSIST_USER_AGENT)
        .header("X-Goog-Api-Client", CODE_ASSIST_API_CLIENT)
        .header("Client-Metadata", CODE_ASSIST_CLIENT_METADATA)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadCodeAssistResponse {
    #[serde(default)]
    cloudaicompanion_project: Option<CompanionProject>,
}

/// The project is returned either as a bare id or as `{ "id": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompanionProject {
    Id(String),
    Object { id: Option<String> },
}

impl CompanionProject {
    fn into_id(self) -> Option<String> {
        let id = match self {
            CompanionProject::Id(id) => Some(id),
            CompanionProject::Object { id } => id,
        };
        id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }
}

/// Discover the user's Code Assist project.
///
/// 401/403 surface as [`OAuthError::Auth`] so the caller can force a refresh.
pub async fn load_code_assist_project(
    client: &reqwest::Client,
    code_assist_url: &str,
    access_token: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let url = format!(
        "{}/v1internal:loadCodeAssist",
        code_assist_url.trim_end_matches('/')
    );
    let body = json!({
        "metadata": {
            "ideType": "IDE_UNSPECIFIED",
            "platform": "PLATFORM_UNSPECIFIED",
            "pluginType": "GEMINI"
        }
    });

    tracing::debug!(url = %url, "Discovering Code Assist project");

    let response = with_cancel(cancel, async {
        code_assist_headers(client.post(&url), access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("loadCodeAssist request failed: {}", e)))
    })
    .await?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(OAuthError::Auth {
                status: status.as_u16(),
                message,
            });
        }
        return Err(OAuthError::Backend(format!(
            "loadCodeAssist failed ({}): {}",
            status.as_u16(),
            message
        )));
    }

    let parsed: LoadCodeAssistResponse = with_cancel(cancel, async {
        response.json().await.map_err(|e| {
            OAuthError::Serialization(format!("Failed to parse loadCodeAssist response: {}", e))
        })
    })
    .await?;

    parsed
        .cloudaicompanion_project
        .and_then(CompanionProject::into_id)
        .ok_or_else(|| {
            OAuthError::Backend("loadCodeAssist response did not include a project".to_string())
        })
}
