//! OAuth token lifecycle for Code Assist requests.
//!
//! Per refresh token, the access token moves through
//! no-token → cached-valid → near-expiry → refreshing → cached-valid, while
//! the Code Assist project is resolved once and cached alongside it.
//!
//! Every logical request carries an [`OAuthSession`]. Whichever step hits a
//! 401/403 first may force a single refresh; once a session has refreshed,
//! further auth failures are surfaced instead of retried.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use websearch_config::{EnvSource, OAuthCredentials, WebSearchConfig};

use crate::cache::{CachedToken, TokenCache};
use crate::error::{OAuthError, Result};
use crate::oauth::{ClientFlavor, RefreshPayload, now_ms, refresh_access_token};
use crate::project::load_code_assist_project;

/// Default buffer before expiry at which a token is refreshed (60 seconds).
pub const DEFAULT_REFRESH_BUFFER_MS: i64 = 60 * 1000;

// ============================================================================
// Session
// ============================================================================

/// Per-request OAuth state.
#[derive(Debug)]
pub struct OAuthSession {
    payload: RefreshPayload,
    seed: CachedToken,
    current: Option<String>,
    refreshed: bool,
}

impl OAuthSession {
    /// Start a session from stored OAuth credentials.
    pub fn new(credentials: &OAuthCredentials) -> Self {
        Self {
            payload: RefreshPayload::parse(&credentials.refresh),
            seed: CachedToken {
                access_token: credentials.access.clone(),
                expires_at_ms: credentials.expires_at_ms,
            },
            current: None,
            refreshed: false,
        }
    }

    /// Bare refresh token, the cache key for this session.
    pub fn refresh_token(&self) -> &str {
        &self.payload.refresh_token
    }

    /// Project id carried in the stored refresh payload.
    pub fn payload_project(&self) -> Option<&str> {
        self.payload.project()
    }

    /// Whether a refresh has already happened during this request.
    pub fn refreshed(&self) -> bool {
        self.refreshed
    }
}

// ============================================================================
// TokenManager Trait
// ============================================================================

/// Supplies access tokens and Code Assist projects for OAuth requests.
#[async_trait]
pub trait TokenManager: Send + Sync + std::fmt::Debug {
    /// Get a valid access token, refreshing if absent or near expiry.
    async fn access_token(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Evict the cached token and refresh once.
    ///
    /// Fails without a network call if the session has already refreshed.
    async fn force_refresh(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Resolve the Code Assist project for this session.
    async fn project_id(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Forget the cached project so the next request rediscovers it.
    fn invalidate_project(&self, session: &OAuthSession);
}

/// Shared token manager for use across async contexts.
pub type SharedTokenManager = Arc<dyn TokenManager>;

// ============================================================================
// OAuthTokenManager
// ============================================================================

/// Endpoints, flavors and buffer used by [`OAuthTokenManager`].
#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    pub token_url: String,
    pub code_assist_url: String,
    /// Client flavors in preference order.
    pub flavors: Vec<ClientFlavor>,
    pub refresh_buffer_ms: i64,
}

impl TokenManagerConfig {
    /// Build from the loaded configuration, resolving flavor credentials.
    pub fn from_config(config: &WebSearchConfig, env: &dyn EnvSource) -> Self {
        let endpoints = config.endpoints();
        let oauth = config.oauth();
        Self {
            token_url: endpoints.token,
            code_assist_url: endpoints.code_assist,
            flavors: oauth
                .resolve_flavors(env)
                .into_iter()
                .map(ClientFlavor::from)
                .collect(),
            refresh_buffer_ms: i64::try_from(oauth.refresh_buffer_secs)
                .unwrap_or(i64::MAX / 1000)
                .saturating_mul(1000),
        }
    }
}

/// Token manager backed by a shared [`TokenCache`].
#[derive(Debug, Clone)]
pub struct OAuthTokenManager {
    http: reqwest::Client,
    cache: Arc<TokenCache>,
    config: TokenManagerConfig,
}

impl OAuthTokenManager {
    pub fn new(http: reqwest::Client, cache: Arc<TokenCache>, config: TokenManagerConfig) -> Self {
        Self {
            http,
            cache,
            config,
        }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<TokenCache> {
        &self.cache
    }

    /// Flavors to try for `refresh`: last winner first, then preference order.
    fn ordered_flavors(&self, refresh: &str) -> Vec<&ClientFlavor> {
        let preferred = self.cache.flavor(refresh);
        let mut ordered: Vec<&ClientFlavor> = Vec::with_capacity(self.config.flavors.len());

        if let Some(name) = preferred.as_deref()
            && let Some(flavor) = self.config.flavors.iter().find(|f| f.name == name)
        {
            ordered.push(flavor);
        }
        ordered.extend(
            self.config
                .flavors
                .iter()
                .filter(|f| preferred.as_deref() != Some(f.name.as_str())),
        );
        ordered
    }

    /// Refresh through each flavor until one succeeds.
    async fn refresh(&self, session: &mut OAuthSession, cancel: &CancellationToken) -> Result<String> {
        let refresh = session.payload.refresh_token.clone();
        if refresh.is_empty() {
            return Err(OAuthError::Config("refresh token is empty".to_string()));
        }

        let flavors = self.ordered_flavors(&refresh);
        if flavors.is_empty() {
            return Err(OAuthError::AllFlavorsFailed(
                "no client flavors configured".to_string(),
            ));
        }

        session.refreshed = true;
        let mut failures = Vec::new();

        for flavor in flavors {
            tracing::debug!(flavor = %flavor.name, "Refreshing OAuth access token");
            match refresh_access_token(&self.http, &self.config.token_url, flavor, &refresh, cancel)
                .await
            {
                Ok(token) => {
                    self.cache.store_flavor(&refresh, flavor.name.clone());
                    self.cache.store_token(
                        &refresh,
                        CachedToken {
                            access_token: token.access_token.clone(),
                            expires_at_ms: token.expires_at_ms,
                        },
                    );
                    tracing::info!(flavor = %flavor.name, "OAuth access token refreshed");
                    session.current = Some(token.access_token.clone());
                    return Ok(token.access_token);
                }
                Err(OAuthError::Cancelled) => return Err(OAuthError::Cancelled),
                Err(e) => {
                    tracing::warn!(flavor = %flavor.name, error = %e, "OAuth flavor failed");
                    failures.push(format!("{}: {}", flavor.name, e));
                }
            }
        }

        Err(OAuthError::AllFlavorsFailed(failures.join("; ")))
    }
}

#[async_trait]
impl TokenManager for OAuthTokenManager {
    async fn access_token(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if let Some(current) = &session.current {
            return Ok(current.clone());
        }

        let now = now_ms();
        let buffer = self.config.refresh_buffer_ms;
        let refresh = session.payload.refresh_token.clone();

        if let Some(token) = self.cache.valid_token(&refresh, now, buffer) {
            tracing::debug!("Using cached OAuth access token");
            session.current = Some(token.clone());
            return Ok(token);
        }

        if !session.seed.access_token.is_empty() && session.seed.is_fresh(now, buffer) {
            tracing::debug!("Using stored OAuth access token");
            self.cache.store_token(&refresh, session.seed.clone());
            session.current = Some(session.seed.access_token.clone());
            return Ok(session.seed.access_token.clone());
        }

        tracing::debug!("OAuth access token missing or near expiry");
        self.refresh(session, cancel).await
    }

    async fn force_refresh(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if session.refreshed {
            return Err(OAuthError::Config(
                "access token was already refreshed for this request".to_string(),
            ));
        }

        tracing::warn!("Upstream rejected access token, forcing refresh");
        self.cache.evict_token(&session.payload.refresh_token);
        session.current = None;
        self.refresh(session, cancel).await
    }

    async fn project_id(
        &self,
        session: &mut OAuthSession,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if let Some(project) = session.payload.project() {
            return Ok(project.to_string());
        }
        if let Some(project) = self.cache.project(&session.payload.refresh_token) {
            tracing::debug!(project = %project, "Using cached Code Assist project");
            return Ok(project);
        }

        let token = self.access_token(session, cancel).await?;
        let project = match load_code_assist_project(
            &self.http,
            &self.config.code_assist_url,
            &token,
            cancel,
        )
        .await
        {
            Err(e) if e.is_auth_failure() && !session.refreshed => {
                let token = self.force_refresh(session, cancel).await?;
                load_code_assist_project(&self.http, &self.config.code_assist_url, &token, cancel)
                    .await?
            }
            other => other?,
        };

        tracing::info!(project = %project, "Resolved Code Assist project");
        self.cache
            .store_project(&session.payload.refresh_token, project.clone());
        Ok(project)
    }

    fn invalidate_project(&self, session: &OAuthSession) {
        tracing::debug!("Evicting cached Code Assist project");
        self.cache.evict_project(&session.payload.refresh_token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOUR_MS: i64 = 3600 * 1000;

    fn config(server: &MockServer, flavors: Vec<ClientFlavor>) -> TokenManagerConfig {
        TokenManagerConfig {
            token_url: format!("{}/token", server.uri()),
            code_assist_url: server.uri(),
            flavors,
            refresh_buffer_ms: DEFAULT_REFRESH_BUFFER_MS,
        }
    }

    fn manager(server: &MockServer, flavors: Vec<ClientFlavor>) -> OAuthTokenManager {
        OAuthTokenManager::new(
            reqwest::Client::new(),
            Arc::new(TokenCache::new()),
            config(server, flavors),
        )
    }

    fn default_flavors() -> Vec<ClientFlavor> {
        vec![
            ClientFlavor::new("gemini-cli", "cli-id", "cli-secret"),
            ClientFlavor::new("antigravity", "ag-id", "ag-secret"),
        ]
    }

    fn credentials(refresh: &str, expires_at_ms: i64) -> OAuthCredentials {
        OAuthCredentials {
            access: "stored-access".to_string(),
            refresh: refresh.to_string(),
            expires_at_ms,
        }
    }

    fn token_ok(access: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access,
            "expires_in": 3600
        }))
    }

    #[tokio::test]
    async fn test_fresh_stored_token_makes_no_refresh_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("unused"))
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let creds = credentials("refresh", now_ms() + HOUR_MS);
        let cancel = CancellationToken::new();

        let mut session = OAuthSession::new(&creds);
        assert_eq!(
            manager.access_token(&mut session, &cancel).await.unwrap(),
            "stored-access"
        );
        assert!(!session.refreshed());

        // A second request is served from the cache.
        let mut session = OAuthSession::new(&creds);
        assert_eq!(
            manager.access_token(&mut session, &cancel).await.unwrap(),
            "stored-access"
        );
    }

    #[tokio::test]
    async fn test_token_within_buffer_refreshes_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("fresh-access"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let creds = credentials("refresh", now_ms() + 10_000);
        let cancel = CancellationToken::new();

        let mut session = OAuthSession::new(&creds);
        assert_eq!(
            manager.access_token(&mut session, &cancel).await.unwrap(),
            "fresh-access"
        );
        assert!(session.refreshed());

        // The refreshed token is now cached for later requests.
        let mut session = OAuthSession::new(&creds);
        assert_eq!(
            manager.access_token(&mut session, &cancel).await.unwrap(),
            "fresh-access"
        );
        assert!(!session.refreshed());
    }

    #[tokio::test]
    async fn test_flavor_fallback_and_memory() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_id=cli-id"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized_client"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_id=ag-id"))
            .respond_with(token_ok("ag-access"))
            .expect(2)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let cancel = CancellationToken::new();
        let creds = credentials("refresh", 0);

        let mut session = OAuthSession::new(&creds);
        assert_eq!(
            manager.access_token(&mut session, &cancel).await.unwrap(),
            "ag-access"
        );
        assert_eq!(manager.cache().flavor("refresh").as_deref(), Some("antigravity"));

        // The winning flavor is tried first next time.
        let mut session = OAuthSession::new(&creds);
        manager.force_refresh(&mut session, &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_all_flavors_failed_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let flavors = vec![
            ClientFlavor::new("gemini-cli", "cli-id", "cli-secret"),
            ClientFlavor {
                name: "antigravity".to_string(),
                client_id: None,
                client_secret: None,
            },
        ];
        let manager = manager(&server, flavors);
        let mut session = OAuthSession::new(&credentials("refresh", 0));

        let err = manager
            .access_token(&mut session, &CancellationToken::new())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("All OAuth client flavors failed: gemini-cli: "));
        assert!(message.contains("invalid_grant"));
        assert!(message.contains("; antigravity: "));
    }

    #[tokio::test]
    async fn test_force_refresh_only_once_per_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let cancel = CancellationToken::new();
        let mut session = OAuthSession::new(&credentials("refresh", now_ms() + HOUR_MS));

        manager.access_token(&mut session, &cancel).await.unwrap();
        assert_eq!(
            manager.force_refresh(&mut session, &cancel).await.unwrap(),
            "fresh"
        );
        assert!(manager.force_refresh(&mut session, &cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_project_from_payload_skips_discovery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let mut session = OAuthSession::new(&credentials("refresh|proj|managed", 0));
        let project = manager
            .project_id(&mut session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(project, "managed");
    }

    #[tokio::test]
    async fn test_project_discovered_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1internal:loadCodeAssist"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"cloudaicompanionProject": "proj-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let creds = credentials("refresh", now_ms() + HOUR_MS);
        let cancel = CancellationToken::new();

        for _ in 0..2 {
            let mut session = OAuthSession::new(&creds);
            assert_eq!(
                manager.project_id(&mut session, &cancel).await.unwrap(),
                "proj-1"
            );
        }

        let session = OAuthSession::new(&creds);
        manager.invalidate_project(&session);
        assert!(manager.cache().project("refresh").is_none());
    }

    #[tokio::test]
    async fn test_project_discovery_retries_once_after_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1internal:loadCodeAssist"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1internal:loadCodeAssist"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"cloudaicompanionProject": {"id": "proj-2"}})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let mut session = OAuthSession::new(&credentials("refresh", now_ms() + HOUR_MS));
        let project = manager
            .project_id(&mut session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(project, "proj-2");
        assert!(session.refreshed());
    }

    #[tokio::test]
    async fn test_project_discovery_gives_up_after_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1internal:loadCodeAssist"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("fresh"))
            .expect(1)
            .mount(&server)
            .await;

        // Token is refreshed up front, so the 403 is not retried.
        let manager = manager(&server, default_flavors());
        let mut session = OAuthSession::new(&credentials("refresh", 0));
        let err = manager
            .project_id(&mut session, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_project_discovery_non_auth_failure_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1internal:loadCodeAssist"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(token_ok("fresh"))
            .expect(0)
            .mount(&server)
            .await;

        let manager = manager(&server, default_flavors());
        let mut session = OAuthSession::new(&credentials("refresh", now_ms() + HOUR_MS));
        let err = manager
            .project_id(&mut session, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::Backend(_)));
    }

    #[test]
    fn test_config_from_websearch_config() {
        let toml = r#"
[oauth]
refresh_buffer_secs = 30
flavors = ["antigravity"]

[oauth.flavor.antigravity]
client_id = "id"
client_secret = "secret"

[endpoints]
token = "http://localhost:1/token"
"#;
        let config = WebSearchConfig::from_toml(toml).unwrap();
        let env = std::collections::HashMap::<String, String>::new();
        let resolved = TokenManagerConfig::from_config(&config, &env);

        assert_eq!(resolved.refresh_buffer_ms, 30_000);
        assert_eq!(resolved.token_url, "http://localhost:1/token");
        assert_eq!(resolved.flavors.len(), 1);
        assert_eq!(resolved.flavors[0].name, "antigravity");
        assert_eq!(resolved.flavors[0].client_id.as_deref(), Some("id"));
    }
}
