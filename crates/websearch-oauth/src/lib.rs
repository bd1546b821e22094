//! OAuth token lifecycle for Google Code Assist web search.
//!
//! Keeps access tokens fresh for stored OAuth credentials and resolves the
//! Code Assist project those tokens belong to.
//!
//! # Components
//!
//! - [`oauth`]: refresh-token grant per client flavor, refresh payload parsing
//! - [`cache`]: shared token/project/flavor cache keyed by refresh token
//! - [`project`]: `loadCodeAssist` project discovery and client headers
//! - [`token_manager`]: per-request sessions with refresh-once on auth failure

pub mod cache;
pub mod error;
pub mod oauth;
pub mod project;
pub mod token_manager;

pub use cache::{CachedToken, TokenCache};
pub use error::{OAuthError, Result};
pub use oauth::{ClientFlavor, RefreshPayload, RefreshedToken, now_ms, with_cancel};
pub use project::{code_assist_headers, load_code_assist_project};
pub use token_manager::{
    DEFAULT_REFRESH_BUFFER_MS, OAuthSession, OAuthTokenManager, SharedTokenManager,
    TokenManager, TokenManagerConfig,
};
