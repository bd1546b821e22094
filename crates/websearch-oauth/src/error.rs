//! Error types for OAuth token management.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while refreshing tokens or resolving a project.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream rejected the access token (HTTP 401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Upstream returned a non-auth error status.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Every configured client flavor failed to refresh the token.
    #[error("All OAuth client flavors failed: {0}")]
    AllFlavorsFailed(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl OAuthError {
    /// Returns true for 401/403 responses, which warrant a forced refresh.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, OAuthError::Auth { .. })
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(e: serde_json::Error) -> Self {
        OAuthError::Serialization(e.to_string())
    }
}
