//! Error types for the search backends.

use thiserror::Error;
use websearch_oauth::OAuthError;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for provider search calls.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend/API error from the provider.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network/connectivity error.
    #[error("Network error: {0}")]
    Network(String),

    /// Provider rejected the credentials (HTTP 401/403).
    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Configuration error (unsupported credentials, missing model, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The response body did not match any known shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Token refresh or project resolution failed.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl LlmError {
    /// Returns true for 401/403 responses, which may warrant a forced refresh.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth {
                status,
                message: body,
            },
            _ => Self::Backend(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

impl From<OAuthError> for LlmError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Cancelled => LlmError::Cancelled,
            OAuthError::Auth { status, message } => LlmError::Auth { status, message },
            OAuthError::Network(msg) => LlmError::Network(msg),
            other => LlmError::OAuth(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status() {
        assert!(LlmError::from_status(401, "expired".to_string()).is_auth_failure());
        assert!(LlmError::from_status(403, "denied".to_string()).is_auth_failure());

        let err = LlmError::from_status(500, "boom".to_string());
        assert!(!err.is_auth_failure());
        assert_eq!(err.to_string(), "Backend error: HTTP 500: boom");
    }

    #[test]
    fn test_from_oauth_error() {
        assert!(matches!(
            LlmError::from(OAuthError::Cancelled),
            LlmError::Cancelled
        ));
        assert!(LlmError::from(OAuthError::Auth {
            status: 401,
            message: "x".to_string()
        })
        .is_auth_failure());

        let err = LlmError::from(OAuthError::AllFlavorsFailed("gemini-cli: nope".to_string()));
        assert!(
            err.to_string()
                .contains("All OAuth client flavors failed: gemini-cli: nope")
        );
    }
}
