//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and credential resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Failed to parse the auth store.
    #[error("failed to parse auth store '{path}': {reason}")]
    ParseAuthStore { path: String, reason: String },

    /// No credentials were found through any resolution method.
    #[error("no credentials found for {provider}. Add them to the auth store or set {env_vars}")]
    CredentialsNotFound { provider: String, env_vars: String },

    /// A credential record is structurally present but unusable.
    #[error("invalid {kind} credentials for {provider}: {reason}")]
    InvalidAuth {
        provider: String,
        kind: String,
        reason: String,
    },

    /// The credential type is not supported by the provider.
    #[error("{kind} credentials are not supported for {provider}")]
    UnsupportedAuth { provider: String, kind: String },
}
