//! Credential resolution: turns a host auth record into usable credentials.
//!
//! Resolution order for API keys:
//! 1. Auth store record (trimmed; blank counts as absent)
//! 2. Provider-specific environment variables
//!
//! OAuth and well-known records are validated but never fall back to the
//! environment.

use std::collections::HashMap;

use websearch_types::{AuthRecord, Provider};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Environment Access
// ─────────────────────────────────────────────────────────────────────────────

/// Read access to environment variables.
///
/// Abstracted so resolution can be tested without mutating the process
/// environment.
pub trait EnvSource: Send + Sync {
    /// Look up a variable; `None` if unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Environment variables consulted for a provider's API key, in order.
pub fn api_key_env_vars(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        Provider::OpenAi => &["OPENAI_API_KEY"],
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Where an API key was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// The host auth store.
    AuthStore,
    /// Environment variable.
    EnvVar(String),
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::AuthStore => write!(f, "auth store"),
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
        }
    }
}

/// Validated OAuth tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub access: String,
    pub refresh: String,
    /// Access token expiry in epoch milliseconds.
    pub expires_at_ms: i64,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

/// Credentials ready to authenticate a request.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A static API key.
    ApiKey { key: String, source: SecretSource },
    /// OAuth tokens managed by the token manager.
    OAuth(OAuthCredentials),
    /// A static key plus bearer token, sent directly as headers.
    WellKnown { key: String, token: String },
}

impl Credentials {
    /// Short name of the auth mode, for logs and status output.
    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::ApiKey { .. } => "api",
            Credentials::OAuth(_) => "oauth",
            Credentials::WellKnown { .. } => "wellknown",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::ApiKey { source, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<redacted>")
                .field("source", source)
                .finish(),
            Credentials::OAuth(oauth) => f.debug_tuple("OAuth").field(oauth).finish(),
            Credentials::WellKnown { .. } => f
                .debug_struct("WellKnown")
                .field("key", &"<redacted>")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve usable credentials for a provider.
///
/// `record` is whatever the host auth store holds for the provider (if
/// anything). Only Google supports OAuth and well-known records.
pub fn resolve_credentials(
    provider: Provider,
    record: Option<&AuthRecord>,
    env: &dyn EnvSource,
) -> Result<Credentials> {
    match record {
        Some(AuthRecord::Api { key }) => {
            let key = key.trim();
            if !key.is_empty() {
                return Ok(Credentials::ApiKey {
                    key: key.to_string(),
                    source: SecretSource::AuthStore,
                });
            }
            tracing::debug!(provider = %provider, "Auth store API key is blank, trying environment");
            resolve_from_env(provider, env)
        }
        Some(AuthRecord::OAuth {
            access,
            refresh,
            expires,
        }) => {
            if provider != Provider::Google {
                return Err(unsupported(provider, "oauth"));
            }
            let access = access.trim();
            let refresh = refresh.trim();
            if access.is_empty() {
                return Err(invalid(provider, "oauth", "missing access token"));
            }
            if refresh.is_empty() {
                return Err(invalid(provider, "oauth", "missing refresh token"));
            }
            let expires_at_ms =
                expires.ok_or_else(|| invalid(provider, "oauth", "missing numeric expiry"))?;

            Ok(Credentials::OAuth(OAuthCredentials {
                access: access.to_string(),
                refresh: refresh.to_string(),
                expires_at_ms,
            }))
        }
        Some(AuthRecord::WellKnown { key, token }) => {
            if provider != Provider::Google {
                return Err(unsupported(provider, "wellknown"));
            }
            let key = key.trim();
            let token = token.trim();
            if key.is_empty() || token.is_empty() {
                return Err(invalid(
                    provider,
                    "wellknown",
                    "both a key and a token are required",
                ));
            }
            Ok(Credentials::WellKnown {
                key: key.to_string(),
                token: token.to_string(),
            })
        }
        None => resolve_from_env(provider, env),
    }
}

fn resolve_from_env(provider: Provider, env: &dyn EnvSource) -> Result<Credentials> {
    let vars = api_key_env_vars(provider);
    for var in vars {
        if let Some(value) = env.var(var) {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Credentials::ApiKey {
                    key: value.to_string(),
                    source: SecretSource::EnvVar(var.to_string()),
                });
            }
        }
    }

    Err(ConfigError::CredentialsNotFound {
        provider: provider.to_string(),
        env_vars: vars.join(" or "),
    })
}

fn invalid(provider: Provider, kind: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidAuth {
        provider: provider.to_string(),
        kind: kind.to_string(),
        reason: reason.to_string(),
    }
}

fn unsupported(provider: Provider, kind: &str) -> ConfigError {
    ConfigError::UnsupportedAuth {
        provider: provider.to_string(),
        kind: kind.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
