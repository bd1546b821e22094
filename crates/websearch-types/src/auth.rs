//! Credential records handed over by the host auth store.

use serde::{Deserialize, Serialize};

/// Credentials stored for one provider.
///
/// The host persists these as JSON objects tagged by `"type"`. Fields are
/// defaulted so that a structurally incomplete record still deserializes and
/// can be rejected with a precise message by the credential resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthRecord {
    /// A static API key.
    Api {
        #[serde(default)]
        key: String,
    },
    /// OAuth tokens with a refresh token and an epoch-millisecond expiry.
    #[serde(rename = "oauth")]
    OAuth {
        #[serde(default)]
        access: String,
        #[serde(default)]
        refresh: String,
        #[serde(default)]
        expires: Option<i64>,
    },
    /// A static key plus bearer token pair, sent as-is with no refresh.
    #[serde(rename = "wellknown")]
    WellKnown {
        #[serde(default)]
        key: String,
        #[serde(default)]
        token: String,
    },
}

impl AuthRecord {
    /// Create an API key record.
    pub fn api(key: impl Into<String>) -> Self {
        Self::Api { key: key.into() }
    }

    /// Create an OAuth record.
    pub fn oauth(access: impl Into<String>, refresh: impl Into<String>, expires: i64) -> Self {
        Self::OAuth {
            access: access.into(),
            refresh: refresh.into(),
            expires: Some(expires),
        }
    }

    /// The record's type tag as written in the auth store.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthRecord::Api { .. } => "api",
            AuthRecord::OAuth { .. } => "oauth",
            AuthRecord::WellKnown { .. } => "wellknown",
        }
    }
}
