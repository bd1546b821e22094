//! Read access to the host auth store.
//!
//! The store is a JSON object keyed by provider id (`"google"`, `"openai"`),
//! each value a record tagged by `"type"`. Entries are decoded lazily so a
//! malformed record for one provider never blocks another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use websearch_types::{AuthRecord, Provider};

use crate::discovery::xdg_config_dir;
use crate::{ConfigError, Result};

/// Auth store file name inside the config directory.
const AUTH_STORE_FILE: &str = "auth.json";

/// Path to the auth store (`<config dir>/auth.json`).
pub fn auth_store_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(AUTH_STORE_FILE))
}

/// Source of stored credentials.
pub trait AuthSource: Send + Sync {
    /// Load the record for a provider, `None` if nothing is stored.
    fn load(&self, provider: Provider) -> Result<Option<AuthRecord>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed Store
// ─────────────────────────────────────────────────────────────────────────────

/// Auth store backed by a JSON file.
#[derive(Debug, Clone, Default)]
pub struct AuthStore {
    path: Option<PathBuf>,
    entries: HashMap<String, serde_json::Value>,
}

impl AuthStore {
    /// Open the auth store at the default location.
    ///
    /// A missing file (or no resolvable config dir) yields an empty store.
    pub fn open_default() -> Result<Self> {
        match auth_store_path() {
            Some(path) => Self::open(&path),
            None => Ok(Self::default()),
        }
    }

    /// Open the auth store at a specific path.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No auth store found");
            return Ok(Self {
                path: Some(path.to_path_buf()),
                entries: HashMap::new(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        let entries = if content.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseAuthStore {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };

        tracing::debug!(path = %path.display(), "Loaded auth store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            entries,
        })
    }

    /// Path the store was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Provider ids with an entry in the store.
    pub fn providers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl AuthSource for AuthStore {
    fn load(&self, provider: Provider) -> Result<Option<AuthRecord>> {
        let Some(value) = self.entries.get(provider.id()) else {
            return Ok(None);
        };

        let record = serde_json::from_value(value.clone()).map_err(|e| {
            ConfigError::InvalidAuth {
                provider: provider.to_string(),
                kind: value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Some(record))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed in-memory credentials, for hosts that hand records over directly.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    records: HashMap<Provider, AuthRecord>,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record for a provider.
    pub fn with(mut self, provider: Provider, record: AuthRecord) -> Self {
        self.records.insert(provider, record);
        self
    }
}

impl AuthSource for StaticAuth {
    fn load(&self, provider: Provider) -> Result<Option<AuthRecord>> {
        Ok(self.records.get(&provider).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_store(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("auth.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = AuthStore::open(&dir.path().join("auth.json")).unwrap();
        assert!(store.load(Provider::Google).unwrap().is_none());
        assert!(store.providers().is_empty());
    }

    #[test]
    fn test_load_records() {
        let dir = TempDir::new().unwrap();
        let path = write_store(
            &dir,
            r#"{
                "google": {"type": "oauth", "access": "a", "refresh": "r", "expires": 42},
                "openai": {"type": "api", "key": "sk-test"}
            }"#,
        );

        let store = AuthStore::open(&path).unwrap();
        assert_eq!(store.providers(), vec!["google", "openai"]);
        assert_eq!(
            store.load(Provider::Google).unwrap(),
            Some(AuthRecord::oauth("a", "r", 42))
        );
        assert_eq!(
            store.load(Provider::OpenAi).unwrap(),
            Some(AuthRecord::api("sk-test"))
        );
    }

    #[test]
    fn test_malformed_entry_is_isolated() {
        let dir = TempDir::new().unwrap();
        let path = write_store(
            &dir,
            r#"{
                "google": {"type": "carrier-pigeon"},
                "openai": {"type": "api", "key": "sk-test"}
            }"#,
        );

        let store = AuthStore::open(&path).unwrap();
        let err = store.load(Provider::Google).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAuth { .. }));
        assert!(err.to_string().contains("carrier-pigeon"));
        assert!(store.load(Provider::OpenAi).unwrap().is_some());
    }

    #[test]
    fn test_invalid_json_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "{not json");
        let err = AuthStore::open(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseAuthStore { .. }));
    }

    #[test]
    fn test_static_auth() {
        let auth = StaticAuth::new().with(Provider::OpenAi, AuthRecord::api("k"));
        assert_eq!(
            auth.load(Provider::OpenAi).unwrap(),
            Some(AuthRecord::api("k"))
        );
        assert!(auth.load(Provider::Google).unwrap().is_none());
    }
}
