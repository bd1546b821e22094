//! Shared in-process cache of access tokens, projects and winning flavors.
//!
//! All three maps are keyed by the bare refresh token. Locks are held only for
//! the duration of a map operation and never across an `.await`; concurrent
//! requests for the same key may both refresh, and the later write wins.

use std::collections::HashMap;

use parking_lot::Mutex;

/// A cached access token.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    /// Expiry in epoch milliseconds.
    pub expires_at_ms: i64,
}

impl CachedToken {
    /// Whether the token is still usable `buffer_ms` from `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, buffer_ms: i64) -> bool {
        self.expires_at_ms - buffer_ms > now_ms
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

/// Token, project and flavor caches shared by every OAuth-backed request.
#[derive(Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<String, CachedToken>>,
    projects: Mutex<HashMap<String, String>>,
    flavors: Mutex<HashMap<String, String>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached access token for `refresh`, if it outlives the buffer.
    ///
    /// Stale entries are evicted on lookup.
    pub fn valid_token(&self, refresh: &str, now_ms: i64, buffer_ms: i64) -> Option<String> {
        let mut tokens = self.tokens.lock();
        match tokens.get(refresh) {
            Some(entry) if entry.is_fresh(now_ms, buffer_ms) => Some(entry.access_token.clone()),
            Some(_) => {
                tokens.remove(refresh);
                None
            }
            None => None,
        }
    }

    pub fn store_token(&self, refresh: &str, token: CachedToken) {
        self.tokens.lock().insert(refresh.to_string(), token);
    }

    pub fn evict_token(&self, refresh: &str) {
        self.tokens.lock().remove(refresh);
    }

    pub fn project(&self, refresh: &str) -> Option<String> {
        self.projects.lock().get(refresh).cloned()
    }

    pub fn store_project(&self, refresh: &str, project_id: impl Into<String>) {
        self.projects
            .lock()
            .insert(refresh.to_string(), project_id.into());
    }

    pub fn evict_project(&self, refresh: &str) {
        self.projects.lock().remove(refresh);
    }

    /// Name of the flavor that last refreshed `refresh` successfully.
    pub fn flavor(&self, refresh: &str) -> Option<String> {
        self.flavors.lock().get(refresh).cloned()
    }

    pub fn store_flavor(&self, refresh: &str, flavor: impl Into<String>) {
        self.flavors.lock().insert(refresh.to_string(), flavor.into());
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("tokens", &self.tokens.lock().len())
            .field("projects", &self.projects.lock().len())
            .field("flavors", &self.flavors.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn token(access: &str, expires_at_ms: i64) -> CachedToken {
        CachedToken {
            access_token: access.to_string(),
            expires_at_ms,
        }
    }

    #[test]
    fn test_valid_token_respects_buffer() {
        let cache = TokenCache::new();
        cache.store_token("r", token("a", 100_000));

        assert_eq!(cache.valid_token("r", 0, 60_000), Some("a".to_string()));
        // 100_000 - 60_000 = 40_000, not strictly after now
        assert_eq!(cache.valid_token("r", 40_000, 60_000), None);
    }

    #[test]
    fn test_stale_entry_is_evicted() {
        let cache = TokenCache::new();
        cache.store_token("r", token("a", 1_000));
        assert!(cache.valid_token("r", 5_000, 0).is_none());
        assert_eq!(cache.tokens.lock().len(), 0);
    }

    #[test]
    fn test_keys_are_isolated() {
        let cache = TokenCache::new();
        cache.store_token("r1", token("a1", i64::MAX));
        cache.store_project("r1", "p1");
        cache.store_flavor("r1", "antigravity");

        assert!(cache.valid_token("r2", 0, 0).is_none());
        assert!(cache.project("r2").is_none());
        assert!(cache.flavor("r2").is_none());
        assert_eq!(cache.project("r1").as_deref(), Some("p1"));
        assert_eq!(cache.flavor("r1").as_deref(), Some("antigravity"));

        cache.evict_project("r1");
        assert!(cache.project("r1").is_none());
    }

    #[test]
    fn test_concurrent_updates() {
        let cache = Arc::new(TokenCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("r{}", j % 4);
                        cache.store_token(&key, token(&format!("a{}", i), i64::MAX));
                        cache.valid_token(&key, 0, 0);
                        cache.store_flavor(&key, "gemini-cli");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.tokens.lock().len(), 4);
        assert_eq!(cache.flavor("r0").as_deref(), Some("gemini-cli"));
    }
}
