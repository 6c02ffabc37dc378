//! Process-lifetime credential cache.

use dashmap::DashMap;
use proxyauth_common::{Credentials, Fingerprint};

/// Last credentials used for each proxy during this process.
///
/// Entries never expire. They are written only by a resolution for the same
/// fingerprint, which the single-flight map keeps exclusive.
#[derive(Default)]
pub struct SessionCache {
    entries: DashMap<Fingerprint, Credentials>,
}

impl SessionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached credentials for a proxy.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Credentials> {
        self.entries.get(fingerprint).map(|e| e.value().clone())
    }

    /// Records the credentials last used for a proxy.
    pub fn insert(&self, fingerprint: Fingerprint, credentials: Credentials) {
        self.entries.insert(fingerprint, credentials);
    }

    /// Number of cached proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxyauth_common::fingerprint;

    #[test]
    fn test_insert_overwrites() {
        let cache = SessionCache::new();
        let fp = fingerprint("http", "proxy.example", 8080);

        assert!(cache.get(&fp).is_none());

        cache.insert(fp.clone(), Credentials::new("alice", "old"));
        cache.insert(fp.clone(), Credentials::new("alice", "new"));

        assert_eq!(cache.get(&fp), Some(Credentials::new("alice", "new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entries_are_per_proxy() {
        let cache = SessionCache::new();
        cache.insert(
            fingerprint("http", "a.example", 8080),
            Credentials::new("alice", "secret"),
        );

        assert!(cache.get(&fingerprint("http", "b.example", 8080)).is_none());
        assert!(!cache.is_empty());
    }
}
