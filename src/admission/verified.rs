//! Remembered verifications.
//!
//! [`VerifiedStore`] is the boundary to whatever keeps verified fingerprints
//! across restarts. [`VerifiedCache`] sits in front of it with a TTL so a
//! returning player skips verification for `remember_time`.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// Durable record of verified fingerprints.
pub trait VerifiedStore: Send + Sync {
    fn contains(&self, fingerprint: &str) -> bool;
    fn insert(&self, fingerprint: &str, verified_at: SystemTime);
}

/// Process-local store, used when the host supplies none.
#[derive(Debug, Default)]
pub struct MemoryVerifiedStore {
    entries: DashMap<String, SystemTime>,
}

impl MemoryVerifiedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VerifiedStore for MemoryVerifiedStore {
    fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    fn insert(&self, fingerprint: &str, verified_at: SystemTime) {
        self.entries.insert(fingerprint.to_owned(), verified_at);
    }
}

pub struct VerifiedCache {
    ttl: Duration,
    entries: DashMap<String, Instant>,
    store: Arc<dyn VerifiedStore>,
}

impl std::fmt::Debug for VerifiedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifiedCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl VerifiedCache {
    pub fn new(ttl: Duration, store: Arc<dyn VerifiedStore>) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            store,
        }
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.contains_at(fingerprint, Instant::now())
    }

    /// Cache first, then the store. A store hit is cached for the TTL.
    pub fn contains_at(&self, fingerprint: &str, now: Instant) -> bool {
        if let Some(verified_at) = self.entries.get(fingerprint) {
            if now.duration_since(*verified_at) < self.ttl {
                return true;
            }
        }
        if self.store.contains(fingerprint) {
            self.entries.insert(fingerprint.to_owned(), now);
            return true;
        }
        false
    }

    pub fn insert(&self, fingerprint: &str) {
        self.insert_at(fingerprint, Instant::now());
    }

    pub fn insert_at(&self, fingerprint: &str, now: Instant) {
        self.entries.insert(fingerprint.to_owned(), now);
        self.store.insert(fingerprint, SystemTime::now());
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, verified_at| now.duration_since(*verified_at) < self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Swept expired verified fingerprints");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store that never remembers anything.
    struct Forgetful;

    impl VerifiedStore for Forgetful {
        fn contains(&self, _fingerprint: &str) -> bool {
            false
        }

        fn insert(&self, _fingerprint: &str, _verified_at: SystemTime) {}
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = VerifiedCache::new(Duration::from_secs(120), Arc::new(Forgetful));
        let now = Instant::now();
        cache.insert_at("abc", now);
        assert!(cache.contains_at("abc", now + Duration::from_secs(60)));
        assert!(!cache.contains_at("abc", now + Duration::from_secs(120)));
        assert_eq!(cache.sweep_at(now + Duration::from_secs(121)), 1);
    }

    #[test]
    fn test_store_hit_refills_cache() {
        let store = Arc::new(MemoryVerifiedStore::new());
        store.insert("abc", SystemTime::now());
        let cache = VerifiedCache::new(Duration::from_secs(120), store.clone());
        assert!(cache.is_empty());
        assert!(cache.contains("abc"));
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains("def"));
    }

    #[test]
    fn test_insert_reaches_store() {
        let store = Arc::new(MemoryVerifiedStore::new());
        let cache = VerifiedCache::new(Duration::from_secs(120), store.clone());
        cache.insert("abc");
        assert_eq!(store.len(), 1);
    }
}
