//! Rendered search payload cache.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock, expiry_after};

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: DateTime<Utc>,
}

/// TTL cache keyed by query fingerprint.
///
/// Entries are evicted lazily: a lookup at or past expiry removes the entry
/// and reports a miss. There is no background sweep.
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ResultCache {
    /// Create an empty cache backed by the given clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Look up a live payload.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        let now = self.clock.now();
        let expired = match self.entries.get(fingerprint) {
            Some(entry) if entry.expires_at > now => return Some(entry.payload.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(fingerprint, "evicting expired cache entry");
            self.entries
                .remove_if(fingerprint, |_, entry| entry.expires_at <= now);
        }
        None
    }

    /// Store a payload for `ttl_secs` seconds, replacing any previous entry.
    ///
    /// Expired entries left behind by keys that are never read again are
    /// swept on every write.
    pub fn put(&self, fingerprint: &str, payload: String, ttl_secs: u64) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let expires_at = expiry_after(now, ttl_secs);
        self.entries.insert(
            fingerprint.to_owned(),
            CacheEntry {
                payload,
                expires_at,
            },
        );
    }

    /// Number of stored entries, live or not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (ResultCache::new(clock.clone()), clock)
    }

    #[test]
    fn hit_before_ttl() {
        let (cache, clock) = cache();
        cache.put("f", "payload".into(), 300);
        clock.advance_secs(299);
        assert_eq!(cache.get("f").as_deref(), Some("payload"));
    }

    #[test]
    fn miss_after_ttl_and_evicted() {
        let (cache, clock) = cache();
        cache.put("f", "payload".into(), 300);
        clock.advance_secs(300);
        assert_eq!(cache.get("f"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_key_is_miss() {
        let (cache, _) = cache();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn put_sweeps_expired_entries() {
        let (cache, clock) = cache();
        cache.put("a", "first".into(), 10);
        cache.put("b", "second".into(), 60);
        clock.advance_secs(11);
        cache.put("c", "third".into(), 10);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b").as_deref(), Some("second"));
        assert_eq!(cache.get("c").as_deref(), Some("third"));
    }

    #[test]
    fn put_replaces_and_refreshes() {
        let (cache, clock) = cache();
        cache.put("f", "old".into(), 10);
        clock.advance_secs(5);
        cache.put("f", "new".into(), 10);
        clock.advance_secs(6);
        assert_eq!(cache.get("f").as_deref(), Some("new"));
        assert_eq!(cache.len(), 1);
    }
}
