// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-local LRU tier.

use crate::{CacheError, CacheTier, Pattern, VERSION_SEGMENT};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Bounded in-process LRU cache with per-entry TTLs and a per-entry byte
/// cap. Values above the cap bypass this tier entirely and are served from
/// the shared tier when present.
pub struct LocalCache {
    inner: Mutex<LruCache<String, Entry>>,
    max_entry_bytes: usize,
}

impl LocalCache {
    /// Create a local tier holding at most `capacity` entries, each at most
    /// `max_entry_bytes` long.
    pub fn new(capacity: usize, max_entry_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            max_entry_bytes,
        }
    }

    /// Number of live (possibly expired, not yet collected) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("local cache lock poisoned").len()
    }

    /// Whether the tier holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a value of `len` bytes is admitted into this tier.
    pub fn admits(&self, len: usize) -> bool {
        len <= self.max_entry_bytes
    }
}

#[async_trait]
impl CacheTier for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut guard = self.inner.lock().expect("local cache lock poisoned");
        match guard.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.bytes.clone())),
            Some(_) => {
                // Expired: collect on access.
                guard.pop(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        if !self.admits(value.len()) {
            // Oversized values never occupy local capacity.
            return Ok(());
        }
        let entry = Entry {
            bytes: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.inner
            .lock()
            .expect("local cache lock poisoned")
            .put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner
            .lock()
            .expect("local cache lock poisoned")
            .pop(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &Pattern) -> Result<u64, CacheError> {
        let mut guard = self.inner.lock().expect("local cache lock poisoned");
        let victims: Vec<String> = guard
            .iter()
            .filter(|(k, _)| pattern.matches(k) && !k.contains(VERSION_SEGMENT))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &victims {
            guard.pop(key);
        }
        Ok(victims.len() as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_get_roundtrip() {
        let cache = LocalCache::new(16, 1024);
        cache.set("l10n:catalog:en:-", b"{}", TTL).await.unwrap();
        assert_eq!(cache.get("l10n:catalog:en:-").await.unwrap(), Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let cache = LocalCache::new(16, 1024);
        cache
            .set("k", b"v", Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn lru_evicts_oldest_at_capacity() {
        let cache = LocalCache::new(2, 1024);
        cache.set("a", b"1", TTL).await.unwrap();
        cache.set("b", b"2", TTL).await.unwrap();
        cache.get("a").await.unwrap(); // touch "a" so "b" is the LRU victim
        cache.set("c", b"3", TTL).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_some());
        assert!(cache.get("b").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn oversized_value_bypasses_tier() {
        let cache = LocalCache::new(16, 4);
        cache.set("big", b"0123456789", TTL).await.unwrap();
        assert_eq!(cache.get("big").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_pattern_spares_versioned_entries() {
        let cache = LocalCache::new(16, 1024);
        cache.set("l10n:catalog:en:-", b"cur", TTL).await.unwrap();
        cache.set("l10n:catalog:en:app", b"cat", TTL).await.unwrap();
        cache
            .set("l10n:catalog:en:version:1.0.0", b"v1", TTL)
            .await
            .unwrap();

        let pattern = Pattern::parse("l10n:catalog:en:*").unwrap();
        let removed = cache.delete_pattern(&pattern).await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("l10n:catalog:en:-").await.unwrap().is_none());
        assert!(cache
            .get("l10n:catalog:en:version:1.0.0")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn explicit_delete_removes_versioned_entry() {
        let cache = LocalCache::new(16, 1024);
        cache
            .set("l10n:catalog:en:version:1.0.0", b"v1", TTL)
            .await
            .unwrap();
        cache.delete("l10n:catalog:en:version:1.0.0").await.unwrap();
        assert!(cache
            .get("l10n:catalog:en:version:1.0.0")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn exists_tracks_liveness() {
        let cache = LocalCache::new(16, 1024);
        assert!(!cache.exists("k").await.unwrap());
        cache.set("k", b"v", TTL).await.unwrap();
        assert!(cache.exists("k").await.unwrap());
    }
}
