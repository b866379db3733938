// SPDX-License-Identifier: MIT OR Apache-2.0
//! The two-tier facade the request path talks to.

use crate::{CacheError, CacheTier, LocalCache, Pattern};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Process-local LRU in front of an optional shared tier, with singleflight
/// fills.
///
/// Tier policy: the local tier is authoritative for its own reads; the
/// shared tier is consulted on local miss; the caller's fill closure runs
/// on shared miss, and fills propagate upward. Shared-tier failures degrade
/// silently — a failed read is a miss, a failed write is logged — and flip
/// the degraded flag until the next successful shared operation.
pub struct LayeredCache {
    local: LocalCache,
    shared: Option<Arc<dyn CacheTier>>,
    flights: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    degraded: AtomicBool,
}

impl LayeredCache {
    /// Build the facade over a local tier and an optional shared tier.
    pub fn new(local: LocalCache, shared: Option<Arc<dyn CacheTier>>) -> Self {
        Self {
            local,
            shared,
            flights: Mutex::new(HashMap::new()),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the shared tier is currently degraded.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Whether a shared tier is configured at all.
    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    fn note_shared(&self, ok: bool) {
        self.degraded.store(!ok, Ordering::Relaxed);
    }

    /// Look up `key`; on a shared-tier hit, promote the value into the
    /// local tier with `promote_ttl`.
    async fn lookup(&self, key: &str, promote_ttl: Option<Duration>) -> Option<Vec<u8>> {
        if let Ok(Some(bytes)) = self.local.get(key).await {
            return Some(bytes);
        }
        let shared = self.shared.as_ref()?;
        match shared.get(key).await {
            Ok(Some(bytes)) => {
                self.note_shared(true);
                if let Some(ttl) = promote_ttl {
                    let _ = self.local.set(key, &bytes, ttl).await;
                }
                Some(bytes)
            }
            Ok(None) => {
                self.note_shared(true);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "shared cache read failed, treating as miss");
                self.note_shared(false);
                None
            }
        }
    }

    /// Fetch `key` without filling. A degraded shared tier reads as a miss.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lookup(key, None).await
    }

    /// Store `value` in both tiers. Oversized values bypass the local tier;
    /// shared-tier failures are logged and swallowed.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        let _ = self.local.set(key, value, ttl).await;
        if let Some(shared) = &self.shared {
            match shared.set(key, value, ttl).await {
                Ok(()) => self.note_shared(true),
                Err(e) => {
                    warn!(key, error = %e, "shared cache write failed");
                    self.note_shared(false);
                }
            }
        }
    }

    /// Remove `key` from both tiers.
    pub async fn delete(&self, key: &str) {
        let _ = self.local.delete(key).await;
        if let Some(shared) = &self.shared {
            match shared.delete(key).await {
                Ok(()) => self.note_shared(true),
                Err(e) => {
                    warn!(key, error = %e, "shared cache delete failed");
                    self.note_shared(false);
                }
            }
        }
    }

    /// Remove every non-versioned entry under `pattern` from both tiers.
    ///
    /// Returns the number of entries removed from the tiers that answered;
    /// an invalid pattern is an error, a failing shared tier is not.
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let pattern = Pattern::parse(pattern)?;
        let mut removed = self
            .local
            .delete_pattern(&pattern)
            .await
            .unwrap_or_default();
        if let Some(shared) = &self.shared {
            match shared.delete_pattern(&pattern).await {
                Ok(n) => {
                    self.note_shared(true);
                    removed += n;
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "shared cache invalidation failed");
                    self.note_shared(false);
                }
            }
        }
        debug!(pattern = %pattern, removed, "cache invalidation");
        Ok(removed)
    }

    /// Whether a live entry exists in either tier.
    pub async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Fetch `key`, or compute it exactly once under concurrent misses.
    ///
    /// Concurrent callers for the same key collapse onto one fill: the
    /// first caller runs `fill` while the rest wait on the per-key slot and
    /// then read the freshly stored bytes. The slot is released only after
    /// the value is stored.
    pub async fn get_or_fill<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fill: F,
    ) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        if let Some(bytes) = self.lookup(key, Some(ttl)).await {
            return Ok(bytes);
        }

        let slot = {
            let mut flights = self.flights.lock().expect("flights lock poisoned");
            Arc::clone(
                flights
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };

        let result = {
            let _guard = slot.lock().await;
            // A concurrent filler may have completed while we waited.
            if let Some(bytes) = self.lookup(key, Some(ttl)).await {
                Ok(bytes)
            } else {
                match fill().await {
                    Ok(bytes) => {
                        self.set(key, &bytes, ttl).await;
                        Ok(bytes)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        let mut flights = self.flights.lock().expect("flights lock poisoned");
        // Keep the entry while other waiters still hold the slot.
        if Arc::strong_count(&slot) <= 2 {
            flights.remove(key);
        }

        result
    }
}
