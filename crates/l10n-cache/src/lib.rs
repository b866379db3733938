// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-tier lookup-aside cache for catalog reads.
//!
//! The process-local tier is a bounded LRU and is authoritative for its own
//! reads; the optional shared (Redis) tier is consulted on local miss; the
//! store is consulted on shared miss, with fills propagating upward.
//! Concurrent misses for the same key collapse into a single underlying
//! build ([`LayeredCache::get_or_fill`]).
//!
//! Cache failures degrade: a failing read is a miss, a failing write is
//! logged and ignored, and the shared tier marks itself degraded until the
//! next successful operation. All operations are futures and cancel
//! promptly when the caller's request deadline drops them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod layered;
mod local;
mod pattern;
mod shared;

pub use layered::LayeredCache;
pub use local::LocalCache;
pub use pattern::Pattern;
pub use shared::RedisCache;

use async_trait::async_trait;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of a cache tier.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The invalidation pattern does not follow the documented grammar
    /// (literal prefix plus a single trailing `*`).
    #[error("invalid cache pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern string.
        pattern: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The backing store of a tier failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// CacheTier
// ---------------------------------------------------------------------------

/// One tier of the lookup-aside cache.
///
/// Values are opaque bytes (canonical JSON of a response DTO). Versioned
/// entries (keys containing `:version:`) are exempt from pattern deletion
/// by construction — only an exact [`delete`](CacheTier::delete) removes
/// them.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Fetch a value. A missing or expired entry is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value with a TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;

    /// Remove a single entry. Removing an absent entry is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every non-versioned entry matching `pattern`, returning the
    /// number of entries removed.
    async fn delete_pattern(&self, pattern: &Pattern) -> Result<u64, CacheError>;

    /// Whether a live entry exists for `key`.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

/// Key segment marking version-bound (immutable, pattern-delete-exempt)
/// entries.
pub(crate) const VERSION_SEGMENT: &str = ":version:";
