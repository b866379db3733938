// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared (out-of-process) Redis tier.

use crate::{CacheError, CacheTier, Pattern, VERSION_SEGMENT};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Redis-backed shared tier.
///
/// The connection is multiplexed, so the tier is cheap to share across
/// request tasks. A failed operation marks the tier degraded; the flag
/// clears on the next success and is surfaced in `/health`.
pub struct RedisCache {
    conn: MultiplexedConnection,
    degraded: AtomicBool,
}

impl RedisCache {
    /// Connect to the shared tier at `url` (e.g. `redis://127.0.0.1/0`).
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            degraded: AtomicBool::new(false),
        })
    }

    /// Whether the last operation against this tier failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn track<T>(&self, result: Result<T, redis::RedisError>) -> Result<T, CacheError> {
        match result {
            Ok(v) => {
                self.degraded.store(false, Ordering::Relaxed);
                Ok(v)
            }
            Err(e) => {
                self.degraded.store(true, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    async fn scan_keys(&self, pattern: &Pattern) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = self.track(
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern.as_match_arg())
                    .arg("COUNT")
                    .arg(100)
                    .query_async(&mut conn)
                    .await,
            )?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheTier for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        self.track(conn.get(key).await)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.track(conn.set_ex(key, value, ttl.as_secs()).await)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.track(conn.del(key).await)
    }

    async fn delete_pattern(&self, pattern: &Pattern) -> Result<u64, CacheError> {
        let victims: Vec<String> = self
            .scan_keys(pattern)
            .await?
            .into_iter()
            .filter(|k| !k.contains(VERSION_SEGMENT))
            .collect();
        if victims.is_empty() {
            return Ok(0);
        }
        let count = victims.len() as u64;
        let mut conn = self.conn.clone();
        if let Err(e) = self.track::<()>(conn.del(victims).await) {
            warn!(pattern = %pattern, error = %e, "shared-tier pattern delete failed");
            return Err(e);
        }
        Ok(count)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        self.track(conn.exists(key).await)
    }
}
