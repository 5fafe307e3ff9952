//! TTL-bounded in-memory store for transformed responses.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::key::CacheKey;
use crate::observability::metrics;

/// Cache failures. Never fatal: callers log and carry on as if it missed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache full ({capacity} entries)")]
    Full { capacity: usize },
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Snapshot for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub capacity: usize,
}

/// Thread-safe TTL cache. Reads never return an entry at or past its expiry.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    capacity: usize,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Look up a live entry; `None` is a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
        }
        // Only drop it if nobody refreshed it since we looked.
        self.entries.remove_if(key, |_, e| e.expires_at <= now);
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous value and TTL.
    ///
    /// A zero TTL stores nothing and evicts whatever was there.
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            self.entries.remove(&key);
            return Ok(());
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.sweep_expired();
            if self.entries.len() >= self.capacity {
                return Err(CacheError::Full {
                    capacity: self.capacity,
                });
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        metrics::record_cache_size(self.entries.len());
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        metrics::record_cache_size(self.entries.len());
        removed
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.as_str().starts_with(prefix));
        let after = self.entries.len();
        metrics::record_cache_size(after);
        before.saturating_sub(after)
    }

    pub fn clear(&self) {
        self.entries.clear();
        metrics::record_cache_size(0);
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        let after = self.entries.len();
        metrics::record_cache_size(after);
        before.saturating_sub(after)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            entries: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ResponseCache<V> {
    /// Run periodic sweeps until shutdown.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep_expired();
                        if removed > 0 {
                            tracing::debug!(removed, remaining = self.len(), "Swept expired cache entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }
}
