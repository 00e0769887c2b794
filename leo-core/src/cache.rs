//! In-memory TTL cache shared by the API services.
//!
//! Entries expire lazily on read and eagerly through [`CacheManager::spawn_cleanup`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::Value;

/// TTLs used by the callers of the cache.
pub mod ttl {
    use std::time::Duration;

    pub const DEFAULT: Duration = Duration::from_secs(3600);
    pub const KEY_CONCEPTS: Duration = Duration::from_secs(1800);
    pub const LLM_CONTENT: Duration = Duration::from_secs(3600);
    pub const CRAWLED_URLS: Duration = Duration::from_secs(7200);
    pub const PARSED_DOCUMENTS: Duration = Duration::from_secs(3600);
    pub const EMBEDDINGS: Duration = Duration::from_secs(86400);
    pub const SIMILARITY_SEARCH: Duration = Duration::from_secs(1800);
    pub const CHAT_RESPONSE: Duration = Duration::from_secs(300);
    pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
    created_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub active_entries: usize,
    pub expired_entries: usize,
    pub memory_usage_mb: f64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: String,
    /// Age of the oldest live entry, 0 when nothing is live.
    pub oldest_entry_secs: f64,
}

pub struct CacheManager {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(ttl::DEFAULT)
    }
}

impl CacheManager {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key, "cache entry expired");
            }
            None => {}
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "cache miss");
        None
    }

    /// Stores `value`; a missing or zero `ttl` falls back to the default TTL.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let ttl = ttl.filter(|ttl| !ttl.is_zero()).unwrap_or(self.default_ttl);
        let now = Instant::now();
        let key = key.into();
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cached value");
        self.entries().insert(
            key,
            CacheEntry {
                value,
                expires_at: now + ttl,
                created_at: now,
            },
        );
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                tracing::warn!(key, error = %err, "cached value has unexpected shape");
                None
            }
        }
    }

    pub fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(err) => tracing::warn!(error = %err, "value not cacheable"),
        }
    }

    /// Returns the cached value or computes, stores and returns it. Errors are not cached.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        tracing::debug!(key, "computing value for cache key");
        let value = compute().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Removes every entry whose key contains `pattern`.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        tracing::info!(removed, pattern, "invalidated cache entries");
        removed
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        tracing::info!(count, "cleared cache entries");
    }

    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(removed, "cleaned up expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries();
        let total_entries = entries.len();
        let active_entries = entries.values().filter(|entry| entry.is_live(now)).count();
        let oldest_entry_secs = entries
            .values()
            .filter(|entry| entry.is_live(now))
            .map(|entry| now.duration_since(entry.created_at).as_secs_f64())
            .fold(0.0, f64::max);
        let bytes: usize = entries.values().map(|entry| entry.value.to_string().len()).sum();
        drop(entries);

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups > 0 {
            hits as f64 / lookups as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            total_entries,
            active_entries,
            expired_entries: total_entries - active_entries,
            memory_usage_mb: bytes as f64 / 1024.0 / 1024.0,
            hits,
            misses,
            hit_rate: format!("{hit_rate:.1}%"),
            oldest_entry_secs,
        }
    }

    /// Purges expired entries every `interval` until `shutdown` is cancelled.
    pub fn spawn_cleanup(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.purge_expired();
                    }
                }
            }
        })
    }
}

/// `"{prefix}:{md5}"` over the JSON encoding of `args`.
pub fn cache_key<A: Serialize + ?Sized>(prefix: &str, args: &A) -> String {
    let encoded = serde_json::to_value(args)
        .map(|value| value.to_string())
        .unwrap_or_default();
    format!("{prefix}:{:x}", md5::compute(encoded.as_bytes()))
}
