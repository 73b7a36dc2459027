//! In-memory keyed cache with a fixed time-to-live per entry.
//!
//! Every instance is constructed explicitly at startup and handed to the code
//! that uses it, so the lifecycle of the cached data (and resetting it in
//! tests) stays visible at the call site.
//!
//! Concurrent misses for the same key are not coalesced: two callers racing
//! on a cold key may both run the compute function, and the last one to
//! finish wins. After a value has settled there is at most one computation per
//! key per TTL window.
//!
//! Expired entries are only dropped when their key is read again. Entries for
//! keys that are never read again stay in memory until the process restarts,
//! which is fine for bounded key spaces (places, categories, event slugs).
use crate::metrics_defs::{CACHE_ENTRIES, CACHE_HIT, CACHE_MISS, CACHE_POPULATE_ERROR};
use parking_lot::Mutex;
use shared::{counter, gauge};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

pub struct KeyedCache<K, V> {
    // Used as the metric label and in logs.
    name: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> KeyedCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        KeyedCache {
            name,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live value for `key`, or runs `compute` and stores its
    /// result for the configured TTL.
    ///
    /// A failed computation stores nothing and its error is returned as is, so
    /// the next call for the same key tries again.
    pub async fn get<F, Fut, E>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(key) {
            counter!(CACHE_HIT, "cache" => self.name).increment(1);
            trace!(cache = self.name, ?key, "cache hit");
            return Ok(value);
        }

        counter!(CACHE_MISS, "cache" => self.name).increment(1);
        trace!(cache = self.name, ?key, "cache miss");

        let value = match compute(key).await {
            Ok(value) => value,
            Err(err) => {
                counter!(CACHE_POPULATE_ERROR, "cache" => self.name).increment(1);
                debug!(cache = self.name, ?key, "cache population failed");
                return Err(err);
            }
        };

        // The lock is never held across the await above.
        let stored = {
            let mut entries = self.entries.lock();
            entries.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
            entries.len()
        };
        self.report_size(stored);

        Ok(value)
    }

    pub fn invalidate(&self, key: &K) {
        let remaining = {
            let mut entries = self.entries.lock();
            entries.remove(key);
            entries.len()
        };
        self.report_size(remaining);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.report_size(0);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let remaining = {
            let mut entries = self.entries.lock();
            let now = Instant::now();

            match entries.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }

            // Expired: drop it so the entry is replaced by the next computation.
            entries.remove(key);
            entries.len()
        };
        self.report_size(remaining);
        None
    }

    fn report_size(&self, len: usize) {
        gauge!(CACHE_ENTRIES, "cache" => self.name).set(len as f64);
    }
}
