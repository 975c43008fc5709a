//! Aggregate cache
//!
//! Short-lived memoization for the expensive discovery+scoring pass, keyed
//! by logical resource name ("peer-list", "network-stats"). The cache knows
//! nothing about how values are produced; callers re-run the computation on
//! a miss and `set` the fresh result.
//!
//! Expiry is lazy: `get` past the deadline returns absent. `purge_expired`
//! exists for memory hygiene but no background sweep is required. Values
//! live behind `Arc` and swap atomically under the lock, so a concurrent
//! `get` during `set` sees the old value or the new one, never a partial
//! write.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<T> {
    value: Arc<T>,
    expires_at: Instant,
}

/// In-process TTL cache for pass results.
pub struct AggregateCache<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
}

impl<T: Send + Sync> AggregateCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a live value, or absent if missing or expired.
    pub async fn get(&self, key: &str) -> Option<Arc<T>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;

        if Instant::now() >= entry.expires_at {
            return None;
        }

        Some(entry.value.clone())
    }

    /// Store a value with an absolute expiry `ttl` from now.
    pub async fn set(&self, key: &str, value: T, ttl: Duration) {
        let entry = Entry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };

        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Drop a key regardless of expiry.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<T: Send + Sync> Default for AggregateCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
