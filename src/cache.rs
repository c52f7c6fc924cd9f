//! Short-lived response cache shared by every source adapter.
//!
//! Keys are source-prefixed (`"{source}:{query}"`) so providers never collide.
//! Expiry is lazy: an entry past `expires_at` reads as absent, and expired entries
//! are pruned on the next insert. There is no sweeper task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::clock::{to_chrono, Clock, SystemClock};
use crate::sources::NormalizedItem;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<Vec<NormalizedItem>>,
    pub expires_at: DateTime<Utc>,
}

/// Thread-safe TTL cache. Cloning shares the same storage.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.read().len())
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Builds the cache key for a source and its raw (pre-default) query parameter.
    pub fn key_for(source: &str, query: Option<&str>) -> String {
        format!("{}:{}", source, query.unwrap_or_default())
    }

    /// Returns the cached items while `now < expires_at`.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<NormalizedItem>>> {
        let now = self.clock.now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Inserts or replaces the entry for `key`, dropping every expired entry on the way.
    /// A zero TTL stores nothing.
    pub fn insert(&self, key: String, value: Vec<NormalizedItem>, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(to_chrono(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            key: key.clone(),
            value: Arc::new(value),
            expires_at,
        };
        let mut entries = self.entries.write();
        entries.retain(|_, e| now < e.expires_at);
        entries.insert(key, entry);
    }

    /// Entries currently stored, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
