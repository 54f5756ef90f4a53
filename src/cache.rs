//! Short-lived result cache keyed by canonical query.
//!
//! Process-local only. Concurrent misses for the same key may both
//! recompute; the last `set` wins.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::clock::Clock;
use crate::types::NewsResponse;

/// A cached response and how old it is.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub response: NewsResponse,
    pub age: Duration,
}

/// Cache seam used by the aggregator. Implementations decide expiry.
#[cfg_attr(test, mockall::automock)]
pub trait ResultCache: Send + Sync {
    /// Fresh entry for `key`, or `None` on miss or expiry.
    fn get(&self, key: &str) -> Option<CacheHit>;

    fn set(&self, key: String, response: NewsResponse);
}

// ---------------------------------------------------------------------------
// In-memory TTL cache
// ---------------------------------------------------------------------------

struct CacheEntry {
    response: NewsResponse,
    inserted_at: DateTime<Utc>,
}

/// `HashMap` behind an `RwLock` with a fixed TTL and optional size cap.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: None,
            clock,
        }
    }

    /// Cap the number of entries; the oldest entry is evicted first.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max.max(1));
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries.
    pub fn evict_expired(&self) {
        let now = self.clock.now();
        let ttl = self.ttl;
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| now - entry.inserted_at < ttl);
        }
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheHit> {
        let now = self.clock.now();
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        let age = now - entry.inserted_at;
        if age < self.ttl {
            Some(CacheHit {
                response: entry.response.clone(),
                age,
            })
        } else {
            None
        }
    }

    fn set(&self, key: String, response: NewsResponse) {
        let now = self.clock.now();
        let ttl = self.ttl;
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        entries.retain(|_, entry| now - entry.inserted_at < ttl);

        if let Some(max) = self.max_entries {
            while entries.len() >= max && !entries.contains_key(&key) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        debug!(key = %k, "Evicting oldest cache entry");
                        entries.remove(&k);
                    }
                    None => break,
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: now,
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
