//! Shared geocode cache.
//!
//! Keyed by the literal query string (no case/whitespace normalization) so a
//! repeated address or coordinate query never re-issues a network call.
//! Bounded LRU with an optional TTL; constructed at the composition root and
//! shared across all mounted pickers behind an `Arc`.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use common::GeocodeResult;
use lru::LruCache;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: GeocodeResult,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.inserted_at.elapsed() > ttl,
            None => false,
        }
    }
}

/// Bounded, optionally expiring geocode cache.
pub struct GeocodeCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl GeocodeCache {
    /// `ttl = None` disables expiry; entries then live until evicted by
    /// capacity.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Look up an entry, refreshing its LRU position. Expired entries are
    /// dropped and reported as absent.
    pub fn get(&self, query: &str) -> Option<GeocodeResult> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(query) {
            Some(entry) if entry.is_expired(self.ttl) => {
                entries.pop(query);
                None
            }
            Some(entry) => Some(entry.result.clone()),
            None => None,
        }
    }

    /// Store a result under the literal query string, evicting the
    /// least-recently-used entry past capacity.
    pub fn insert(&self, query: String, result: GeocodeResult) {
        self.entries.lock().unwrap().put(
            query,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn contains(&self, query: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.peek(query) {
            Some(entry) if entry.is_expired(self.ttl) => {
                entries.pop(query);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
