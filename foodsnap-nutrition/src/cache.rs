use foodsnap_core::NutritionRecord;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry {
    record: NutritionRecord,
    inserted: Instant,
    ttl: Duration,
}

/// LRU cache of resolved records keyed by normalized food name.
/// "Not Found" records live for a shorter TTL so lookups are retried.
pub struct NutritionCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    not_found_ttl: Duration,
}

impl NutritionCache {
    pub fn new(capacity: usize, ttl: Duration, not_found_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.clamp(1, 100_000)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
            not_found_ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<NutritionRecord> {
        let mut cache = self.cache.lock();
        let expired = match cache.get(key) {
            Some(entry) if entry.inserted.elapsed() < entry.ttl => return Some(entry.record.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
        }
        None
    }

    pub fn insert(&self, key: String, record: NutritionRecord) {
        let ttl = if record.is_not_found() {
            self.not_found_ttl
        } else {
            self.ttl
        };
        let entry = CacheEntry {
            record,
            inserted: Instant::now(),
            ttl,
        };
        self.cache.lock().put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
