//! Content-addressed analysis cache
//!
//! Keys are SHA-256 hashes of the image bytes. Entries are LRU-evicted.
//! `lock_for` hands out one async lock per hash so concurrent analyses of
//! identical bytes run once.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Weak};

use lru::LruCache;

use crate::types::VisionAnalysis;

type FlightLock = tokio::sync::Mutex<()>;

pub struct AnalysisCache {
    /// None when caching is disabled (capacity 0)
    entries: Option<Mutex<LruCache<String, Arc<VisionAnalysis>>>>,
    in_flight: Mutex<HashMap<String, Weak<FlightLock>>>,
}

impl std::fmt::Debug for AnalysisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|c| Mutex::new(LruCache::new(c))),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|e| e.lock().ok().map(|c| c.cap().get()))
            .unwrap_or(0)
    }

    pub fn get(&self, content_hash: &str) -> Option<Arc<VisionAnalysis>> {
        self.entries
            .as_ref()?
            .lock()
            .ok()?
            .get(content_hash)
            .cloned()
    }

    pub fn insert(&self, content_hash: impl Into<String>, analysis: Arc<VisionAnalysis>) {
        if let Some(entries) = &self.entries
            && let Ok(mut cache) = entries.lock()
        {
            cache.put(content_hash.into(), analysis);
        }
    }

    /// Drop one entry; returns whether it was present
    pub fn invalidate(&self, content_hash: &str) -> bool {
        self.entries
            .as_ref()
            .and_then(|e| e.lock().ok())
            .is_some_and(|mut cache| cache.pop(content_hash).is_some())
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries
            && let Ok(mut cache) = entries.lock()
        {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .and_then(|e| e.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-hash lock shared by every concurrent caller for the same bytes
    pub fn lock_for(&self, content_hash: &str) -> Arc<FlightLock> {
        let Ok(mut in_flight) = self.in_flight.lock() else {
            // Poisoned map: hand out a private lock, callers proceed uncoordinated
            return Arc::new(FlightLock::new(()));
        };
        if let Some(lock) = in_flight.get(content_hash).and_then(Weak::upgrade) {
            return lock;
        }
        in_flight.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(FlightLock::new(()));
        in_flight.insert(content_hash.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Hashes with a caller currently holding or waiting on their lock
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .map(|m| m.values().filter(|l| l.strong_count() > 0).count())
            .unwrap_or(0)
    }
}
