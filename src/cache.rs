//! Session Validation Cache
//!
//! Content-addressed cache of validation results, owned and injected by the
//! calling session. Bounded LRU; get/put are serialized behind a mutex so
//! concurrent callers cannot corrupt recency order.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::compliance::ValidationResult;

pub const DEFAULT_CAPACITY: usize = 256;

/// Content identity of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file_name: String,
    pub size_bytes: u64,
    pub last_modified_ms: i64,
}

impl CacheKey {
    pub fn new(file_name: impl Into<String>, size_bytes: u64, last_modified_ms: i64) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes,
            last_modified_ms,
        }
    }
}

pub struct ValidationCache {
    entries: Mutex<LruCache<CacheKey, ValidationResult>>,
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::with_capacity(
            NonZeroUsize::new(DEFAULT_CAPACITY).expect("default capacity is non-zero"),
        )
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<ValidationResult> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(result) => {
                debug!(file = %key.file_name, "validation cache hit");
                Some(result.clone())
            }
            None => {
                debug!(file = %key.file_name, "validation cache miss");
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, result: ValidationResult) {
        self.entries.lock().put(key, result);
    }

    /// Explicit session-end cleanup.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new()
    }
}
