//! L1: an in-process LRU of hot entries.
//!
//! Grounded on the teacher's page cache (`pager::Pager`'s `LruCache<PageId,
//! Page>`), generalized from fixed-size pages to variable-size JSON
//! payloads capped by entry *count* rather than bytes — the byte budget is
//! the L2 tier's job.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::entry::CacheEntry;
use super::key::CacheKey;

pub struct MemoryTier {
    entries: LruCache<CacheKey, CacheEntry>,
}

impl MemoryTier {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    pub fn put(&mut self, key: CacheKey, entry: CacheEntry) {
        self.entries.put(key, entry);
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.pop(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose entry belongs to `file_key`. Used for bulk invalidation,
    /// where the caller only has the file, not the per-node cache key.
    pub fn keys_with_file_key(&self, file_key: &str) -> Vec<CacheKey> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.file_key == file_key)
            .map(|(key, _)| *key)
            .collect()
    }
}
