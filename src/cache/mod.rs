//! Two-tier content-addressed node cache.
//!
//! L1 is an in-process LRU ([`memory::MemoryTier`]) bounded by entry count;
//! L2 is a byte-bounded disk tier ([`disk::DiskTier`]) that survives
//! restarts. Every call takes a single exclusive lock for the duration of
//! the operation — grounded on the teacher's `Pager`, which serializes all
//! page access through `&mut self` rather than fine-grained per-page locks.
//! At this cache's scale (one service process, request-sized payloads) the
//! simplicity is worth more than the parallelism finer locking would buy.

pub mod entry;
pub mod key;
pub mod memory;
pub mod prefetch;
pub mod singleflight;
pub mod stats;
pub mod version;

use std::path::Path;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::error::{NodeBridgeError, Result};

pub use key::CacheKey;
pub use stats::Snapshot;
pub use version::VersionCheck;

struct Inner {
    memory: memory::MemoryTier,
    disk: disk::DiskTier,
}

mod disk;

/// The cache facade every other layer talks to. Cheap to clone (it's an
/// `Arc` internally via its callers), but the type itself owns its state
/// and is meant to be held behind one `Arc<NodeCache>`.
pub struct NodeCache {
    inner: Mutex<Inner>,
    counters: stats::Counters,
    versions: version::VersionTrack,
    prefetch: prefetch::PrefetchTracker,
    default_ttl_secs: u64,
}

impl NodeCache {
    pub fn open(cache_dir: &Path, max_l1_entries: usize, l2_max_bytes: u64, default_ttl_hours: f64) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Inner {
                memory: memory::MemoryTier::new(max_l1_entries),
                disk: disk::DiskTier::open(cache_dir, l2_max_bytes)?,
            }),
            counters: stats::Counters::default(),
            versions: version::VersionTrack::new(),
            prefetch: prefetch::PrefetchTracker::new(),
            default_ttl_secs: (default_ttl_hours * 3600.0) as u64,
        })
    }

    /// Looks up `key`, checking L1 then L2 and promoting an L2 hit back
    /// into L1. Expired entries are treated as misses and removed from
    /// both tiers.
    pub fn get<T: DeserializeOwned>(&self, key: CacheKey) -> Result<Option<T>> {
        self.prefetch.record_access(key);
        let mut inner = self.inner.lock();

        if let Some(entry) = inner.memory.get(&key) {
            if entry.is_expired(self.default_ttl_secs) {
                inner.memory.remove(&key);
            } else {
                entry.touch();
                self.counters.record_l1_hit();
                let payload = entry.payload.clone();
                return Ok(Some(decode_payload(payload)?));
            }
        }

        match inner.disk.get(key)? {
            Some(entry) if entry.is_expired(self.default_ttl_secs) => {
                inner.disk.remove(key)?;
                self.counters.record_miss();
                Ok(None)
            }
            Some(entry) => {
                self.counters.record_l2_hit();
                inner.memory.put(key, entry.clone());
                Ok(Some(decode_payload(entry.payload)?))
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    /// Writes `value` into both tiers.
    pub fn set<T: Serialize>(
        &self,
        key: CacheKey,
        value: &T,
        file_key: &str,
        node_id: &str,
        version: Option<String>,
    ) -> Result<()> {
        let payload = serde_json::to_value(value)
            .map_err(|e| NodeBridgeError::Parse(format!("cache payload serialize failed: {e}")))?;
        let entry = entry::CacheEntry::new(payload, file_key, node_id, version);
        let mut inner = self.inner.lock();
        inner.disk.put(key, &entry)?;
        inner.memory.put(key, entry);
        Ok(())
    }

    /// Removes `key` from both tiers, if present.
    pub fn invalidate(&self, key: CacheKey) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.memory.remove(&key);
        inner.disk.remove(key)?;
        self.counters.record_invalidation();
        Ok(())
    }

    /// Removes every entry belonging to `file_key` from both tiers. Cache
    /// keys are hashed, so this can't be done by key pattern; both tiers
    /// index their entries' `file_key` metadata precisely so this doesn't
    /// need to scan payloads.
    pub fn invalidate_file(&self, file_key: &str) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut keys: Vec<CacheKey> = inner.memory.keys_with_file_key(file_key);
        keys.extend(inner.disk.keys_with_file_key(file_key));
        keys.sort_by_key(CacheKey::as_u64);
        keys.dedup();
        for key in &keys {
            inner.memory.remove(key);
            inner.disk.remove(*key)?;
        }
        if !keys.is_empty() {
            self.counters.record_invalidation();
        }
        Ok(keys.len())
    }

    /// Checks the reported version of `file_key` against what's on record;
    /// when it has changed, every entry for this cache belonging to
    /// `file_key` is dropped from both tiers (memory has no per-file index,
    /// so that side is a blunt but correct full flush; disk is precise via
    /// `keys_with_file_key`, the same lookup `invalidate_file` uses) and the
    /// caller is told to treat the file as stale.
    pub fn check_version(&self, file_key: &str, version: &str) -> VersionCheck {
        let check = self.versions.check(file_key, version);
        if check == VersionCheck::Invalidated {
            debug!(file_key, version, "file version changed, flushing cached entries");
            let mut inner = self.inner.lock();
            inner.memory.clear();
            for key in inner.disk.keys_with_file_key(file_key) {
                if let Err(err) = inner.disk.remove(key) {
                    warn!(file_key, %key, error = %err, "failed to evict disk entry after version change");
                }
            }
            self.counters.record_invalidation();
        }
        check
    }

    pub fn predicted_successors(&self, key: CacheKey) -> Vec<CacheKey> {
        self.prefetch.predict(key)
    }

    pub fn stats(&self) -> Snapshot {
        let inner = self.inner.lock();
        let top_patterns = self
            .prefetch
            .top_patterns(5)
            .into_iter()
            .map(|(from, to)| stats::PatternSummary {
                from: from.to_hex(),
                to: to.iter().map(|k| k.to_hex()).collect(),
            })
            .collect();
        self.counters.snapshot(
            inner.memory.len(),
            inner.disk.entry_count(),
            inner.disk.total_bytes(),
            self.prefetch.pattern_count(),
            top_patterns,
        )
    }

    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.memory.clear();
        inner.disk.clear()
    }
}

fn decode_payload<T: DeserializeOwned>(payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| NodeBridgeError::CacheCorruption(format!("payload decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips_through_l1() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = NodeCache::open(tmp.path(), 100, 10 * 1024 * 1024, 1.0).unwrap();
        let key = CacheKey::new("node", &["F1", "1:2"]);
        cache.set(key, &"hello".to_string(), "F1", "1:2", None).unwrap();
        let got: Option<String> = cache.get(key).unwrap();
        assert_eq!(got, Some("hello".to_string()));
        assert_eq!(cache.stats().l1_hits, 1);
    }

    #[test]
    fn l2_hit_promotes_back_into_l1() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = NodeCache::open(tmp.path(), 100, 10 * 1024 * 1024, 1.0).unwrap();
        let key = CacheKey::new("node", &["F1", "1:2"]);
        cache.set(key, &7u32, "F1", "1:2", None).unwrap();
        cache.inner.lock().memory.clear();
        let got: Option<u32> = cache.get(key).unwrap();
        assert_eq!(got, Some(7));
        assert_eq!(cache.stats().l2_hits, 1);
        // second read now comes from L1
        let got2: Option<u32> = cache.get(key).unwrap();
        assert_eq!(got2, Some(7));
        assert_eq!(cache.stats().l1_hits, 1);
    }

    #[test]
    fn invalidate_removes_from_both_tiers() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = NodeCache::open(tmp.path(), 100, 10 * 1024 * 1024, 1.0).unwrap();
        let key = CacheKey::new("node", &["F1", "1:2"]);
        cache.set(key, &1u32, "F1", "1:2", None).unwrap();
        cache.invalidate(key).unwrap();
        let got: Option<u32> = cache.get(key).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn invalidate_file_removes_every_entry_for_that_file_from_both_tiers() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = NodeCache::open(tmp.path(), 100, 10 * 1024 * 1024, 1.0).unwrap();
        let key_a = CacheKey::new("node", &["F1", "a"]);
        let key_b = CacheKey::new("node", &["F1", "b"]);
        let key_other = CacheKey::new("node", &["F2", "a"]);
        cache.set(key_a, &1u32, "F1", "a", None).unwrap();
        cache.set(key_b, &2u32, "F1", "b", None).unwrap();
        cache.set(key_other, &3u32, "F2", "a", None).unwrap();

        let removed = cache.invalidate_file("F1").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.get::<u32>(key_a).unwrap(), None);
        assert_eq!(cache.get::<u32>(key_b).unwrap(), None);
        assert_eq!(cache.get::<u32>(key_other).unwrap(), Some(3));
    }

    #[test]
    fn version_change_flushes_memory_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = NodeCache::open(tmp.path(), 100, 10 * 1024 * 1024, 1.0).unwrap();
        assert_eq!(cache.check_version("F1", "1"), VersionCheck::NewFile);
        assert_eq!(cache.check_version("F1", "1"), VersionCheck::Valid);
        assert_eq!(cache.check_version("F1", "2"), VersionCheck::Invalidated);
    }
}
