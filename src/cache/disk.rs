//! L2: a byte-bounded disk tier, write-temp-then-rename for atomicity.
//!
//! Grounded on the teacher's WAL/page-flush discipline (`pager/wal.rs`,
//! `pager::Pager::write_page_to_disk`) of never leaving a half-written file
//! where a reader could observe it, adapted here via
//! [`tempfile::NamedTempFile`] instead of fixed-size page slots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{NodeBridgeError, Result};

use super::entry::CacheEntry;
use super::key::CacheKey;

struct IndexEntry {
    bytes: u64,
    last_access: u64,
    file_key: String,
}

pub struct DiskTier {
    dir: PathBuf,
    max_bytes: u64,
    index: HashMap<CacheKey, IndexEntry>,
    total_bytes: u64,
}

impl DiskTier {
    pub fn open(dir: &Path, max_bytes: u64) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut tier = Self {
            dir: dir.to_path_buf(),
            max_bytes,
            index: HashMap::new(),
            total_bytes: 0,
        };
        tier.rebuild_index()?;
        Ok(tier)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(key_bits) = u64::from_str_radix(stem, 16) else {
                continue;
            };
            let bytes = entry.metadata()?.len();
            let (last_access, file_key) = match self.read_raw(&path) {
                Ok(cache_entry) => (cache_entry.last_access, cache_entry.file_key),
                Err(_) => {
                    let _ = std::fs::remove_file(&path);
                    continue;
                }
            };
            self.total_bytes += bytes;
            self.index.insert(
                CacheKey::from_raw(key_bits),
                IndexEntry {
                    bytes,
                    last_access,
                    file_key,
                },
            );
        }
        Ok(())
    }

    fn path_for(&self, key: CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.to_hex()))
    }

    fn read_raw(&self, path: &Path) -> Result<CacheEntry> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| NodeBridgeError::CacheCorruption(format!("{}: {e}", path.display())))
    }

    /// Reads an entry, touching its last-access time on success. A corrupt
    /// entry is deleted and reported as a miss, never surfaced to the
    /// caller — `CacheCorruption` is internal-only.
    pub fn get(&mut self, key: CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        match self.read_raw(&path) {
            Ok(mut entry) => {
                entry.touch();
                self.write_atomic(&path, &entry)?;
                if let Some(idx) = self.index.get_mut(&key) {
                    idx.last_access = entry.last_access;
                }
                Ok(Some(entry))
            }
            Err(err) => {
                warn!(key = %key, error = %err, "disk cache entry corrupted, evicting");
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    pub fn put(&mut self, key: CacheKey, entry: &CacheEntry) -> Result<()> {
        let path = self.path_for(key);
        self.write_atomic(&path, entry)?;
        let bytes = entry.approx_byte_size();
        let index_entry = IndexEntry {
            bytes,
            last_access: entry.last_access,
            file_key: entry.file_key.clone(),
        };
        if let Some(old) = self.index.insert(key, index_entry) {
            self.total_bytes = self.total_bytes.saturating_sub(old.bytes);
        }
        self.total_bytes += bytes;
        self.evict_to_budget()
    }

    /// Keys whose entry belongs to `file_key`. Used for bulk invalidation.
    pub fn keys_with_file_key(&self, file_key: &str) -> Vec<CacheKey> {
        self.index
            .iter()
            .filter(|(_, entry)| entry.file_key == file_key)
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn remove(&mut self, key: CacheKey) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        if let Some(old) = self.index.remove(&key) {
            self.total_bytes = self.total_bytes.saturating_sub(old.bytes);
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        for key in self.index.keys().copied().collect::<Vec<_>>() {
            let path = self.path_for(key);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        self.index.clear();
        self.total_bytes = 0;
        Ok(())
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    fn write_atomic(&self, path: &Path, entry: &CacheEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| NodeBridgeError::CacheCorruption(format!("serialize failed: {e}")))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::io::Write::write_all(&mut tmp, &bytes)?;
        tmp.persist(path)
            .map_err(|e| NodeBridgeError::Io(e.error))?;
        Ok(())
    }

    /// Evicts the oldest-accessed entries until under `max_bytes`.
    fn evict_to_budget(&mut self) -> Result<()> {
        if self.total_bytes <= self.max_bytes {
            return Ok(());
        }
        let mut victims: Vec<(CacheKey, u64)> =
            self.index.iter().map(|(k, v)| (*k, v.last_access)).collect();
        victims.sort_by_key(|(_, last_access)| *last_access);
        for (key, _) in victims {
            if self.total_bytes <= self.max_bytes {
                break;
            }
            self.remove(key)?;
        }
        Ok(())
    }
}
