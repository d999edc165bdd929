//! Access-pattern learning for speculative prefetch.
//!
//! Tracks, for each accessed key, which keys tend to be requested shortly
//! afterward — a cheap Markov-chain-of-one predictor. Both the recency
//! window and the per-key successor list are small fixed bounds so memory
//! use stays flat regardless of how long the service has been running.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::key::CacheKey;

const RECENT_WINDOW: usize = 10;
const MAX_SUCCESSORS_PER_KEY: usize = 5;

struct Inner {
    recent: VecDeque<CacheKey>,
    successors: HashMap<CacheKey, Vec<CacheKey>>,
}

/// Learns `key -> likely next keys` associations from the access sequence.
pub struct PrefetchTracker {
    inner: Mutex<Inner>,
}

impl Default for PrefetchTracker {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                recent: VecDeque::with_capacity(RECENT_WINDOW),
                successors: HashMap::new(),
            }),
        }
    }
}

impl PrefetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `key` was just accessed: pairs it as a `from_old ->
    /// to_new` pattern with every older id still in the recent window, then
    /// slides the window forward. Matches every older id, not just the
    /// immediately preceding one, so a pattern like A, B, C learns both
    /// A->C and B->C.
    pub fn record_access(&self, key: CacheKey) {
        let mut inner = self.inner.lock();
        for &old in inner.recent.iter() {
            if old == key {
                continue;
            }
            let list = inner.successors.entry(old).or_default();
            if !list.contains(&key) {
                if list.len() >= MAX_SUCCESSORS_PER_KEY {
                    list.remove(0);
                }
                list.push(key);
            }
        }
        if inner.recent.len() >= RECENT_WINDOW {
            inner.recent.pop_front();
        }
        inner.recent.push_back(key);
    }

    /// Returns the learned likely-next keys for `key`, most-recently-seen
    /// first.
    pub fn predict(&self, key: CacheKey) -> Vec<CacheKey> {
        self.inner
            .lock()
            .successors
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of source keys with at least one learned successor.
    pub fn pattern_count(&self) -> usize {
        self.inner.lock().successors.len()
    }

    /// The `n` source keys with the most learned successors, richest first.
    pub fn top_patterns(&self, n: usize) -> Vec<(CacheKey, Vec<CacheKey>)> {
        let inner = self.inner.lock();
        let mut patterns: Vec<(CacheKey, Vec<CacheKey>)> =
            inner.successors.iter().map(|(k, v)| (*k, v.clone())).collect();
        patterns.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        patterns.truncate(n);
        patterns
    }
}
