//! Cache hit/miss counters and a point-in-time snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
}

impl Counters {
    pub fn record_l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(
        &self,
        l1_entries: usize,
        l2_entries: usize,
        l2_bytes: u64,
        pattern_count: usize,
        top_patterns: Vec<PatternSummary>,
    ) -> Snapshot {
        let l1_hits = self.l1_hits.load(Ordering::Relaxed);
        let l2_hits = self.l2_hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = l1_hits + l2_hits + misses;
        Snapshot {
            l1_hits,
            l2_hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            l1_entries,
            l2_entries,
            l2_bytes,
            pattern_count,
            top_patterns,
            hit_rate: if total == 0 {
                0.0
            } else {
                (l1_hits + l2_hits) as f64 / total as f64
            },
        }
    }
}

/// A single learned prefetch pattern, rendered for display: the source node
/// and the keys observed to follow it, as hex cache keys.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PatternSummary {
    pub from: String,
    pub to: Vec<String>,
}

/// An immutable, serializable view of cache health at a point in time —
/// what a `/stats` endpoint or admin command reports.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Snapshot {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub l1_entries: usize,
    pub l2_entries: usize,
    pub l2_bytes: u64,
    pub pattern_count: usize,
    pub top_patterns: Vec<PatternSummary>,
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_counts_both_tiers() {
        let c = Counters::default();
        c.record_l1_hit();
        c.record_l2_hit();
        c.record_miss();
        let snap = c.snapshot(1, 1, 10, 0, Vec::new());
        assert!((snap.hit_rate - (2.0 / 3.0)).abs() < 1e-9);
    }
}
