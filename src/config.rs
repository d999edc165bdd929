//! Service-wide tunables.
//!
//! Shape and preset pattern mirrors the teacher's `db::Config` /
//! `SyncMode`: a flat struct of bounds plus a handful of named presets,
//! loadable from an optional TOML file with in-code defaults as fallback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{NodeBridgeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Cache directory for the L2 (disk) tier.
    pub cache_dir: PathBuf,
    /// Maximum number of entries held in the L1 memory cache.
    pub max_l1_entries: usize,
    /// Maximum total bytes the L2 disk cache is allowed to occupy.
    pub l2_max_bytes: u64,
    /// Default TTL applied to cache entries when the caller doesn't specify one.
    pub default_ttl_hours: f64,

    /// Timeout for a single external HTTP call.
    pub http_timeout: Duration,
    /// Maximum retry attempts for retryable errors.
    pub max_retry_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay: Duration,
    /// Consecutive failures before the circuit breaker opens.
    pub circuit_breaker_threshold: u32,
    /// Cooldown before an open circuit breaker allows a half-open trial.
    pub circuit_breaker_cooldown: Duration,
    /// Maximum concurrent in-flight API calls per recursive stream.
    pub max_inflight_per_stream: usize,

    /// Default bound on recursive-walk depth.
    pub default_recursive_max_depth: u32,
    /// Default bound on recursive-walk frame count.
    pub default_recursive_max_nodes: u32,
    /// Maximum depth a parsed tree is allowed to reach before truncation.
    pub max_parse_depth: u32,

    /// Default acceptance threshold for the visual verification loop.
    pub default_target_score: f32,
    /// Default iteration bound for the visual verification loop.
    pub default_max_iterations: u32,
    /// Default render viewport.
    pub default_viewport: (u32, u32),
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_l1_entries: 2000,
            l2_max_bytes: 500 * 1024 * 1024,
            default_ttl_hours: 1.0,
            http_timeout: Duration::from_secs(30),
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs(30),
            max_inflight_per_stream: 1,
            default_recursive_max_depth: 10,
            default_recursive_max_nodes: 2000,
            max_parse_depth: 20,
            default_target_score: 0.99,
            default_max_iterations: 5,
            default_viewport: (375, 812),
        }
    }
}

impl ServiceConfig {
    /// Smaller bounds and a short circuit-breaker cooldown, for flaky
    /// networks or constrained memory (analogous to the teacher's
    /// `Config::balanced()`).
    pub fn conservative() -> Self {
        Self {
            max_l1_entries: 200,
            l2_max_bytes: 50 * 1024 * 1024,
            max_retry_attempts: 2,
            circuit_breaker_threshold: 3,
            circuit_breaker_cooldown: Duration::from_secs(10),
            max_inflight_per_stream: 1,
            default_recursive_max_depth: 5,
            default_recursive_max_nodes: 500,
            ..Self::default()
        }
    }

    /// Larger caches and higher concurrency, for trusted high-throughput
    /// deployments (analogous to the teacher's `Config::benchmark()`).
    pub fn aggressive() -> Self {
        Self {
            max_l1_entries: 20_000,
            l2_max_bytes: 4 * 1024 * 1024 * 1024,
            max_retry_attempts: 5,
            circuit_breaker_threshold: 10,
            max_inflight_per_stream: 4,
            default_recursive_max_depth: 20,
            default_recursive_max_nodes: 20_000,
            ..Self::default()
        }
    }

    /// Loads from a TOML file, falling back to [`ServiceConfig::default`]
    /// when the file is absent. A malformed file is a `ParseError`.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| NodeBridgeError::Parse(format!("invalid config: {e}")))
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nodebridge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_in_scale() {
        let c = ServiceConfig::conservative();
        let a = ServiceConfig::aggressive();
        assert!(c.max_l1_entries < a.max_l1_entries);
        assert!(c.l2_max_bytes < a.l2_max_bytes);
    }

    #[test]
    fn load_missing_file_falls_back_to_default() {
        let cfg = ServiceConfig::load(std::path::Path::new("/nonexistent/nodebridge.toml"))
            .expect("falls back");
        assert_eq!(cfg.max_l1_entries, ServiceConfig::default().max_l1_entries);
    }
}
