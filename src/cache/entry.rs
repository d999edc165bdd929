//! The on-disk/in-memory cache entry envelope.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wraps an arbitrary JSON-serializable payload with the bookkeeping the
/// cache needs to make eviction, TTL, and version-invalidation decisions
/// without deserializing the payload itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    #[serde(rename = "_cached_at")]
    pub cached_at: u64,
    #[serde(rename = "_last_access")]
    pub last_access: u64,
    #[serde(rename = "_file_key")]
    pub file_key: String,
    #[serde(rename = "_node_id")]
    pub node_id: String,
    #[serde(rename = "_version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CacheEntry {
    pub fn new(payload: serde_json::Value, file_key: &str, node_id: &str, version: Option<String>) -> Self {
        let now = now_secs();
        Self {
            payload,
            cached_at: now,
            last_access: now,
            file_key: file_key.to_string(),
            node_id: node_id.to_string(),
            version,
        }
    }

    pub fn touch(&mut self) {
        self.last_access = now_secs();
    }

    pub fn age_secs(&self) -> u64 {
        now_secs().saturating_sub(self.cached_at)
    }

    pub fn is_expired(&self, ttl_secs: u64) -> bool {
        self.age_secs() > ttl_secs
    }

    pub fn approx_byte_size(&self) -> u64 {
        serde_json::to_vec(self).map(|v| v.len() as u64).unwrap_or(0)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
