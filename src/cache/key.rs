//! Content-addressed cache keys.

use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// A 64-bit `xxh3` digest over a cache namespace and its components,
/// rendered as 16 lowercase hex digits. Not cryptographic — collisions are
/// tolerable for a cache, and `xxh3` is the fast hash the rest of the
/// ecosystem already reaches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Builds a key from a namespace tag (e.g. `"node"`, `"meta"`,
    /// `"split"`) and an ordered list of components. Order matters: the
    /// same components joined differently hash to different keys.
    pub fn new(namespace: &str, parts: &[&str]) -> Self {
        let mut buf = String::with_capacity(namespace.len() + parts.iter().map(|p| p.len() + 1).sum::<usize>());
        buf.push_str(namespace);
        for part in parts {
            buf.push('\0');
            buf.push_str(part);
        }
        Self(xxh3_64(buf.as_bytes()))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Reconstructs a key from a raw 64-bit value, e.g. one recovered from
    /// a disk cache file name.
    pub fn from_raw(bits: u64) -> Self {
        Self(bits)
    }

    /// Filesystem-safe file stem for the L2 disk tier.
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_hash_identically() {
        let a = CacheKey::new("node", &["F1", "1:2"]);
        let b = CacheKey::new("node", &["F1", "1:2"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_namespace_changes_the_key() {
        let a = CacheKey::new("node", &["F1", "1:2"]);
        let b = CacheKey::new("meta", &["F1", "1:2"]);
        assert_ne!(a, b);
    }

    #[test]
    fn component_order_matters() {
        let a = CacheKey::new("node", &["F1", "1:2"]);
        let b = CacheKey::new("node", &["1:2", "F1"]);
        assert_ne!(a, b);
    }

    #[test]
    fn to_hex_is_sixteen_lowercase_digits() {
        let k = CacheKey::new("node", &["F1", "1:2"]);
        let hex = k.to_hex();
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
