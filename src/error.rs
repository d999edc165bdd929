//! Crate-wide error taxonomy.
//!
//! Mirrors the kinds (not necessarily the variant names) every layer of the
//! service needs to agree on: network/auth/parse failures from the external
//! design API and renderer, plus one internal-only variant for cache
//! corruption that must never escape the cache layer.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeBridgeError>;

/// Error kinds surfaced by nodebridge.
///
/// Propagation policy: within a stream, a per-node failure becomes a
/// per-frame error payload and does not abort the stream. Only fatal setup
/// errors (missing required request fields) or unary-call failures surface
/// this type directly to a caller.
#[derive(Debug, Error)]
pub enum NodeBridgeError {
    /// Transport-level failure reaching the external design API or renderer.
    #[error("network error: {0}")]
    Network(String),

    /// 401/403 from the external API. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// 404 from the external API. Never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// 429 from the external API. Retried with backoff, counted by the
    /// circuit breaker.
    #[error("rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Malformed JSON or malformed binary RPC frame. Never retried.
    #[error("parse error: {0}")]
    Parse(String),

    /// An external call exceeded its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Anything else, carrying whatever the transport gave us.
    #[error("unknown error (code {code}): {body}")]
    Unknown { code: i32, body: String },

    /// A disk cache entry failed to parse. Internal only — callers never see
    /// this; the cache converts it into a miss and deletes the entry.
    #[error("cache entry corrupted: {0}")]
    CacheCorruption(String),

    /// Ambient filesystem failures (cache directory, verification run
    /// directories) that aren't part of the taxonomy above.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A request was missing a field required for the operation.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

use std::io;

impl NodeBridgeError {
    /// True for errors that must never be returned from a public API —
    /// they are converted to `None`/cache-miss/per-frame-error instead.
    pub fn is_internal_only(&self) -> bool {
        matches!(self, NodeBridgeError::CacheCorruption(_))
    }

    /// Whether a retry is worth attempting, per the error taxonomy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NodeBridgeError::Network(_)
                | NodeBridgeError::RateLimited { .. }
                | NodeBridgeError::Timeout(_)
        )
    }

    /// Render this error as the `{"error": "..."}` DSL payload a failed
    /// per-node stream frame carries.
    pub fn as_frame_dsl(&self) -> String {
        format!("{{\"error\":{}}}", json_escape(&self.to_string()))
    }

    pub fn code(&self) -> NodeBridgeErrorCode {
        match self {
            NodeBridgeError::Network(_) => NodeBridgeErrorCode::Network,
            NodeBridgeError::Auth(_) => NodeBridgeErrorCode::Auth,
            NodeBridgeError::NotFound(_) => NodeBridgeErrorCode::NotFound,
            NodeBridgeError::RateLimited { .. } => NodeBridgeErrorCode::RateLimited,
            NodeBridgeError::Parse(_) => NodeBridgeErrorCode::Parse,
            NodeBridgeError::Timeout(_) => NodeBridgeErrorCode::Timeout,
            NodeBridgeError::Unknown { .. } => NodeBridgeErrorCode::Unknown,
            NodeBridgeError::CacheCorruption(_) => NodeBridgeErrorCode::CacheCorruption,
            NodeBridgeError::Io(_) => NodeBridgeErrorCode::Io,
            NodeBridgeError::MissingField(_) => NodeBridgeErrorCode::MissingField,
        }
    }
}

fn json_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Stable, wire-friendly discriminant for [`NodeBridgeError`], used when a
/// handler needs to report *which kind* of failure occurred without
/// serializing the full message (e.g. metrics labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeBridgeErrorCode {
    Network,
    Auth,
    NotFound,
    RateLimited,
    Parse,
    Timeout,
    Unknown,
    CacheCorruption,
    Io,
    MissingField,
}

impl fmt::Display for NodeBridgeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
