//! # nodebridge
//!
//! Cache, streaming RPC, task planning, and visual-verification core for a
//! design-file integration server. This crate holds no network listener of
//! its own beyond a thin admin/health HTTP surface — it's the library a
//! server binary wires an external design API client and a renderer into.
//!
//! ## Quick start
//!
//! ```rust
//! use nodebridge::cache::{CacheKey, NodeCache};
//!
//! let dir = std::env::temp_dir().join("nodebridge-doctest");
//! let cache = NodeCache::open(&dir, 1000, 64 * 1024 * 1024, 1.0)?;
//! let key = CacheKey::new("node", &["FILE123", "1:2"]);
//! cache.set(key, &"cached value".to_string(), "FILE123", "1:2", None)?;
//! assert_eq!(cache.get::<String>(key)?, Some("cached value".to_string()));
//! # Ok::<(), nodebridge::error::NodeBridgeError>(())
//! ```
//!
//! ## Layout
//!
//! - [`model`] — the parsed-node data model every other layer shares.
//! - [`codec`] — the hand-rolled binary wire format and its typed messages.
//! - [`cache`] — the two-tier content-addressed node cache.
//! - [`external`] — trait seams to the design API, renderer, and DSL emitters.
//! - [`rpc`] — the streaming node service built on those seams.
//! - [`planner`] — ROI-tiered implementation task planning.
//! - [`verify`] — the render/compare/correct visual verification loop.
//! - [`config`] / [`logging`] / [`error`] / [`health`] — the ambient stack.

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod external;
pub mod health;
pub mod logging;
pub mod model;
pub mod planner;
pub mod rpc;
pub mod verify;

pub use crate::error::{NodeBridgeError, Result};
