//! Tracing setup for binaries and tests.

use crate::error::{NodeBridgeError, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes a global `tracing` subscriber from an `EnvFilter` directive
/// string (e.g. `"nodebridge=debug,info"`). Safe to call more than once per
/// process in tests — a second call is reported as an error rather than a
/// panic so test harnesses can ignore it.
pub fn init_logging(directives: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(directives)
                .map_err(|e| NodeBridgeError::Parse(format!("invalid log filter: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| NodeBridgeError::Parse(format!("logging already initialized: {e}")))
}

/// Initializes logging from `RUST_LOG`, falling back to `info` if unset.
pub fn init_default_logging() -> Result<()> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    init_logging(&directives)
}
