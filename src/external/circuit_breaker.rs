//! A small, domain-specific circuit breaker for the external design API and
//! renderer adapters.
//!
//! This is deliberately hand-rolled rather than pulled from a crate: the
//! state machine is a dozen lines and specific to how this crate counts
//! failures, so a dependency would buy nothing a `match` doesn't already
//! give us.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

/// Closed → Open after `threshold` consecutive failures. Open → HalfOpen
/// once `cooldown` has elapsed, allowing exactly one trial call through.
/// A successful trial closes the breaker; a failed trial reopens it and
/// resets the cooldown clock.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at_secs: AtomicU64,
    half_open_trial_in_flight: std::sync::atomic::AtomicBool,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at_secs: AtomicU64::new(0),
            half_open_trial_in_flight: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> BreakerState {
        let failures = self.consecutive_failures.load(Ordering::Acquire);
        if failures < self.threshold {
            return BreakerState::Closed;
        }
        let opened_at = self.opened_at_secs.load(Ordering::Acquire);
        if now_secs().saturating_sub(opened_at) >= self.cooldown.as_secs() {
            BreakerState::HalfOpen
        } else {
            BreakerState::Open
        }
    }

    /// Whether a call should be allowed through right now. `HalfOpen`
    /// permits exactly one concurrent trial call.
    pub fn allow(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => !self.half_open_trial_in_flight.swap(true, Ordering::AcqRel),
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.half_open_trial_in_flight.store(false, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            self.opened_at_secs.store(now_secs(), Ordering::Release);
        }
        self.half_open_trial_in_flight.store(false, Ordering::Release);
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Exponential backoff with full jitter: `uniform(0, base * 2^attempt)`,
/// capped at `max_delay`.
pub fn backoff_delay(base: Duration, attempt: u32, max_delay: Duration) -> Duration {
    let exp = base.as_millis().saturating_mul(1u128 << attempt.min(20));
    let capped = exp.min(max_delay.as_millis());
    let jittered = if capped == 0 {
        0
    } else {
        rand::random::<u64>() % (capped as u64 + 1)
    };
    Duration::from_millis(jittered as u64)
}
