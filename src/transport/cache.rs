//! Short-lived memory of whether the persistent channel was last usable.
//!
//! Notes:
//! - A `false` verdict suppresses primary attempts only until `last_checked_at + ttl`.
//! - Unknown, available, or stale state always allows an attempt.
//! - Readers may see a value a few milliseconds old; the TTL makes that harmless.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default time a "down" verdict stays authoritative.
pub const DEFAULT_AVAILABILITY_TTL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub last_checked_at: Option<Instant>,
    pub available: bool,
    pub ttl: Duration,
}

#[derive(Debug)]
pub struct ConnectionAvailabilityCache {
    state: Mutex<ConnectionState>,
}

impl Default for ConnectionAvailabilityCache {
    fn default() -> Self {
        Self::new(DEFAULT_AVAILABILITY_TTL)
    }
}

impl ConnectionAvailabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Mutex::new(ConnectionState {
                last_checked_at: None,
                available: false,
                ttl,
            }),
        }
    }

    pub fn should_attempt_primary(&self) -> bool {
        self.should_attempt_primary_at(Instant::now())
    }

    pub fn should_attempt_primary_at(&self, now: Instant) -> bool {
        let state = self.snapshot();
        match state.last_checked_at {
            None => true,
            Some(_) if state.available => true,
            Some(at) => now.saturating_duration_since(at) >= state.ttl,
        }
    }

    pub fn record_result(&self, available: bool) {
        self.record_result_at(available, Instant::now());
    }

    pub fn record_result_at(&self, available: bool, at: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.last_checked_at = Some(at);
        state.available = available;
        trace!(available, "connection availability recorded");
    }

    pub fn snapshot(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
