//! # Per-job progress throttle.
//!
//! A generator reports every processing step; the worker forwards at most one progress
//! update per `interval`. The first update always passes. Terminal statuses never go
//! through the throttle.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl ProgressThrottle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns `true` and records `now` if an update may be emitted at `now`.
    pub(crate) fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(prev) if now.saturating_duration_since(prev) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
