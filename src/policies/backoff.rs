//! # Backoff between worker restarts.
//!
//! [`BackoffPolicy`] spaces out consecutive worker restarts so a worker that dies during
//! initialization (missing model files, device unavailable) does not spin in a hot loop.
//!
//! The delay before the restart following the `n`-th consecutive crash is
//! `first × factor^(n-1)`, clamped to `max`, with jitter applied last. The crash counter
//! is reset by the supervisor whenever a job finishes, so a worker that crashes once in
//! a while always restarts after `first`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use genvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first restart in a crash streak.
    pub first: Duration,
    /// Upper bound for any restart delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive crash (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a constant 100ms delay capped at 30s, without jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given 0-indexed restart attempt within a crash streak.
    ///
    /// Non-finite or negative intermediate values fall back to `max`.
    pub fn next(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }

    /// Delay before restarting after `crashes` consecutive crashes (`crashes >= 1`).
    #[inline]
    pub fn for_crash_streak(&self, crashes: u32) -> Duration {
        self.next(crashes.saturating_sub(1))
    }
}
