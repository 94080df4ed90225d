//! Worker restart policies.
//!
//! This module groups the knobs that control **whether** a dead worker is replaced
//! and **how long** to wait before the replacement starts.
//!
//! ## Contents
//! - [`RestartPolicy`] whether to restart a crashed worker (never / on-failure)
//! - [`BackoffPolicy`] how restart delays evolve across consecutive crashes
//! - [`JitterPolicy`]  randomization applied on top of the backoff delay
//!
//! ## Quick wiring
//! ```text
//! SchedulerConfig { restart, backoff }
//!      └─► core::supervisor::WorkerSupervisor uses:
//!           - restart to decide replace/give up
//!           - backoff.next(crashes - 1) to delay the replacement
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::OnFailure`.
//! - `BackoffPolicy::default()` → first=100ms, factor=1.0 (constant), max=30s, jitter=None.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
