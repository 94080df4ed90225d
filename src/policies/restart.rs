//! # Restart policy for the generation worker.
//!
//! [`RestartPolicy`] decides what the supervisor does when the worker thread is found dead
//! outside of a requested shutdown (panic, fatal generator fault, failed initialization).
//!
//! ```text
//! RestartPolicy::OnFailure  → worker dies → backoff → fresh worker, queue intact (default)
//! RestartPolicy::Never      → worker dies → WorkerExhausted, queued jobs wait forever
//! ```

/// Policy controlling whether a dead worker is replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the first crash stops dispatching for good.
    Never,
    /// Restart after every unexpected exit (default).
    #[default]
    OnFailure,
}

impl RestartPolicy {
    /// Returns `true` if a crashed worker should be replaced.
    #[inline]
    pub fn allows_restart(&self) -> bool {
        matches!(self, RestartPolicy::OnFailure)
    }
}
