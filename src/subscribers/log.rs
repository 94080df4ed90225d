//! # LogWriter - runtime events as `tracing` records
//!
//! Maps each [`EventKind`] to a structured record under the `genvisor::events` target.
//! Install any `tracing` subscriber (e.g. `tracing-subscriber`'s fmt layer) to see them.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO genvisor::events: job-queued job=5b0c… position=1
//! WARN genvisor::events: worker-crashed worker=1 reason="generator panicked"
//! INFO genvisor::events: restart-scheduled attempt=1 delay_ms=100
//! WARN genvisor::events: job-abandoned job=5b0c… worker=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let kind = e.kind.as_str();
        let job = e.job.map(|j| j.to_string());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::JobQueued => {
                tracing::info!(target: "genvisor::events", job = job.as_deref(), position = e.position, "{kind}");
            }
            EventKind::JobDispatched | EventKind::JobCompleted => {
                tracing::info!(target: "genvisor::events", job = job.as_deref(), worker = e.worker, "{kind}");
            }
            EventKind::JobFailed => {
                tracing::warn!(target: "genvisor::events", job = job.as_deref(), worker = e.worker, "{kind}");
            }
            EventKind::JobAbandoned => {
                tracing::warn!(target: "genvisor::events", job = job.as_deref(), worker = e.worker, "{kind}");
            }
            EventKind::WorkerStarting | EventKind::WorkerReady | EventKind::WorkerStopped => {
                tracing::info!(target: "genvisor::events", worker = e.worker, "{kind}");
            }
            EventKind::WorkerCrashed => {
                tracing::warn!(target: "genvisor::events", worker = e.worker, reason, "{kind}");
            }
            EventKind::RestartScheduled => {
                tracing::info!(
                    target: "genvisor::events",
                    attempt = e.attempt,
                    delay_ms = e.delay_ms,
                    reason,
                    "{kind}"
                );
            }
            EventKind::WorkerExhausted => {
                tracing::error!(target: "genvisor::events", reason, "{kind}");
            }
            EventKind::ShutdownRequested | EventKind::RouterStopped => {
                tracing::info!(target: "genvisor::events", "{kind}");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "genvisor::events", reason, "{kind}");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "genvisor::events", reason, "{kind}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
