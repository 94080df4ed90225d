//! # Per-job status stream.
//!
//! [`StatusStream`] is what [`Scheduler::submit`](crate::Scheduler::submit) hands back:
//! a pull interface over one job's statuses.
//!
//! ```text
//! first next()  ──► Status::queued(id, position)       (immediately, no waiting)
//! later next()  ──► wait up to idle_wait for a delivery:
//!                     Status            ─► yield (terminal ⇒ stream ends)
//!                     PositionAdvanced  ─► position -= 1, yield Status::queued(id, position)
//!                     nothing           ─► Err(Timeout), stream ends
//!                     channel closed    ─► Err(Closed),  stream ends
//! ```
//!
//! Dropping a stream does not cancel its job.

use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;

use crate::core::registry::Delivery;
use crate::error::SchedulerError;
use crate::jobs::{JobId, Status};

/// Lazy, finite sequence of [`Status`] values for one job.
#[must_use = "a stream does nothing unless read"]
pub struct StatusStream {
    job_id: JobId,
    position: usize,
    initial: Option<Status>,
    rx: mpsc::UnboundedReceiver<Delivery>,
    idle_wait: Duration,
    done: bool,
}

impl StatusStream {
    pub(crate) fn new(
        job_id: JobId,
        position: usize,
        rx: mpsc::UnboundedReceiver<Delivery>,
        idle_wait: Duration,
    ) -> Self {
        Self {
            job_id,
            position,
            initial: Some(Status::queued(job_id, position)),
            rx,
            idle_wait,
            done: false,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Jobs ahead of this one as last reported on the stream.
    pub fn position(&self) -> usize {
        self.position
    }

    /// `true` once a terminal status or an error has been returned.
    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// Returns the next status, `Ok(None)` after the terminal one.
    ///
    /// # Errors
    /// - [`SchedulerError::Timeout`] when nothing arrives within the idle-wait bound
    /// - [`SchedulerError::Closed`] when the scheduler went away
    ///
    /// Both end the stream; the job itself is unaffected.
    pub async fn next(&mut self) -> Result<Option<Status>, SchedulerError> {
        if self.done {
            return Ok(None);
        }
        if let Some(initial) = self.initial.take() {
            return Ok(Some(initial));
        }

        match tokio::time::timeout(self.idle_wait, self.rx.recv()).await {
            Err(_elapsed) => {
                self.done = true;
                Err(SchedulerError::Timeout {
                    idle: self.idle_wait,
                })
            }
            Ok(None) => {
                self.done = true;
                Err(SchedulerError::Closed)
            }
            Ok(Some(Delivery::PositionAdvanced)) => {
                self.position = self.position.saturating_sub(1);
                Ok(Some(Status::queued(self.job_id, self.position)))
            }
            Ok(Some(Delivery::Status(status))) => {
                if status.is_terminal() {
                    self.done = true;
                }
                Ok(Some(status))
            }
        }
    }

    /// Adapts this into a [`futures::Stream`]; an error is the last item.
    pub fn into_stream(self) -> impl Stream<Item = Result<Status, SchedulerError>> + Send {
        futures::stream::unfold(self, |mut s| async move {
            match s.next().await {
                Ok(Some(status)) => Some((Ok(status), s)),
                Ok(None) => None,
                Err(e) => Some((Err(e), s)),
            }
        })
    }
}

impl std::fmt::Debug for StatusStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStream")
            .field("job_id", &self.job_id)
            .field("position", &self.position)
            .field("done", &self.done)
            .finish()
    }
}
