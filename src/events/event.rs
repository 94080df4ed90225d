//! # Runtime events emitted by the scheduler, router and worker supervisor.
//!
//! The [`EventKind`] enum classifies events into four groups:
//! - **Job events**: intake, dispatch and the way a job ended
//! - **Worker events**: start, readiness, crashes, restarts
//! - **Shutdown events**: sentinel sent, worker and router stopped
//! - **Subscriber events**: overflow and panics inside observers
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use genvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_worker(2)
//!     .with_attempt(1)
//!     .with_delay(Duration::from_millis(100))
//!     .with_reason("worker panicked");
//!
//! assert_eq!(ev.kind, EventKind::RestartScheduled);
//! assert_eq!(ev.delay_ms, Some(100));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::jobs::JobId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Job events ===
    /// Job accepted and placed on the inbound queue.
    ///
    /// Sets: `job`, `position` (jobs ahead at submission).
    JobQueued,

    /// Worker picked the job up.
    ///
    /// Sets: `job`, `worker`.
    JobDispatched,

    /// Job finished with a result.
    ///
    /// Sets: `job`, `worker` (when the dispatch was seen).
    JobCompleted,

    /// Job finished with an error status (contained fault).
    ///
    /// Sets: `job`, `worker` (when the dispatch was seen).
    JobFailed,

    /// Worker died while the job was in flight; no terminal status will follow.
    ///
    /// Sets: `job`, `worker`.
    JobAbandoned,

    // === Worker events ===
    /// A worker thread was spawned and is loading the generator.
    ///
    /// Sets: `worker` (instance number, 1-based).
    WorkerStarting,

    /// Generator loaded; the worker is pulling jobs.
    ///
    /// Sets: `worker`.
    WorkerReady,

    /// Worker exited without being asked to.
    ///
    /// Sets: `worker`, `reason` (panic message or fault description).
    WorkerCrashed,

    /// A replacement worker will be started after a delay.
    ///
    /// Sets: `attempt` (consecutive crashes), `delay_ms`.
    RestartScheduled,

    /// No replacement worker will be started; dispatching has stopped.
    ///
    /// Sets: `reason`.
    WorkerExhausted,

    // === Shutdown events ===
    /// Shutdown began; the sentinel is on the inbound queue.
    ShutdownRequested,

    /// Worker left its loop after reading the sentinel and was joined.
    ///
    /// Sets: `worker` (if one was running).
    WorkerStopped,

    /// Router drain loop finished.
    RouterStopped,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (`subscriber=<name> info=<panic>`).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (`subscriber=<name> reason=<full|closed>`).
    SubscriberOverflow,
}

impl EventKind {
    /// Short kebab-case name used by log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JobQueued => "job-queued",
            EventKind::JobDispatched => "job-dispatched",
            EventKind::JobCompleted => "job-completed",
            EventKind::JobFailed => "job-failed",
            EventKind::JobAbandoned => "job-abandoned",
            EventKind::WorkerStarting => "worker-starting",
            EventKind::WorkerReady => "worker-ready",
            EventKind::WorkerCrashed => "worker-crashed",
            EventKind::RestartScheduled => "restart-scheduled",
            EventKind::WorkerExhausted => "worker-exhausted",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::WorkerStopped => "worker-stopped",
            EventKind::RouterStopped => "router-stopped",
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Job the event is about.
    pub job: Option<JobId>,
    /// Worker instance number (1-based, increments on every restart).
    pub worker: Option<u64>,
    /// Queue position at submission.
    pub position: Option<usize>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Consecutive crash count.
    pub attempt: Option<u32>,
    /// Human-readable reason (panic text, fault, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            worker: None,
            position: None,
            delay_ms: None,
            attempt: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_job(mut self, job: JobId) -> Self {
        self.job = Some(job);
        self
    }

    #[inline]
    pub fn with_worker(mut self, worker: u64) -> Self {
        self.worker = Some(worker);
        self
    }

    #[inline]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
