//! Messages crossing the worker boundary.
//!
//! ```text
//! Scheduler ──► inbound  (WorkItem)      ──► Worker
//! Worker    ──► outbound (WorkerMessage) ──► Router
//! ```
//! These two channels are the only shared state between the worker thread and the rest
//! of the scheduler.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::jobs::{Job, JobId, Status};

/// Item on the inbound queue.
#[derive(Debug)]
pub(crate) enum WorkItem {
    Job(Job),
    /// Shutdown sentinel: the worker exits when it reads this between jobs.
    Shutdown,
}

/// Item on the outbound queue.
#[derive(Debug)]
pub(crate) enum WorkerMessage {
    /// Generator loaded; the worker starts pulling jobs.
    Ready { worker: u64 },
    /// The worker took `job` off the inbound queue. Never forwarded to callers.
    Dispatched { worker: u64, job: JobId },
    /// Progress or terminal status for a job.
    Status(Status),
}

/// Receiving half of the inbound queue, shared by successive worker instances so a
/// replacement worker continues with the jobs its predecessor left behind.
pub(crate) type InboundQueue = Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>;

pub(crate) type OutboundSender = mpsc::UnboundedSender<WorkerMessage>;
