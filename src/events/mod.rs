//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! scheduler lifecycle events (job intake and completion, worker starts, crashes,
//! restarts, shutdown).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (submit/shutdown), `Router` (deliveries, crash
//!   handling), `WorkerSupervisor` (starts/restarts), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the scheduler's listener fanning out to `SubscriberSet`, and
//!   anyone holding a receiver from `Scheduler::subscribe_events`.
//!
//! Job progress is deliberately **not** published here; it flows only through the
//! owning job's status stream.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
