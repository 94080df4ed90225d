//! Runtime core: the scheduler facade and the machinery behind it.
//!
//! The public API from this module is [`Scheduler`], its [`SchedulerBuilder`] and the
//! [`StatusStream`] returned by `submit`.
//!
//! Internal modules:
//! - [`registry`]: subscriptions and queue depth, position-advance broadcast;
//! - [`supervisor`]: owns the worker thread, restart policy and backoff;
//! - [`router`]: drains worker output, liveness polling, crash accounting;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod registry;
mod router;
mod scheduler;
mod shutdown;
mod stream;
mod supervisor;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
pub use stream::StatusStream;
