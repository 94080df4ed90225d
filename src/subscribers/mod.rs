//! # Runtime event observers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] that drives
//! subscribers from the scheduler's event listener.
//!
//! ## Architecture
//! ```text
//! Scheduler / Router / Supervisor ── publish(Event) ──► Bus
//!                                                        │
//!                                              event listener (one task)
//!                                                        │
//!                                                SubscriberSet::emit
//!                                          ┌─────────────┼─────────────┐
//!                                          ▼             ▼             ▼
//!                                      LogWriter      custom        custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use genvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::WorkerCrashed {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "crash-counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
