//! # genvisor
//!
//! **Genvisor** schedules long-running generation jobs (text-to-image and the like) onto
//! a single expensive worker and streams per-job progress back to whoever submitted them.
//!
//! The worker owns state that takes a long time to build (model weights, device
//! context), so exactly one instance runs at a time on its own OS thread. When it dies
//! (panic, device fault, failed load) a supervisor replaces it and the queue keeps going.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller A          caller B          caller C
//!      │ submit()        │ submit()        │ submit()
//!      ▼                 ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Scheduler (facade)                                               │
//! │  - SubscriptionRegistry (job id → stream channel, queue depth)    │
//! │  - WorkerSupervisor (one worker thread, restart policy, backoff)  │
//! │  - Router task (drains worker output, liveness polling)           │
//! │  - Bus (broadcast runtime events)                                 │
//! └──────┬───────────────────────────────────────────────▲────────────┘
//!        │ inbound: WorkItem::Job / WorkItem::Shutdown   │ outbound: WorkerMessage
//!        ▼                                               │
//! ┌──────────────────────────────┐                       │
//! │ worker thread                │  Ready / Dispatched / Status
//! │  GeneratorFactory::load()    ├───────────────────────┘
//! │  loop { Generator::generate }│
//! └──────────────────────────────┘
//!
//! Router ──► registry ──► StatusStream (per job)
//!   ├─ progress  ─► owner only
//!   └─ terminal  ─► owner, then PositionAdvanced to every other stream
//!
//! Bus ──► event listener ──► SubscriberSet ──► LogWriter / custom subscribers
//! ```
//!
//! ### Job lifecycle
//! ```text
//! submit ──► Status::queued(position)             first read, immediate
//!        ──► Status::queued(position - 1) ...     each job ahead that leaves the queue
//!        ──► Status::progress(fraction) ...       throttled, non-decreasing
//!        ──► Status::completed(artifacts)         terminal
//!          | Status::failed                       terminal (contained generator error)
//!          | (nothing; stream times out)          worker died mid-job
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Scheduling**    | Submit jobs, read their statuses, shut down gracefully.      | [`Scheduler`], [`StatusStream`]             |
//! | **Backends**      | Plug in the actual generator.                                | [`Generator`], [`GeneratorFactory`], [`GeneratorFn`] |
//! | **Jobs**          | Job description and status values.                           | [`JobSpec`], [`Status`], [`Artifact`]       |
//! | **Policies**      | Worker restart and backoff.                                  | [`RestartPolicy`], [`BackoffPolicy`]        |
//! | **Subscriber API**| Hook into runtime events (logging, alerting).                  | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for callers and backends.                       | [`SchedulerError`], [`GenerateError`]       |
//! | **Configuration** | Tunables with env overrides.                                 | [`SchedulerConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] subscriber (events → `tracing`).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use genvisor::{
//!     Artifact, GenerateError, GenerationRequest, Generator, GeneratorFn, JobSpec, Scheduler,
//!     SchedulerConfig,
//! };
//!
//! struct Stripes;
//!
//! impl Generator for Stripes {
//!     fn generate(
//!         &mut self,
//!         request: &GenerationRequest<'_>,
//!         on_step: &mut dyn FnMut(u32),
//!     ) -> Result<Vec<Artifact>, GenerateError> {
//!         for step in 0..request.steps {
//!             on_step(step);
//!         }
//!         Ok(vec![Artifact::new(vec![0xAA; 64])])
//!     }
//! }
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SchedulerConfig::default();
//!     cfg.progress_throttle = Duration::from_millis(100);
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn genvisor::Subscribe>> = vec![Arc::new(genvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn genvisor::Subscribe>> = Vec::new();
//!
//!     let scheduler = Scheduler::builder(cfg)
//!         .with_subscribers(subs)
//!         .build(GeneratorFn::arc("stripes", || Ok::<_, GenerateError>(Stripes)))?;
//!
//!     let mut stream = scheduler.submit(JobSpec::new("zebra").with_steps(4)).await?;
//!     let mut last = None;
//!     while let Some(status) = stream.next().await? {
//!         last = Some(status);
//!     }
//!     assert!(last.is_some_and(|s| s.result().is_some()));
//!
//!     scheduler.shutdown().await;
//!     assert!(!scheduler.is_worker_alive());
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod jobs;
mod policies;
mod subscribers;
mod worker;

// ---- Public re-exports ----

pub use config::{DEFAULT_GUIDANCE_SCALE, DEFAULT_STEPS, SchedulerConfig};
pub use self::core::{Scheduler, SchedulerBuilder, StatusStream};
pub use error::{ConfigError, GenerateError, SchedulerError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{Artifact, JobId, JobSpec, Status};
pub use policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use worker::{
    GenerationRequest, Generator, GeneratorFactory, GeneratorFn, GeneratorRef, SafetyMode,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
