//! # Worker loop.
//!
//! One [`Worker`] is one generator instance on one OS thread:
//!
//! ```text
//! spawn() ──► thread "genvisor-worker-N"
//!               ├─► factory.load()            (expensive; Err → LoadFailed)
//!               ├─► send Ready
//!               └─► loop {
//!                     inbound.recv()           (blocks between jobs)
//!                       ├─ Shutdown ─► return Shutdown
//!                       ├─ closed   ─► return Disconnected
//!                       └─ Job      ─► send Dispatched
//!                                      generate(request, on_step)
//!                                        on_step ─► throttle ─► send Status::progress
//!                                      Ok        ─► send Status::completed
//!                                      Failed    ─► send Status::failed, continue
//!                                      Fatal     ─► return Fatal (no terminal status)
//!                   }
//! ```
//!
//! ## Rules
//! - Exactly one job is active at a time; the next item is read only after the previous
//!   job produced its terminal status (or the worker is gone).
//! - The sentinel is only seen between jobs; a running job is never interrupted.
//! - A panic inside the generator unwinds the thread; the supervisor notices the dead
//!   thread and starts a replacement.

use std::io;
use std::sync::PoisonError;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::GenerateError;
use crate::jobs::{Job, Status};
use crate::worker::generator::{GenerationRequest, Generator, GeneratorRef};
use crate::worker::message::{InboundQueue, OutboundSender, WorkItem, WorkerMessage};
use crate::worker::throttle::ProgressThrottle;

/// Why a worker thread returned.
#[derive(Debug)]
pub(crate) enum WorkerExit {
    /// Read the shutdown sentinel.
    Shutdown,
    /// The inbound queue was closed (scheduler dropped).
    Disconnected,
    /// `GeneratorFactory::load` failed.
    LoadFailed(GenerateError),
    /// The generator reported an unrecoverable fault.
    Fatal(GenerateError),
}

pub(crate) struct Worker {
    pub(crate) instance: u64,
    pub(crate) factory: GeneratorRef,
    pub(crate) inbound: InboundQueue,
    pub(crate) outbound: OutboundSender,
    pub(crate) default_seed: u64,
    pub(crate) progress_throttle: Duration,
}

impl Worker {
    /// Starts the worker on a new named thread.
    pub(crate) fn spawn(self) -> io::Result<thread::JoinHandle<WorkerExit>> {
        thread::Builder::new()
            .name(format!("genvisor-worker-{}", self.instance))
            .spawn(move || self.run())
    }

    fn run(self) -> WorkerExit {
        tracing::info!(
            worker = self.instance,
            backend = self.factory.name(),
            "initializing generator, this may take a while"
        );
        let mut generator = match self.factory.load() {
            Ok(g) => g,
            Err(e) => {
                tracing::error!(worker = self.instance, error = %e, "generator failed to load");
                return WorkerExit::LoadFailed(e);
            }
        };
        let _ = self.outbound.send(WorkerMessage::Ready {
            worker: self.instance,
        });
        tracing::debug!(worker = self.instance, "generator ready");

        loop {
            match self.next_item() {
                None => return WorkerExit::Disconnected,
                Some(WorkItem::Shutdown) => {
                    tracing::debug!(worker = self.instance, "shutdown sentinel received");
                    return WorkerExit::Shutdown;
                }
                Some(WorkItem::Job(job)) => {
                    if let Err(e) = self.process(generator.as_mut(), &job) {
                        return WorkerExit::Fatal(e);
                    }
                }
            }
        }
    }

    fn next_item(&self) -> Option<WorkItem> {
        // A predecessor can only have died while blocked here, never mid-update, so a
        // poisoned lock still guards a consistent receiver.
        let mut rx = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        rx.blocking_recv()
    }

    /// Runs one job. Returns `Err` only for fatal faults.
    fn process(&self, generator: &mut dyn Generator, job: &Job) -> Result<(), GenerateError> {
        let id = job.id();
        let _ = self.outbound.send(WorkerMessage::Dispatched {
            worker: self.instance,
            job: id,
        });
        tracing::debug!(worker = self.instance, job = %job, "dispatched");

        let request = GenerationRequest::for_job(job, self.default_seed);
        let steps = job.steps() as f32;
        let mut throttle = ProgressThrottle::new(self.progress_throttle);
        let mut last_emitted = 0.0f32;
        let outbound = &self.outbound;

        let mut on_step = |step: u32| {
            let fraction = (step as f32 / steps).clamp(0.0, 1.0);
            if fraction < last_emitted {
                return;
            }
            if throttle.admit(Instant::now()) {
                last_emitted = fraction;
                let _ = outbound.send(WorkerMessage::Status(Status::progress(id, fraction)));
            }
        };

        match generator.generate(&request, &mut on_step) {
            Ok(artifacts) => {
                let artifacts: Vec<_> = artifacts.into_iter().filter(|a| !a.is_blank()).collect();
                tracing::debug!(worker = self.instance, job = %id, artifacts = artifacts.len(), "completed");
                let _ = self
                    .outbound
                    .send(WorkerMessage::Status(Status::completed(id, artifacts)));
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                tracing::error!(worker = self.instance, job = %id, error = %e, "fatal generator fault");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(worker = self.instance, job = %id, error = %e, "job failed");
                let _ = self.outbound.send(WorkerMessage::Status(Status::failed(id)));
                Ok(())
            }
        }
    }
}
