//! # Scheduler facade.
//!
//! The [`Scheduler`] is the only ingress: it turns a [`JobSpec`] into a queued job and a
//! [`StatusStream`], and owns the background pieces that serve it.
//!
//! ```text
//! submit(spec)
//!   └─► registry.register(id, enqueue) ──► inbound ──► worker thread
//!                                                         │
//!        StatusStream ◄── subscription ◄── Router ◄── outbound
//!
//! Bus ──► event listener ──► SubscriberSet ──► LogWriter / custom subscribers
//! ```
//!
//! ## Shutdown order
//! 1. mark shutting down (submit refused, no restarts)
//! 2. sentinel on the inbound queue (under the registry lock, so nothing lands behind it)
//! 3. wait for the worker thread; the running job and every job queued ahead of the
//!    sentinel finish first
//! 4. stop the router and wait for it
//! 5. close remaining subscriptions, stop the event listener
//!
//! ## Example
//! ```no_run
//! use genvisor::{
//!     Artifact, GenerateError, GenerationRequest, Generator, GeneratorFn, JobSpec, Scheduler,
//!     SchedulerConfig,
//! };
//!
//! struct Blank;
//!
//! impl Generator for Blank {
//!     fn generate(
//!         &mut self,
//!         request: &GenerationRequest<'_>,
//!         on_step: &mut dyn FnMut(u32),
//!     ) -> Result<Vec<Artifact>, GenerateError> {
//!         (0..request.steps).for_each(|s| on_step(s));
//!         Ok(vec![Artifact::new(vec![255u8; 16])])
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::builder(SchedulerConfig::default())
//!         .build(GeneratorFn::arc("blank", || Ok::<_, GenerateError>(Blank)))?;
//!
//!     let mut stream = scheduler.submit(JobSpec::new("a lighthouse at dusk")).await?;
//!     while let Some(status) = stream.next().await? {
//!         println!("{status}");
//!     }
//!
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::builder::SchedulerBuilder;
use super::registry::SubscriptionRegistry;
use super::shutdown;
use super::stream::StatusStream;
use super::supervisor::{Reaped, WorkerSupervisor};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{Job, JobSpec};
use crate::subscribers::SubscriberSet;
use crate::worker::message::WorkItem;

/// Event listener task feeding the subscriber set.
pub(crate) struct Listener {
    pub(crate) token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single-worker generation job scheduler.
pub struct Scheduler {
    pub(crate) cfg: SchedulerConfig,
    pub(crate) bus: Bus,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) supervisor: Arc<WorkerSupervisor>,
    pub(crate) inbound: mpsc::UnboundedSender<WorkItem>,
    pub(crate) runtime_token: CancellationToken,
    pub(crate) router: Mutex<Option<JoinHandle<()>>>,
    pub(crate) listener: Mutex<Option<Listener>>,
    pub(crate) shutdown_gate: tokio::sync::Mutex<()>,
    pub(crate) stopped: AtomicBool,
}

impl Scheduler {
    /// Returns a builder for configuring a scheduler.
    pub fn builder(cfg: SchedulerConfig) -> SchedulerBuilder {
        SchedulerBuilder::new(cfg)
    }

    /// Queues a job and returns the stream of its statuses.
    ///
    /// The first read of the stream returns immediately with the number of jobs ahead
    /// (queued + in flight) and progress 0.
    ///
    /// # Errors
    /// [`SchedulerError::ShuttingDown`] once shutdown has begun.
    pub async fn submit(&self, spec: JobSpec) -> Result<StatusStream, SchedulerError> {
        let job = Job::from_spec(spec, &self.cfg);
        let id = job.id();

        let (position, rx) = self
            .registry
            .register(id, || {
                if self.supervisor.is_shutting_down() {
                    return Err(SchedulerError::ShuttingDown);
                }
                self.inbound
                    .send(WorkItem::Job(job))
                    .map_err(|_| SchedulerError::Closed)
            })
            .await?;

        self.bus.publish(
            Event::new(EventKind::JobQueued)
                .with_job(id)
                .with_position(position),
        );
        Ok(StatusStream::new(id, position, rx, self.cfg.idle_wait))
    }

    /// Stops the scheduler gracefully.
    ///
    /// New submissions are refused from the moment this is called. Jobs already queued
    /// sit ahead of the stop sentinel, so the worker runs each of them to completion and
    /// this call waits for all of it. If the worker dies before reaching the sentinel it
    /// is not restarted; streams still open after the router stops (the crashed job and
    /// anything queued behind it) end with [`SchedulerError::Closed`].
    ///
    /// Idempotent; concurrent callers wait for the first one to finish.
    pub async fn shutdown(&self) {
        let _gate = self.shutdown_gate.lock().await;
        if self.stopped.load(Ordering::Acquire) {
            return;
        }

        if self.supervisor.begin_shutdown() {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.registry
            .fence(|| {
                let _ = self.inbound.send(WorkItem::Shutdown);
            })
            .await;

        match self.supervisor.join().await {
            Some(Reaped::Stopped { instance }) => {
                self.bus
                    .publish(Event::new(EventKind::WorkerStopped).with_worker(instance));
            }
            Some(Reaped::Crashed { instance, reason }) => {
                self.bus.publish(
                    Event::new(EventKind::WorkerCrashed)
                        .with_worker(instance)
                        .with_reason(reason),
                );
            }
            None => {}
        }

        self.runtime_token.cancel();
        let router = self.router.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(router) = router {
            if let Err(e) = router.await {
                tracing::error!(error = %e, "router task failed");
            }
        }

        let abandoned = self.registry.clear().await;
        if abandoned > 0 {
            tracing::info!(abandoned, "closed open subscriptions at shutdown");
        }

        let listener = self.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(listener) = listener {
            listener.token.cancel();
            let _ = listener.handle.await;
        }
        self.stopped.store(true, Ordering::Release);
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then shuts down.
    pub async fn shutdown_on_signal(&self) -> std::io::Result<()> {
        shutdown::wait_for_shutdown_signal().await?;
        self.shutdown().await;
        Ok(())
    }

    /// `true` while a worker thread is running.
    pub fn is_worker_alive(&self) -> bool {
        self.supervisor.is_alive()
    }

    /// `true` while the router task is draining worker output.
    pub fn is_router_running(&self) -> bool {
        self.router
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Jobs submitted and not yet finished (queued + in flight).
    pub async fn queue_depth(&self) -> usize {
        self.registry.outstanding().await
    }

    /// Registered subscriptions, including ones whose stream was dropped early.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }

    /// Returns a raw receiver of runtime events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    pub(crate) fn spawn_listener(set: SubscriberSet, bus: &Bus) -> Listener {
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        let stop = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            set.shutdown().await;
        });

        Listener { token, handle }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        self.supervisor.begin_shutdown();
        let _ = self.inbound.send(WorkItem::Shutdown);
        self.runtime_token.cancel();
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.token.cancel();
        }
    }
}
