//! # Status router: the single reader of the worker's outbound queue.
//!
//! ```text
//! loop {
//!   ├─► check_worker()
//!   │     └─ thread finished? ─► drain what it left on the queue
//!   │                           ├─ Stopped ─► WorkerStopped
//!   │                           └─ Crashed ─► WorkerCrashed
//!   │                                         ├─ job in flight? ─► abandon(job), JobAbandoned
//!   │                                         └─ supervisor.restart() (backoff, cancellable)
//!   └─► select {
//!         token cancelled                   ─► exit
//!         recv() within liveness_poll:
//!           Ready       ─► WorkerReady
//!           Dispatched  ─► in_flight = job, JobDispatched
//!           Status:
//!             non-terminal ─► registry.deliver()
//!             terminal     ─► registry.complete(), JobCompleted / JobFailed
//!         poll elapsed    ─► next iteration (liveness check)
//!       }
//! }
//! ```
//!
//! ## Rules
//! - Messages already queued by a dead worker are routed before its crash is handled,
//!   so a job that finished just before the crash is never reported as abandoned.
//! - A crash is detected at most one `liveness_poll` after it happened.
//! - On stop, queued worker output is still routed, so a job that finished during
//!   shutdown delivers its terminal status.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::registry::SubscriptionRegistry;
use crate::core::supervisor::{Reaped, WorkerSupervisor};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{JobId, Status};
use crate::worker::message::WorkerMessage;

pub(crate) struct Router {
    outbound: mpsc::UnboundedReceiver<WorkerMessage>,
    registry: Arc<SubscriptionRegistry>,
    supervisor: Arc<WorkerSupervisor>,
    bus: Bus,
    liveness_poll: Duration,
    in_flight: Option<(u64, JobId)>,
}

impl Router {
    pub(crate) fn new(
        outbound: mpsc::UnboundedReceiver<WorkerMessage>,
        registry: Arc<SubscriptionRegistry>,
        supervisor: Arc<WorkerSupervisor>,
        bus: Bus,
        liveness_poll: Duration,
    ) -> Self {
        Self {
            outbound,
            registry,
            supervisor,
            bus,
            liveness_poll,
            in_flight: None,
        }
    }

    /// Drains the outbound queue until `token` is cancelled.
    pub(crate) async fn run(mut self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }
            self.check_worker(&token).await;

            tokio::select! {
                _ = token.cancelled() => break,
                msg = tokio::time::timeout(self.liveness_poll, self.outbound.recv()) => match msg {
                    Ok(Some(msg)) => self.route(msg).await,
                    // Unreachable while the supervisor holds a sender.
                    Ok(None) => break,
                    Err(_elapsed) => {}
                }
            }
        }

        // The worker has been joined by now; route whatever it left behind.
        while let Ok(msg) = self.outbound.try_recv() {
            self.route(msg).await;
        }
        tracing::debug!("router stopped");
        self.bus.publish(Event::new(EventKind::RouterStopped));
    }

    async fn check_worker(&mut self, token: &CancellationToken) {
        let Some(reaped) = self.supervisor.reap() else {
            return;
        };
        while let Ok(msg) = self.outbound.try_recv() {
            self.route(msg).await;
        }

        match reaped {
            Reaped::Stopped { instance } => {
                self.bus
                    .publish(Event::new(EventKind::WorkerStopped).with_worker(instance));
            }
            Reaped::Crashed { instance, reason } => {
                tracing::warn!(worker = instance, reason = %reason, "worker died");
                self.bus.publish(
                    Event::new(EventKind::WorkerCrashed)
                        .with_worker(instance)
                        .with_reason(reason),
                );
                if let Some((worker, job)) = self.in_flight.take() {
                    self.registry.abandon(job).await;
                    self.bus.publish(
                        Event::new(EventKind::JobAbandoned)
                            .with_job(job)
                            .with_worker(worker),
                    );
                }
                self.supervisor.restart(token).await;
            }
        }
    }

    async fn route(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::Ready { worker } => {
                self.bus
                    .publish(Event::new(EventKind::WorkerReady).with_worker(worker));
            }
            WorkerMessage::Dispatched { worker, job } => {
                self.in_flight = Some((worker, job));
                self.bus.publish(
                    Event::new(EventKind::JobDispatched)
                        .with_job(job)
                        .with_worker(worker),
                );
            }
            WorkerMessage::Status(status) if status.is_terminal() => self.finish(status).await,
            WorkerMessage::Status(status) => {
                let id = status.job_id();
                if !self.registry.deliver(status).await {
                    tracing::trace!(job = %id, "progress for a job nobody listens to");
                }
            }
        }
    }

    async fn finish(&mut self, status: Status) {
        let id = status.job_id();
        let kind = if status.is_errored() {
            EventKind::JobFailed
        } else {
            EventKind::JobCompleted
        };

        let worker = self
            .in_flight
            .filter(|(_, job)| *job == id)
            .map(|(worker, _)| worker);
        if worker.is_some() {
            self.in_flight = None;
        }
        self.supervisor.reset_crash_streak();
        if !self.registry.complete(status).await {
            tracing::debug!(job = %id, "terminal status without subscription");
        }

        let mut event = Event::new(kind).with_job(id);
        if let Some(worker) = worker {
            event = event.with_worker(worker);
        }
        self.bus.publish(event);
    }
}
