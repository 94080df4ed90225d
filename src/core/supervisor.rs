//! # Worker supervisor: owns the worker thread and replaces it when it dies.
//!
//! ```text
//! start() ──► Worker::spawn() ──► JoinHandle stored in `current`
//!
//! Router (every liveness poll):
//!   reap() ── thread finished? ──► join ──► Reaped::Stopped  (sentinel / channel closed)
//!                                      └──► Reaped::Crashed  (panic, fatal fault, load failure)
//!   Crashed ──► restart(token):
//!                 ├─ shutting down           ─► no-op
//!                 ├─ RestartPolicy::Never    ─► WorkerExhausted
//!                 └─ OnFailure:
//!                      ├─ streak += 1, delay = backoff.for_crash_streak(streak)
//!                      ├─ publish RestartScheduled
//!                      ├─ sleep(delay) (cancellable)
//!                      └─ start()
//!
//! Shutdown:
//!   begin_shutdown() ─► no more starts
//!   join()           ─► wait for the current thread (blocking join off the runtime)
//! ```
//!
//! ## Rules
//! - At most one worker thread exists at any time.
//! - Every instance shares the inbound queue, so a replacement continues with the jobs
//!   its predecessor never took.
//! - The crash streak resets whenever a job reaches a terminal status.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::subscribers::panic_message;
use crate::worker::GeneratorRef;
use crate::worker::message::{InboundQueue, OutboundSender};
use crate::worker::runner::{Worker, WorkerExit};

struct Running {
    instance: u64,
    handle: JoinHandle<WorkerExit>,
}

/// Outcome of a worker thread that has finished.
#[derive(Debug)]
pub(crate) enum Reaped {
    /// Left its loop on request (sentinel or closed queue).
    Stopped { instance: u64 },
    /// Died on its own.
    Crashed { instance: u64, reason: String },
}

/// Everything a worker instance is built from.
pub(crate) struct WorkerTemplate {
    pub(crate) factory: GeneratorRef,
    pub(crate) inbound: InboundQueue,
    pub(crate) outbound: OutboundSender,
    pub(crate) default_seed: u64,
    pub(crate) progress_throttle: Duration,
}

pub(crate) struct WorkerSupervisor {
    template: WorkerTemplate,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    bus: Bus,

    current: Mutex<Option<Running>>,
    instances: AtomicU64,
    crash_streak: AtomicU32,
    shutting_down: AtomicBool,
}

impl WorkerSupervisor {
    pub(crate) fn new(
        template: WorkerTemplate,
        restart: RestartPolicy,
        backoff: BackoffPolicy,
        bus: Bus,
    ) -> Self {
        Self {
            template,
            restart,
            backoff,
            bus,
            current: Mutex::new(None),
            instances: AtomicU64::new(0),
            crash_streak: AtomicU32::new(0),
            shutting_down: AtomicBool::new(false),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<Running>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawns a new worker instance unless shutdown has begun or one is already running.
    pub(crate) fn start(&self) -> Result<(), SchedulerError> {
        let mut current = self.current();
        if self.is_shutting_down() || current.is_some() {
            return Ok(());
        }

        let instance = self.instances.fetch_add(1, Ordering::Relaxed) + 1;
        let worker = Worker {
            instance,
            factory: self.template.factory.clone(),
            inbound: self.template.inbound.clone(),
            outbound: self.template.outbound.clone(),
            default_seed: self.template.default_seed,
            progress_throttle: self.template.progress_throttle,
        };
        let handle = worker.spawn()?;
        *current = Some(Running { instance, handle });
        drop(current);

        self.bus
            .publish(Event::new(EventKind::WorkerStarting).with_worker(instance));
        Ok(())
    }

    /// `true` while a worker thread exists and has not finished.
    pub(crate) fn is_alive(&self) -> bool {
        self.current()
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Takes and classifies the current worker if its thread has finished.
    pub(crate) fn reap(&self) -> Option<Reaped> {
        let running = {
            let mut current = self.current();
            if !current.as_ref().is_some_and(|r| r.handle.is_finished()) {
                return None;
            }
            current.take()?
        };
        Some(classify(running.instance, running.handle.join()))
    }

    /// Handles a crash: waits out the backoff and starts a replacement if allowed.
    pub(crate) async fn restart(&self, token: &CancellationToken) {
        if self.is_shutting_down() {
            return;
        }
        if !self.restart.allows_restart() {
            self.bus.publish(
                Event::new(EventKind::WorkerExhausted).with_reason("restart_policy_never"),
            );
            return;
        }

        let streak = self.crash_streak.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = self.backoff.for_crash_streak(streak);
        self.bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_attempt(streak)
                .with_delay(delay),
        );

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        if let Err(e) = self.start() {
            tracing::error!(error = %e, "could not start replacement worker");
            self.bus.publish(
                Event::new(EventKind::WorkerExhausted).with_reason(e.as_label()),
            );
        }
    }

    pub(crate) fn reset_crash_streak(&self) {
        self.crash_streak.store(0, Ordering::Relaxed);
    }

    /// Forbids further starts. Returns `true` for the first caller only.
    pub(crate) fn begin_shutdown(&self) -> bool {
        // Taking the lock orders this against a concurrent `start`.
        let _current = self.current();
        !self.shutting_down.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Waits for the current worker thread to exit without blocking the runtime.
    pub(crate) async fn join(&self) -> Option<Reaped> {
        let running = self.current().take()?;
        let instance = running.instance;
        match tokio::task::spawn_blocking(move || running.handle.join()).await {
            Ok(result) => Some(classify(instance, result)),
            Err(e) => Some(Reaped::Crashed {
                instance,
                reason: format!("join failed: {e}"),
            }),
        }
    }
}

fn classify(instance: u64, result: std::thread::Result<WorkerExit>) -> Reaped {
    match result {
        Ok(WorkerExit::Shutdown | WorkerExit::Disconnected) => Reaped::Stopped { instance },
        Ok(WorkerExit::LoadFailed(e)) => Reaped::Crashed {
            instance,
            reason: format!("load failed: {}", e.as_message()),
        },
        Ok(WorkerExit::Fatal(e)) => Reaped::Crashed {
            instance,
            reason: e.as_message(),
        },
        Err(panic) => Reaped::Crashed {
            instance,
            reason: format!("panic: {}", panic_message(panic.as_ref())),
        },
    }
}
