use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::registry::SubscriptionRegistry;
use super::router::Router;
use super::scheduler::Scheduler;
use super::supervisor::{WorkerSupervisor, WorkerTemplate};
use crate::{
    config::SchedulerConfig,
    error::SchedulerError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    worker::GeneratorRef,
};

/// Builder for constructing a [`Scheduler`].
pub struct SchedulerBuilder {
    cfg: SchedulerConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SchedulerConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (job intake, worker crashes, restarts, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the scheduler and starts the first worker.
    ///
    /// Must be called inside a tokio runtime. Returns as soon as the worker thread is
    /// spawned; the generator loads in the background and jobs queue up meanwhile.
    ///
    /// # Errors
    /// [`SchedulerError::WorkerSpawn`] if the worker thread could not be created.
    pub fn build(self, factory: GeneratorRef) -> Result<Scheduler, SchedulerError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let default_seed = self.cfg.default_seed.unwrap_or_else(rand::random);

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let supervisor = Arc::new(WorkerSupervisor::new(
            WorkerTemplate {
                factory,
                inbound: Arc::new(Mutex::new(inbound_rx)),
                outbound: outbound_tx,
                default_seed,
                progress_throttle: self.cfg.progress_throttle,
            },
            self.cfg.restart,
            self.cfg.backoff,
            bus.clone(),
        ));
        let registry = Arc::new(SubscriptionRegistry::new());
        let runtime_token = CancellationToken::new();

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            Some(Scheduler::spawn_listener(subs, &bus))
        };

        if let Err(e) = supervisor.start() {
            if let Some(listener) = listener {
                listener.token.cancel();
            }
            return Err(e);
        }

        let router = Router::new(
            outbound_rx,
            registry.clone(),
            supervisor.clone(),
            bus.clone(),
            self.cfg.liveness_poll,
        );
        let router = tokio::spawn(router.run(runtime_token.clone()));

        tracing::debug!(default_seed, "scheduler started");
        Ok(Scheduler {
            cfg: self.cfg,
            bus,
            registry,
            supervisor,
            inbound: inbound_tx,
            runtime_token,
            router: Mutex::new(Some(router)),
            listener: Mutex::new(listener),
            shutdown_gate: tokio::sync::Mutex::new(()),
            stopped: AtomicBool::new(false),
        })
    }
}
