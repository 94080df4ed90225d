//! # Delivering scheduler events to observers.
//!
//! Job and worker events are produced on the router task and the submit path, which must
//! never wait on an observer. Every observer therefore gets its own lane: a bounded queue
//! plus a drain task that calls [`Subscribe::on_event`].
//!
//! ```text
//! router / submit / supervisor ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                         ├─► lane "LogWriter" ─► drain ─► on_event
//!                                                         └─► lane "<custom>"  ─► drain ─► on_event
//! ```
//!
//! ## Rules
//! - A full or closed lane loses that event for that observer only and is reported as
//!   `SubscriberOverflow` (never for an overflow report itself).
//! - An observer sees events in bus order.
//! - A panic inside `on_event` becomes a `SubscriberPanicked` event; the lane keeps
//!   draining. Observer state behind its own locks may be left half-updated.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending side of one observer's queue.
struct Lane {
    observer: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Observers of one scheduler, each behind its own bounded lane.
///
/// Spawns tasks, so it has to be built inside a tokio runtime.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    drains: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per observer. Panic and overflow reports go to `bus`.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (lanes, drains) = observers
            .into_iter()
            .map(|observer| {
                let (queue, rx) = mpsc::channel(observer.queue_capacity().max(1));
                let lane = Lane {
                    observer: observer.name(),
                    queue,
                };
                (lane, tokio::spawn(drain(observer, rx, bus.clone())))
            })
            .unzip();

        Self { lanes, drains, bus }
    }

    /// `true` when the scheduler was built without observers.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues `event` on every lane without waiting.
    pub fn emit(&self, event: &Event) {
        if self.lanes.is_empty() {
            return;
        }
        let shared = Arc::new(event.clone());
        let reportable = event.kind != EventKind::SubscriberOverflow;

        for lane in &self.lanes {
            let dropped = match lane.queue.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if reportable {
                self.bus
                    .publish(Event::subscriber_overflow(lane.observer, dropped));
            }
        }
    }

    /// Closes every lane and waits until each observer has handled what was queued.
    pub async fn shutdown(self) {
        let Self { lanes, drains, .. } = self;
        drop(lanes);
        for drain in drains {
            let _ = drain.await;
        }
    }
}

async fn drain(observer: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(observer.on_event(&event))
            .catch_unwind()
            .await;
        if let Err(panic) = handled {
            bus.publish(Event::subscriber_panicked(
                observer.name(),
                panic_message(panic.as_ref()),
            ));
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    match (
        panic.downcast_ref::<&'static str>(),
        panic.downcast_ref::<String>(),
    ) {
        (Some(msg), _) => (*msg).to_string(),
        (None, Some(msg)) => msg.clone(),
        (None, None) => "unknown panic".to_string(),
    }
}
