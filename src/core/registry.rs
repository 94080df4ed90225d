//! # Subscription registry.
//!
//! Maps each outstanding job to the channel feeding its [`StatusStream`](crate::StatusStream)
//! and counts how many jobs are outstanding (queued + in flight).
//!
//! ```text
//! submit ──► register(id, enqueue) ──► position = outstanding; outstanding += 1
//!
//! Router:
//!   progress   ──► deliver(status)      ──► owner only
//!   terminal   ──► complete(status)     ──► owner, remove owner, outstanding -= 1,
//!                                           PositionAdvanced ──► everyone else
//!   worker died ─► abandon(id)          ──► outstanding -= 1,
//!                                           PositionAdvanced ──► everyone except id
//! ```
//!
//! ## Rules
//! - Registration and the inbound enqueue happen under the write lock, so positions
//!   follow submission order exactly.
//! - `complete` removes the subscription and notifies the others in one critical
//!   section: no subscriber can see a decrement before the owner got its terminal status.
//! - Subscriber channels are unbounded; a caller that stopped reading never blocks
//!   the router.
//! - An abandoned job keeps its subscription (it never gets a terminal status).

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};

use crate::error::SchedulerError;
use crate::jobs::{JobId, Status};

/// Item pushed into a job's subscription channel.
#[derive(Debug)]
pub(crate) enum Delivery {
    Status(Status),
    /// A job ahead of this one left the queue.
    PositionAdvanced,
}

#[derive(Default)]
struct Inner {
    subs: HashMap<JobId, mpsc::UnboundedSender<Delivery>>,
    outstanding: usize,
}

impl Inner {
    fn advance_all_except(&self, id: JobId) {
        for (other, tx) in &self.subs {
            if *other != id {
                let _ = tx.send(Delivery::PositionAdvanced);
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    inner: RwLock<Inner>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `id` and runs `enqueue` in the same critical section.
    ///
    /// Returns the number of jobs ahead and the receiving half of the subscription. If
    /// `enqueue` fails nothing is registered.
    pub(crate) async fn register<F>(
        &self,
        id: JobId,
        enqueue: F,
    ) -> Result<(usize, mpsc::UnboundedReceiver<Delivery>), SchedulerError>
    where
        F: FnOnce() -> Result<(), SchedulerError>,
    {
        let mut inner = self.inner.write().await;
        enqueue()?;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.subs.insert(id, tx);
        let position = inner.outstanding;
        inner.outstanding += 1;
        Ok((position, rx))
    }

    /// Runs `f` while no registration can happen.
    pub(crate) async fn fence<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.write().await;
        f()
    }

    /// Delivers a non-terminal status to its owner. Returns `false` if nobody listens.
    pub(crate) async fn deliver(&self, status: Status) -> bool {
        let inner = self.inner.read().await;
        match inner.subs.get(&status.job_id()) {
            Some(tx) => tx.send(Delivery::Status(status)).is_ok(),
            None => false,
        }
    }

    /// Delivers a terminal status, retires the subscription and advances everyone else.
    ///
    /// Returns `false` if the job had no subscription.
    pub(crate) async fn complete(&self, status: Status) -> bool {
        let id = status.job_id();
        let mut inner = self.inner.write().await;

        let found = match inner.subs.remove(&id) {
            Some(tx) => {
                let _ = tx.send(Delivery::Status(status));
                true
            }
            None => false,
        };
        inner.outstanding = inner.outstanding.saturating_sub(1);
        inner.advance_all_except(id);
        found
    }

    /// Accounts for a job lost with its worker. The job's own subscription stays.
    pub(crate) async fn abandon(&self, id: JobId) {
        let mut inner = self.inner.write().await;
        inner.outstanding = inner.outstanding.saturating_sub(1);
        inner.advance_all_except(id);
    }

    /// Drops every subscription; open streams end with `Closed`.
    pub(crate) async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        inner.outstanding = 0;
        let n = inner.subs.len();
        inner.subs.clear();
        n
    }

    pub(crate) async fn outstanding(&self) -> usize {
        self.inner.read().await.outstanding
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.subs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Artifact;

    async fn register(reg: &SubscriptionRegistry) -> (JobId, usize, mpsc::UnboundedReceiver<Delivery>) {
        let id = JobId::new();
        let (pos, rx) = reg.register(id, || Ok(())).await.unwrap();
        (id, pos, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Delivery>) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Ok(d) = rx.try_recv() {
            out.push(d);
        }
        out
    }

    #[tokio::test]
    async fn test_positions_follow_registration_order() {
        let reg = SubscriptionRegistry::new();
        for expected in 0..5 {
            let (_, pos, _rx) = register(&reg).await;
            assert_eq!(pos, expected);
        }
        assert_eq!(reg.outstanding().await, 5);
    }

    #[tokio::test]
    async fn test_failed_enqueue_registers_nothing() {
        let reg = SubscriptionRegistry::new();
        let err = reg
            .register(JobId::new(), || Err(SchedulerError::ShuttingDown))
            .await
            .unwrap_err();

        assert!(matches!(err, SchedulerError::ShuttingDown));
        assert_eq!(reg.outstanding().await, 0);
        assert_eq!(reg.len().await, 0);
    }

    #[tokio::test]
    async fn test_complete_notifies_owner_then_advances_others_once() {
        let reg = SubscriptionRegistry::new();
        let (a, _, mut rx_a) = register(&reg).await;
        let (_, _, mut rx_b) = register(&reg).await;
        let (_, _, mut rx_c) = register(&reg).await;

        assert!(reg.complete(Status::completed(a, vec![Artifact::new(vec![1])])).await);

        let owner = drain(&mut rx_a);
        assert_eq!(owner.len(), 1);
        assert!(matches!(&owner[0], Delivery::Status(s) if s.is_terminal()));
        assert!(rx_a.recv().await.is_none(), "owner channel closed after removal");

        for rx in [&mut rx_b, &mut rx_c] {
            let got = drain(rx);
            assert_eq!(got.len(), 1);
            assert!(matches!(got[0], Delivery::PositionAdvanced));
        }
        assert_eq!(reg.outstanding().await, 2);
        assert_eq!(reg.len().await, 2);
    }

    #[tokio::test]
    async fn test_deliver_reaches_owner_only() {
        let reg = SubscriptionRegistry::new();
        let (a, _, mut rx_a) = register(&reg).await;
        let (_, _, mut rx_b) = register(&reg).await;

        assert!(reg.deliver(Status::progress(a, 0.5)).await);
        assert_eq!(drain(&mut rx_a).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
        assert!(!reg.deliver(Status::progress(JobId::new(), 0.5)).await);
    }

    #[tokio::test]
    async fn test_abandon_keeps_orphan_subscription() {
        let reg = SubscriptionRegistry::new();
        let (a, _, mut rx_a) = register(&reg).await;
        let (_, _, mut rx_b) = register(&reg).await;

        reg.abandon(a).await;

        assert!(drain(&mut rx_a).is_empty());
        assert!(matches!(drain(&mut rx_b).as_slice(), [Delivery::PositionAdvanced]));
        assert_eq!(reg.outstanding().await, 1);
        assert_eq!(reg.len().await, 2);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_block_completion() {
        let reg = SubscriptionRegistry::new();
        let (a, _, rx_a) = register(&reg).await;
        let (_, _, mut rx_b) = register(&reg).await;
        drop(rx_a);

        assert!(!reg.deliver(Status::progress(a, 0.1)).await);
        assert!(reg.complete(Status::failed(a)).await);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn test_clear_closes_streams() {
        let reg = SubscriptionRegistry::new();
        let (_, _, mut rx) = register(&reg).await;
        assert_eq!(reg.clear().await, 1);
        assert!(rx.recv().await.is_none());
        assert_eq!(reg.outstanding().await, 0);
    }
}
