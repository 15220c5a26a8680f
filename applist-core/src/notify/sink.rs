//! `sink.rs`
//!
//! Delivery side of the registry. The worker posts [`AppListUpdate`]s through
//! a [`NotificationSink`]; a single [`DeliveryContext`] drains them in order
//! and fans each one out to the subscribers that are registered *at delivery
//! time*.
//!
//! The delivery context is either spawned as its own task or handed to the
//! host, which drives it from its UI loop with [`DeliveryContext::drain_pending`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use compact_str::CompactString;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::model::snapshot::AppSnapshot;
use crate::notify::subscribers::SubscriberSet;

/// Why the worker produced an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCause {
    Initialized,
    Changed { package_id: CompactString },
    Removed { package_id: CompactString },
    Search { query: CompactString },
}

#[derive(Debug, Clone)]
pub struct AppListUpdate {
    pub sequence: u64,
    pub cause: UpdateCause,
    pub snapshot: AppSnapshot,
}

/// Posting half, owned by the registry worker.
#[derive(Debug)]
pub struct NotificationSink {
    tx: mpsc::UnboundedSender<AppListUpdate>,
    sequence: AtomicU64,
}

impl NotificationSink {
    /// Queue an update for delivery. Returns `false` once the delivery
    /// context is gone.
    pub fn post(&self, cause: UpdateCause, snapshot: AppSnapshot) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        trace!(
            "Posting update #{} ({:?}, {} records)",
            sequence,
            cause,
            snapshot.len()
        );
        self.tx
            .send(AppListUpdate {
                sequence,
                cause,
                snapshot,
            })
            .is_ok()
    }
}

/// Consuming half. Single-threaded, FIFO.
pub struct DeliveryContext {
    rx: mpsc::UnboundedReceiver<AppListUpdate>,
    subscribers: Arc<SubscriberSet>,
    delivered: u64,
}

/// Create a connected sink/context pair sharing `subscribers`.
#[must_use]
pub fn notification_channel(subscribers: Arc<SubscriberSet>) -> (NotificationSink, DeliveryContext) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        NotificationSink {
            tx,
            sequence: AtomicU64::new(0),
        },
        DeliveryContext {
            rx,
            subscribers,
            delivered: 0,
        },
    )
}

impl DeliveryContext {
    fn deliver(&mut self, update: &AppListUpdate) {
        let reached = self.subscribers.notify_all(&update.snapshot);
        self.delivered += 1;
        debug!(
            "Delivered update #{} ({:?}) to {} listener(s)",
            update.sequence, update.cause, reached
        );
    }

    /// Wait for and deliver the next update. `None` once the sink is gone.
    pub async fn deliver_next(&mut self) -> Option<AppListUpdate> {
        let update = self.rx.recv().await?;
        self.deliver(&update);
        Some(update)
    }

    /// Deliver everything already queued without waiting.
    pub fn drain_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(update) = self.rx.try_recv() {
            self.deliver(&update);
            count += 1;
        }
        count
    }

    /// Deliver until the sink is dropped. Returns the number of updates.
    pub async fn run(mut self) -> u64 {
        info!("Notification delivery started");
        while self.deliver_next().await.is_some() {}
        info!("Notification delivery stopped after {} update(s)", self.delivered);
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::app_record::{AppRecord, IconHandle};
    use crate::notify::subscribers::listener;
    use parking_lot::Mutex;

    fn snapshot(names: &[&str]) -> AppSnapshot {
        names
            .iter()
            .map(|n| AppRecord::new(*n, *n, IconHandle::default(), "1", 1, ".Main"))
            .collect::<Vec<_>>()
            .into()
    }

    fn recorder(subscribers: &SubscriberSet) -> (crate::notify::subscribers::Listener, Arc<Mutex<Vec<usize>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let l = listener(move |snap| sink.lock().push(snap.len()));
        subscribers.add(&l);
        (l, seen)
    }

    #[test]
    fn test_updates_delivered_in_post_order() {
        let subscribers = Arc::new(SubscriberSet::new());
        let (_l, seen) = recorder(&subscribers);
        let (sink, mut ctx) = notification_channel(Arc::clone(&subscribers));

        sink.post(UpdateCause::Initialized, snapshot(&["A"]));
        sink.post(UpdateCause::Initialized, snapshot(&["A", "B"]));
        sink.post(UpdateCause::Initialized, snapshot(&["A", "B", "C"]));

        assert_eq!(ctx.drain_pending(), 3);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(ctx.drain_pending(), 0);
    }

    #[test]
    fn test_subscribers_read_at_delivery_time() {
        let subscribers = Arc::new(SubscriberSet::new());
        let (l, seen) = recorder(&subscribers);
        let (sink, mut ctx) = notification_channel(Arc::clone(&subscribers));

        sink.post(UpdateCause::Initialized, snapshot(&["A"]));
        subscribers.remove(&l);

        assert_eq!(ctx.drain_pending(), 1);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_when_sink_dropped() {
        let subscribers = Arc::new(SubscriberSet::new());
        let (sink, ctx) = notification_channel(subscribers);
        let task = tokio::spawn(ctx.run());

        assert!(sink.post(UpdateCause::Removed { package_id: "x".into() }, AppSnapshot::empty()));
        drop(sink);

        assert_eq!(task.await.unwrap(), 1);
    }
}
