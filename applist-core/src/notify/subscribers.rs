//! `subscribers.rs`
//!
//! Copy-on-write listener set. Writers swap in a new `Vec`; readers iterate
//! whatever `Vec` they loaded, so add/remove from any thread never disturbs
//! a fan-out that is already in progress.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, error, trace};

use crate::model::snapshot::AppSnapshot;

/// Listener capability. Identity is the `Arc` allocation.
pub type Listener = Arc<dyn Fn(&AppSnapshot) + Send + Sync>;

/// Wrap a closure as a [`Listener`].
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&AppSnapshot) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct SubscriberSet {
    listeners: ArcSwap<Vec<Listener>>,
}

impl SubscriberSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add `listener` unless it is already present. Returns `true` if added.
    pub fn add(&self, listener: &Listener) -> bool {
        let mut added = false;
        self.listeners.rcu(|current| {
            if current.iter().any(|l| Arc::ptr_eq(l, listener)) {
                added = false;
                Arc::clone(current)
            } else {
                added = true;
                let mut next = Vec::with_capacity(current.len() + 1);
                next.extend(current.iter().cloned());
                next.push(Arc::clone(listener));
                Arc::new(next)
            }
        });

        if !added {
            debug!("Listener already subscribed, ignoring");
        }
        added
    }

    /// Remove `listener` if present. Returns `true` if it was removed.
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            if current.iter().any(|l| Arc::ptr_eq(l, listener)) {
                removed = true;
                Arc::new(
                    current
                        .iter()
                        .filter(|l| !Arc::ptr_eq(l, listener))
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            } else {
                removed = false;
                Arc::clone(current)
            }
        });

        if !removed {
            debug!("Listener was not subscribed, ignoring");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Invoke every current listener with `snapshot`.
    ///
    /// The set is loaded once, at call time. A panicking listener is logged
    /// and skipped. Returns the number of listeners that completed.
    pub fn notify_all(&self, snapshot: &AppSnapshot) -> usize {
        let current = self.listeners.load_full();
        trace!(
            "Notifying {} listener(s) with {} record(s)",
            current.len(),
            snapshot.len()
        );

        current
            .iter()
            .filter(|listener| {
                let delivered = catch_unwind(AssertUnwindSafe(|| listener(snapshot))).is_ok();
                if !delivered {
                    error!("Listener panicked while handling an app list update");
                }
                delivered
            })
            .count()
    }
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Listener, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let l = listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (l, hits)
    }

    #[test]
    fn test_add_is_idempotent() {
        let set = SubscriberSet::new();
        let (l, hits) = counting();

        assert!(set.add(&l));
        assert!(!set.add(&l));
        assert_eq!(set.len(), 1);

        set.notify_all(&AppSnapshot::empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let set = SubscriberSet::new();
        let (present, _) = counting();
        let (absent, _) = counting();

        set.add(&present);
        assert!(!set.remove(&absent));
        assert_eq!(set.len(), 1);
        assert!(set.remove(&present));
        assert!(set.is_empty());
    }

    #[test]
    fn test_identity_not_equality() {
        let set = SubscriberSet::new();
        let (a, _) = counting();
        let b = Arc::clone(&a);

        set.add(&a);
        assert!(!set.add(&b));
        assert!(set.remove(&b));
        assert!(set.is_empty());
    }

    #[test]
    fn test_panicking_listener_does_not_stop_fanout() {
        let set = SubscriberSet::new();
        let boom = listener(|_| panic!("listener failure"));
        let (ok, hits) = counting();

        set.add(&boom);
        set.add(&ok);

        assert_eq!(set.notify_all(&AppSnapshot::empty()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mutation_during_fanout_uses_loaded_view() {
        let set = Arc::new(SubscriberSet::new());
        let (late, late_hits) = counting();

        let adder = {
            let set = Arc::clone(&set);
            let late = Arc::clone(&late);
            listener(move |_| {
                set.add(&late);
            })
        };
        set.add(&adder);

        // `late` joins mid-iteration and must not see this round.
        set.notify_all(&AppSnapshot::empty());
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        set.notify_all(&AppSnapshot::empty());
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }
}
