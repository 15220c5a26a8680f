//!  src/util/debounce.rs
//!  ===================================================================
//!  Keyed trailing-edge debouncer
//!
//!  • Each key holds at most one pending event; a new submit for the
//!    same key aborts the previous sleeper and restarts the delay.
//!  • Only the latest event of a burst is ever delivered.
//!  • `submit` is synchronous and may be called from any thread: sleepers
//!    are spawned on the runtime handle captured at construction.
//!  • Delivery goes into an `mpsc` sender, so the consumer sees debounced
//!    events interleaved in order with everything else it receives.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use compact_str::CompactString;
use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep_until},
};
use tracing::{debug, trace};

/// Pending state for one key.
struct Slot<T> {
    generation: u64,
    event: T,
    sleeper: JoinHandle<()>,
}

type Slots<T> = Arc<Mutex<HashMap<CompactString, Slot<T>>>>;

pub struct Debouncer<T> {
    delay: Duration,
    runtime: Handle,
    slots: Slots<T>,
    generation: AtomicU64,
    tx: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer delivering into `tx`.
    ///
    /// Must be called from inside a Tokio runtime.
    #[must_use]
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            delay,
            runtime: Handle::current(),
            slots: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            tx,
        }
    }

    /// Submit an event; supersedes any pending event for `key`.
    pub fn submit<K: Into<CompactString>>(&self, key: K, event: T) {
        let key = key.into();
        // The quiet period runs from this call, not from when the sleeper
        // first gets polled.
        let deadline = Instant::now() + self.delay;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        trace!("Debouncer received event for key: {} (gen {})", key, generation);

        // Hold the lock across spawn + insert so the sleeper cannot observe
        // the map before its own slot is in place.
        let mut slots = self.slots.lock();

        if let Some(previous) = slots.remove(&key) {
            previous.sleeper.abort();
            debug!(
                "Superseded pending event for key: {} (gen {})",
                key, previous.generation
            );
        }

        let sleeper = self.runtime.spawn({
            let slots = Arc::clone(&self.slots);
            let tx = self.tx.clone();
            let key = key.clone();

            async move {
                sleep_until(deadline).await;

                let fired = {
                    let mut slots = slots.lock();
                    match slots.get(&key) {
                        Some(slot) if slot.generation == generation => slots.remove(&key),
                        _ => None,
                    }
                };

                if let Some(slot) = fired {
                    debug!("Triggering trailing edge for key: {}", key);
                    let _ = tx.send(slot.event);
                }
            }
        });

        slots.insert(
            key,
            Slot {
                generation,
                event,
                sleeper,
            },
        );
    }

    /// Drop every pending event.
    pub fn cancel_all(&self) {
        for (_, slot) in self.slots.lock().drain() {
            slot.sleeper.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        for (_, slot) in self.slots.lock().drain() {
            slot.sleeper.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn test_burst_delivers_only_latest() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(100), tx);

        debouncer.submit("search", "a");
        debouncer.submit("search", "ab");
        debouncer.submit("search", "abc");

        assert_eq!(rx.recv().await, Some("abc"));

        advance(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_counts_from_submit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(100), tx);

        let submitted = Instant::now();
        debouncer.submit("search", 1);
        // Sleeper has not been polled yet when the clock moves.
        advance(Duration::from_millis(80)).await;

        assert_eq!(rx.recv().await, Some(1));
        let waited = submitted.elapsed();
        assert!(
            waited >= Duration::from_millis(100) && waited <= Duration::from_millis(110),
            "fired after {waited:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_restarts_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(100), tx);

        debouncer.submit("search", 1);
        advance(Duration::from_millis(80)).await;
        debouncer.submit("search", 2);
        advance(Duration::from_millis(80)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(50), tx);

        debouncer.submit("left", "l");
        debouncer.submit("right", "r");

        let mut got = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        got.sort_unstable();
        assert_eq!(got, vec!["l", "r"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(50), tx);

        debouncer.submit("search", "dropped");
        debouncer.cancel_all();

        advance(Duration::from_millis(200)).await;
        assert!(
            timeout(Duration::from_millis(10), rx.recv()).await.is_err(),
            "cancelled event must not be delivered"
        );
    }
}
