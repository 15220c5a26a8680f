//! `src/registry/mod.rs`
//! ============================================================================
//! # AppRegistry: single-writer actor over the installed-app list
//!
//! ```text
//!  callers ──search()──► Debouncer ─┐
//!  callers ──on_inventory_*()───────┼─► command queue ─► RegistryWorker
//!  event adapter ──attach_events()──┘                        │  publish
//!                                                            ▼
//!  callers ◄──snapshot()──────────────────────────────── ArcSwap<AppSnapshot>
//!                                                            │  post
//!                                                            ▼
//!  listeners ◄──notify_all()── DeliveryContext ◄── update queue
//! ```
//!
//! `AppRegistry` is a cloneable handle. Construct it once at startup with
//! [`AppRegistry::builder`] and pass clones to whoever needs it.

pub mod command;
pub mod reconcile;
mod worker;


pub use command::RegistryCommand;
pub use worker::WorkerStats;

use std::sync::Arc;

use arc_swap::ArcSwap;
use compact_str::CompactString;
use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::inventory::{InventoryAction, InventoryEvent, InventorySource};
use crate::model::snapshot::AppSnapshot;
use crate::notify::{DeliveryContext, Listener, SubscriberSet, notification_channel};
use crate::util::debounce::Debouncer;
use worker::RegistryWorker;

const SEARCH_KEY: &str = "search";

/// Background tasks owned by one registry instance.
#[derive(Default)]
struct RegistryTasks {
    worker: Option<JoinHandle<WorkerStats>>,
    delivery: Option<JoinHandle<u64>>,
    event_pumps: Vec<JoinHandle<()>>,
}

struct Inner {
    commands: mpsc::UnboundedSender<RegistryCommand>,
    published: Arc<ArcSwap<AppSnapshot>>,
    subscribers: Arc<SubscriberSet>,
    search: Debouncer<RegistryCommand>,
    tasks: Mutex<RegistryTasks>,
}

#[derive(Clone)]
pub struct AppRegistry {
    inner: Arc<Inner>,
}

pub struct RegistryBuilder {
    source: Arc<dyn InventorySource>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    #[must_use]
    pub fn config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the worker and a delivery task on the current runtime.
    pub fn spawn(self) -> AppRegistry {
        let (registry, delivery) = self.spawn_with_manual_delivery();
        let handle = tokio::spawn(delivery.run());
        registry.inner.tasks.lock().delivery = Some(handle);
        registry
    }

    /// Spawn the worker only. The caller drives the returned
    /// [`DeliveryContext`] from the context its listeners expect.
    pub fn spawn_with_manual_delivery(self) -> (AppRegistry, DeliveryContext) {
        let subscribers = Arc::new(SubscriberSet::new());
        let published = Arc::new(ArcSwap::from_pointee(AppSnapshot::empty()));
        let (sink, delivery) = notification_channel(Arc::clone(&subscribers));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = RegistryWorker::new(self.source, Arc::clone(&published), sink);
        let worker = tokio::spawn(worker.run(self.config.worker_name.clone(), rx));

        let registry = AppRegistry {
            inner: Arc::new(Inner {
                search: Debouncer::new(self.config.search_delay, tx.clone()),
                commands: tx,
                published,
                subscribers,
                tasks: Mutex::new(RegistryTasks {
                    worker: Some(worker),
                    ..RegistryTasks::default()
                }),
            }),
        };

        info!(
            "App registry spawned (search delay {:?})",
            self.config.search_delay
        );

        if self.config.initialize_on_spawn {
            // Fresh channel, the receiver is alive.
            let _ = registry.initialize();
        }

        (registry, delivery)
    }
}

impl AppRegistry {
    pub fn builder<S: InventorySource>(source: S) -> RegistryBuilder {
        Self::builder_arc(Arc::new(source))
    }

    pub fn builder_arc(source: Arc<dyn InventorySource>) -> RegistryBuilder {
        RegistryBuilder {
            source,
            config: RegistryConfig::default(),
        }
    }

    fn send(&self, command: RegistryCommand) -> RegistryResult<()> {
        self.inner
            .commands
            .send(command)
            .map_err(|_| RegistryError::WorkerStopped)
    }

    /// Enumerate the inventory and replace the list. Runs on the worker.
    pub fn initialize(&self) -> RegistryResult<()> {
        self.send(RegistryCommand::Initialize)
    }

    /// Latest published list. Never waits for queued commands.
    #[must_use]
    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot::clone(&self.inner.published.load())
    }

    /// Re-resolve `package_id`; upsert if resolvable, remove otherwise.
    pub fn on_inventory_changed<P: Into<CompactString>>(
        &self,
        package_id: P,
        is_add: bool,
    ) -> RegistryResult<()> {
        self.send(RegistryCommand::Changed {
            package_id: package_id.into(),
            is_add,
        })
    }

    pub fn on_inventory_removed<P: Into<CompactString>>(&self, package_id: P) -> RegistryResult<()> {
        self.send(RegistryCommand::Removed {
            package_id: package_id.into(),
        })
    }

    /// Debounced search. Only the last query of a burst runs; its result is
    /// delivered to listeners like any other update.
    pub fn search<Q: Into<CompactString>>(&self, query: Q) -> RegistryResult<()> {
        if self.inner.commands.is_closed() {
            return Err(RegistryError::WorkerStopped);
        }
        let query = query.into();
        debug!("Scheduling search for '{}'", query);
        self.inner
            .search
            .submit(SEARCH_KEY, RegistryCommand::Search { query });
        Ok(())
    }

    /// Route a raw inventory event. Invalid events are rejected here and
    /// never reach the worker.
    pub fn handle_event(&self, event: &InventoryEvent) -> RegistryResult<()> {
        match event.classify() {
            Ok(InventoryAction::Changed { package_id, is_add }) => {
                self.on_inventory_changed(package_id, is_add)
            }
            Ok(InventoryAction::Removed { package_id }) => self.on_inventory_removed(package_id),
            Ok(InventoryAction::Ignored) => {
                debug!("Ignoring {:?} event (replacing)", event.kind);
                Ok(())
            }
            Err(e) => {
                warn!("Bad inventory event received: {}", e);
                Err(e)
            }
        }
    }

    /// Consume `events` until the channel closes or the registry shuts down.
    pub fn attach_events(&self, mut events: mpsc::UnboundedReceiver<InventoryEvent>) {
        let registry = self.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match registry.handle_event(&event) {
                    Err(RegistryError::WorkerStopped) => break,
                    // Already logged.
                    Err(_) | Ok(()) => {}
                }
            }
            debug!("Inventory event stream closed");
        });

        let mut tasks = self.inner.tasks.lock();
        tasks.event_pumps.retain(|p| !p.is_finished());
        tasks.event_pumps.push(pump);
    }

    /// Add a listener; duplicates are ignored. Returns `true` if added.
    pub fn subscribe(&self, listener: &Listener) -> bool {
        self.inner.subscribers.add(listener)
    }

    /// Remove a listener; absent listeners are ignored.
    pub fn unsubscribe(&self, listener: &Listener) -> bool {
        self.inner.subscribers.remove(listener)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Resolves once every command queued before this call has been applied.
    /// Pending (not yet fired) searches are not waited for.
    pub async fn settled(&self) -> RegistryResult<()> {
        let (ack, done) = oneshot::channel();
        self.send(RegistryCommand::Barrier(ack))?;
        done.await.map_err(|_| RegistryError::WorkerStopped)
    }

    /// Drop pending searches, apply queued commands, then stop the worker
    /// and wait for the delivery task to drain.
    pub async fn shutdown(&self) -> RegistryResult<WorkerStats> {
        self.inner.search.cancel_all();

        let (worker, delivery, pumps) = {
            let mut tasks = self.inner.tasks.lock();
            (
                tasks.worker.take(),
                tasks.delivery.take(),
                std::mem::take(&mut tasks.event_pumps),
            )
        };

        for pump in pumps {
            pump.abort();
        }

        let Some(worker) = worker else {
            return Err(RegistryError::WorkerStopped);
        };

        let _ = self.send(RegistryCommand::Shutdown);
        let stats = worker
            .await
            .map_err(|e| RegistryError::task_failed("registry_worker", e.to_string()))?;

        if let Some(delivery) = delivery {
            delivery
                .await
                .map_err(|e| RegistryError::task_failed("delivery", e.to_string()))?;
        }

        info!("App registry shut down: {:?}", stats);
        Ok(stats)
    }
}
