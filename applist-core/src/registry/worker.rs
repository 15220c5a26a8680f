//! `worker.rs`
//!
//! The single writer. Owns the canonical list, applies commands strictly in
//! arrival order and publishes every new list before notifying, so a
//! subscriber can never observe a snapshot newer than `AppRegistry::snapshot`.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use compact_str::CompactString;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, trace, warn};

use crate::error::{InventoryError, RegistryError, RegistryResult};
use crate::inventory::{InventoryEntry, InventorySource};
use crate::model::app_record::AppRecord;
use crate::model::snapshot::AppSnapshot;
use crate::notify::sink::{NotificationSink, UpdateCause};
use crate::registry::command::RegistryCommand;
use crate::registry::reconcile;

/// Counters reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub commands: u64,
    pub notifications: u64,
    pub dropped_events: u64,
    pub searches: u64,
}

pub(crate) struct RegistryWorker {
    source: Arc<dyn InventorySource>,
    records: AppSnapshot,
    published: Arc<ArcSwap<AppSnapshot>>,
    sink: NotificationSink,
    stats: WorkerStats,
}

impl RegistryWorker {
    pub(crate) fn new(
        source: Arc<dyn InventorySource>,
        published: Arc<ArcSwap<AppSnapshot>>,
        sink: NotificationSink,
    ) -> Self {
        Self {
            source,
            records: AppSnapshot::empty(),
            published,
            sink,
            stats: WorkerStats::default(),
        }
    }

    /// Process commands until `Shutdown` or until every sender is gone.
    pub(crate) async fn run(
        mut self,
        name: String,
        mut rx: mpsc::UnboundedReceiver<RegistryCommand>,
    ) -> WorkerStats {
        let span = info_span!("registry_worker", worker = %name);

        async move {
            info!("Registry worker started");

            while let Some(command) = rx.recv().await {
                if matches!(command, RegistryCommand::Shutdown) {
                    debug!("Shutdown requested");
                    break;
                }
                self.handle(command).await;
            }

            info!(
                "Registry worker stopped: {} command(s), {} notification(s)",
                self.stats.commands, self.stats.notifications
            );
            self.stats
        }
        .instrument(span)
        .await
    }

    async fn handle(&mut self, command: RegistryCommand) {
        let started = Instant::now();
        let kind = command.name();
        self.stats.commands += 1;

        match command {
            RegistryCommand::Initialize => self.initialize().await,
            RegistryCommand::Changed { package_id, is_add } => {
                self.changed(package_id, is_add).await;
            }
            RegistryCommand::Removed { package_id } => self.removed(package_id),
            RegistryCommand::Search { query } => self.search(query),
            RegistryCommand::Barrier(ack) => {
                let _ = ack.send(());
            }
            RegistryCommand::Shutdown => {}
        }

        debug_assert!(reconcile::is_canonical(&self.records));
        trace!("Handled {} in {:?}", kind, started.elapsed());
    }

    async fn initialize(&mut self) {
        info!("Started initializing app list");

        let entries = match self.enumerate().await {
            Ok(entries) => entries,
            Err(e) => {
                // Empty on the first run; a refresh keeps what it had.
                warn!(
                    "App enumeration failed, keeping {} known app(s): {}",
                    self.records.len(),
                    e
                );
                self.notify(UpdateCause::Initialized, self.records.clone());
                return;
            }
        };

        let report = reconcile::build_sorted(entries);
        info!(
            "App list initialized: {} app(s), {} unresolvable, {} duplicate(s)",
            report.records.len(),
            report.unresolvable,
            report.duplicates
        );

        self.install(report.records);
        self.notify(UpdateCause::Initialized, self.records.clone());
    }

    async fn changed(&mut self, package_id: CompactString, is_add: bool) {
        if package_id.is_empty() {
            self.drop_invalid("change event without package id");
            return;
        }

        debug!("Updating app list for {} (added: {})", package_id, is_add);

        match self.resolve(&package_id).await {
            Ok(record) => {
                let next = reconcile::upsert(&self.records, record);
                self.install(next);
                self.notify(UpdateCause::Changed { package_id }, self.records.clone());
            }
            Err(e) => {
                if e.is_resolution_failure() {
                    debug!("{} is no longer resolvable ({}), removing", package_id, e);
                } else {
                    warn!("Treating {} as removed: {}", package_id, e);
                }
                self.removed(package_id);
            }
        }
    }

    fn removed(&mut self, package_id: CompactString) {
        if package_id.is_empty() {
            self.drop_invalid("remove event without package id");
            return;
        }

        let (next, existed) = reconcile::remove(&self.records, &package_id);
        if !existed {
            debug!("Remove for unknown package {}", package_id);
        }
        self.install(next);
        self.notify(UpdateCause::Removed { package_id }, self.records.clone());
    }

    fn search(&mut self, query: CompactString) {
        self.stats.searches += 1;

        let result = if query.is_empty() {
            self.records.clone()
        } else {
            reconcile::filter_by_name(&self.records, &query).into()
        };

        debug!("Search '{}' matched {} app(s)", query, result.len());
        self.notify(UpdateCause::Search { query }, result);
    }

    fn drop_invalid(&mut self, reason: &str) {
        self.stats.dropped_events += 1;
        warn!("Bad inventory event dropped: {}", reason);
    }

    /// Replace the owned list and publish it for `snapshot()` readers.
    fn install(&mut self, records: Vec<AppRecord>) {
        self.records = records.into();
        self.published.store(Arc::new(self.records.clone()));
    }

    fn notify(&mut self, cause: UpdateCause, snapshot: AppSnapshot) {
        if self.sink.post(cause, snapshot) {
            self.stats.notifications += 1;
        } else {
            debug!("Delivery context is gone, update discarded");
        }
    }

    async fn enumerate(&self) -> RegistryResult<Vec<InventoryEntry>> {
        let source = Arc::clone(&self.source);
        let entries = tokio::task::spawn_blocking(move || source.enumerate_launchable())
            .await
            .map_err(|e| RegistryError::task_failed("enumerate", e.to_string()))??;
        Ok(entries)
    }

    async fn resolve(&self, package_id: &CompactString) -> RegistryResult<AppRecord> {
        let source = Arc::clone(&self.source);
        let id = package_id.clone();
        let entry = tokio::task::spawn_blocking(move || source.resolve(&id))
            .await
            .map_err(|e| RegistryError::task_failed("resolve", e.to_string()))??;

        match entry {
            Some(entry) if entry.package_id == package_id.as_str() => AppRecord::try_from(entry),
            Some(entry) => Err(RegistryError::resolve_failed(
                package_id.clone(),
                format!("inventory answered for '{}'", entry.package_id),
            )),
            None => Err(InventoryError::NotFound(package_id.clone()).into()),
        }
    }
}
