//! In-memory [`InventorySource`] used by tests, benches and hosts without a
//! platform inventory.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::InventoryError;
use crate::inventory::{InventoryEntry, InventorySource};
use crate::model::app_record::IconHandle;

#[derive(Debug, Default)]
pub struct MemoryInventory {
    entries: RwLock<Vec<InventoryEntry>>,
    unavailable: RwLock<Option<String>>,
    resolve_calls: AtomicUsize,
}

impl MemoryInventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entries(entries: Vec<InventoryEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            ..Self::default()
        }
    }

    /// Complete entry with a synthetic icon and main entry.
    #[must_use]
    pub fn entry(display_name: &str, package_id: &str) -> InventoryEntry {
        InventoryEntry {
            package_id: package_id.to_string(),
            display_name: display_name.to_string(),
            icon: IconHandle::new(format!("icon://{package_id}")),
            version_name: Some("1.0".to_string()),
            version_code: 1,
            main_entry: Some(format!("{package_id}.MainActivity")),
        }
    }

    /// Add or replace the entry for its package id.
    pub fn install(&self, entry: InventoryEntry) {
        let mut entries = self.entries.write();
        entries.retain(|e| e.package_id != entry.package_id);
        entries.push(entry);
    }

    pub fn uninstall(&self, package_id: &str) {
        self.entries.write().retain(|e| e.package_id != package_id);
    }

    /// Make every call fail with [`InventoryError::Unavailable`].
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *self.unavailable.write() = reason.map(str::to_string);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), InventoryError> {
        match self.unavailable.read().as_ref() {
            Some(reason) => Err(InventoryError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl InventorySource for MemoryInventory {
    fn enumerate_launchable(&self) -> Result<Vec<InventoryEntry>, InventoryError> {
        self.check_available()?;
        Ok(self.entries.read().clone())
    }

    fn resolve(&self, package_id: &str) -> Result<Option<InventoryEntry>, InventoryError> {
        self.resolve_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.package_id == package_id)
            .cloned())
    }
}
