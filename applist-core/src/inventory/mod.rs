//! `src/inventory/mod.rs`
//! ============================================================================
//! # Inventory: the consumed side of the registry
//!
//! The registry never talks to the OS directly. It consumes an
//! [`InventorySource`] (enumerate + resolve, both synchronous) and a stream of
//! [`InventoryEvent`]s produced by whatever adapter watches the platform's
//! package notifications.

pub mod memory;

pub use memory::MemoryInventory;

use compact_str::CompactString;

use crate::error::{InventoryError, RegistryError, RegistryResult};
use crate::model::app_record::IconHandle;

/// Raw metadata as reported by the inventory. Optional fields may be missing
/// for packages that are half-installed or have no launchable entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub package_id: String,
    pub display_name: String,
    pub icon: IconHandle,
    pub version_name: Option<String>,
    pub version_code: i64,
    pub main_entry: Option<String>,
}

/// Blocking access to the installed-application inventory.
///
/// Calls are made from the registry worker via `spawn_blocking`, one at a
/// time. A slow source stalls later mutations but never readers.
pub trait InventorySource: Send + Sync + 'static {
    /// All launchable applications.
    fn enumerate_launchable(&self) -> Result<Vec<InventoryEntry>, InventoryError>;

    /// Resolve one package. `Ok(None)` means it is no longer launchable.
    fn resolve(&self, package_id: &str) -> Result<Option<InventoryEntry>, InventoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryEventKind {
    Added,
    Changed,
    /// A package was reinstalled over itself.
    Replaced,
    Removed,
}

/// One package notification from the platform adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEvent {
    pub kind: InventoryEventKind,
    pub package_id: Option<CompactString>,
    /// Set when the event is one half of an update (remove + add pair).
    pub replacing: bool,
}

impl InventoryEvent {
    pub fn new<P: Into<CompactString>>(kind: InventoryEventKind, package_id: P) -> Self {
        Self {
            kind,
            package_id: Some(package_id.into()),
            replacing: false,
        }
    }

    #[must_use]
    pub fn replacing(mut self, replacing: bool) -> Self {
        self.replacing = replacing;
        self
    }

    /// Map the event onto a registry action.
    ///
    /// Removal events that are part of a replace are ignored: the matching
    /// add/replace event re-resolves the package anyway.
    pub fn classify(&self) -> RegistryResult<InventoryAction> {
        let package_id = match self.package_id.as_ref() {
            Some(id) if !id.is_empty() => id.clone(),
            _ => return Err(RegistryError::invalid_event("missing package id")),
        };

        let action = match self.kind {
            InventoryEventKind::Changed | InventoryEventKind::Replaced => InventoryAction::Changed {
                package_id,
                is_add: false,
            },
            InventoryEventKind::Added => InventoryAction::Changed {
                package_id,
                is_add: !self.replacing,
            },
            InventoryEventKind::Removed if self.replacing => InventoryAction::Ignored,
            InventoryEventKind::Removed => InventoryAction::Removed { package_id },
        };

        Ok(action)
    }
}

/// What the registry should do about an [`InventoryEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    Changed {
        package_id: CompactString,
        is_add: bool,
    },
    Removed {
        package_id: CompactString,
    },
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_added() {
        let fresh = InventoryEvent::new(InventoryEventKind::Added, "pkg.a");
        assert_eq!(
            fresh.classify().unwrap(),
            InventoryAction::Changed {
                package_id: "pkg.a".into(),
                is_add: true
            }
        );

        let reinstall = fresh.replacing(true);
        assert_eq!(
            reinstall.classify().unwrap(),
            InventoryAction::Changed {
                package_id: "pkg.a".into(),
                is_add: false
            }
        );
    }

    #[test]
    fn test_classify_changed_and_replaced() {
        for kind in [InventoryEventKind::Changed, InventoryEventKind::Replaced] {
            let action = InventoryEvent::new(kind, "pkg.b").classify().unwrap();
            assert_eq!(
                action,
                InventoryAction::Changed {
                    package_id: "pkg.b".into(),
                    is_add: false
                }
            );
        }
    }

    #[test]
    fn test_classify_removed() {
        let removed = InventoryEvent::new(InventoryEventKind::Removed, "pkg.c");
        assert_eq!(
            removed.classify().unwrap(),
            InventoryAction::Removed {
                package_id: "pkg.c".into()
            }
        );
        assert_eq!(
            removed.replacing(true).classify().unwrap(),
            InventoryAction::Ignored
        );
    }

    #[test]
    fn test_classify_rejects_missing_package_id() {
        let empty = InventoryEvent::new(InventoryEventKind::Added, "");
        assert!(matches!(
            empty.classify(),
            Err(RegistryError::InvalidEvent { .. })
        ));

        let missing = InventoryEvent {
            kind: InventoryEventKind::Removed,
            package_id: None,
            replacing: false,
        };
        assert!(missing.classify().is_err());
    }
}
