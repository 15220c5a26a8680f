//! src/error.rs
//! ============================================================================
//! # Registry error types
//!
//! Nothing in the registry core is fatal. These errors exist so that the
//! degraded paths (unresolvable packages, malformed events, a stopped worker)
//! carry enough context to be logged once and then absorbed.

use compact_str::CompactString;
use thiserror::Error;

/// Convenient alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failure reported by an [`InventorySource`](crate::inventory::InventorySource).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InventoryError {
    /// The inventory has no launchable entry for this package.
    #[error("Package not found: {0}")]
    NotFound(CompactString),

    /// The inventory service could not be queried at all.
    #[error("Inventory unavailable: {0}")]
    Unavailable(String),
}

/// Unified error type for the registry core.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Inbound inventory event that cannot be applied (e.g. empty package id).
    #[error("Invalid inventory event: {reason}")]
    InvalidEvent { reason: CompactString },

    /// Metadata for a package could not be turned into an `AppRecord`.
    #[error("Failed to resolve package '{package_id}': {reason}")]
    ResolveFailed {
        package_id: CompactString,
        reason: String,
    },

    /// Error bubbled up from the inventory source.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// The worker task has stopped and no longer accepts commands.
    #[error("Registry worker is not running")]
    WorkerStopped,

    /// A background task panicked or was aborted.
    #[error("Task {task} failed: {reason}")]
    TaskFailed { task: CompactString, reason: String },
}

impl RegistryError {
    /// Create an invalid event error
    pub fn invalid_event<S: Into<CompactString>>(reason: S) -> Self {
        Self::InvalidEvent {
            reason: reason.into(),
        }
    }

    /// Create a resolution failure for `package_id`
    pub fn resolve_failed<P, S>(package_id: P, reason: S) -> Self
    where
        P: Into<CompactString>,
        S: Into<String>,
    {
        Self::ResolveFailed {
            package_id: package_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed<T: Into<CompactString>, S: Into<String>>(task: T, reason: S) -> Self {
        Self::TaskFailed {
            task: task.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that mean "treat the package as gone".
    #[must_use]
    pub const fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolveFailed { .. } | Self::Inventory(InventoryError::NotFound(_))
        )
    }
}
