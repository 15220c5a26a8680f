//! Commands accepted by the registry worker.

use compact_str::CompactString;
use tokio::sync::oneshot;

/// Everything that mutates or reads the canonical list goes through one of
/// these, in submission order.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Full enumeration; replaces the whole list.
    Initialize,

    /// Re-resolve a package: upsert when resolvable, remove otherwise.
    Changed {
        package_id: CompactString,
        /// Upstream classification only; does not change the effect.
        is_add: bool,
    },

    Removed {
        package_id: CompactString,
    },

    /// Debounced search; an empty query yields the full list.
    Search {
        query: CompactString,
    },

    /// Acknowledged once every earlier command has been applied.
    Barrier(oneshot::Sender<()>),

    Shutdown,
}

impl RegistryCommand {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Changed { .. } => "changed",
            Self::Removed { .. } => "removed",
            Self::Search { .. } => "search",
            Self::Barrier(_) => "barrier",
            Self::Shutdown => "shutdown",
        }
    }
}
