//! Concurrently updated registry of installed applications.
//!
//! The registry mirrors an external [`inventory::InventorySource`], serves
//! immutable snapshots and debounced name search, and pushes updates to
//! listeners through a single delivery context.

pub mod config;

pub mod error;

pub mod inventory;

pub mod logging;
pub use logging::LoggerBuilder;

pub mod model {
    pub mod app_record;
    pub use app_record::{AppRecord, IconHandle};

    pub mod snapshot;
    pub use snapshot::AppSnapshot;
}

pub mod notify;

pub mod registry;

pub mod util;

pub use config::{Config, RegistryConfig};
pub use error::{InventoryError, RegistryError, RegistryResult};
pub use inventory::{InventoryEntry, InventoryEvent, InventoryEventKind, InventorySource};
pub use model::{AppRecord, AppSnapshot, IconHandle};
pub use notify::{Listener, listener};
pub use registry::AppRegistry;
