//! twr-core: decision store for the TechWriterReview fix-review workflow.
//!
//! A reviewer walks a list of detected issues ("fixes") and accepts, rejects,
//! or annotates each one. [`store::DecisionHistoryStore`] records those
//! decisions with a bounded undo/redo log, orders fixes for next/previous
//! traversal, answers search and filter queries, computes progress
//! statistics, and saves/restores a session through a [`persist::KeyValueStore`].
//!
//! Rendering, transport, and document parsing live in the host application.

pub mod clock;
pub mod db;
pub mod error;
pub mod events;
pub mod history;
pub mod navigation;
pub mod persist;
pub mod schema;
pub mod stats;
pub mod store;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use db::SqliteStore;
pub use error::{StorageError, StoreError};
pub use events::{ChangeEvent, DecisionEvent, ListenerId, NavigateEvent, Signal};
pub use history::{History, HistoryAction, MAX_HISTORY};
pub use persist::{KeyValueStore, MemoryStore, SavedProgress};
pub use stats::{ExportData, Statistics};
pub use store::DecisionHistoryStore;
pub use types::{
    Decision, Filters, Fix, Group, NavigationMode, Severity, Status, Tier, Verdict,
};

/// Input document a host loads before calling `init`.
///
/// `groups` may be omitted.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
pub struct ReviewInput {
    pub fixes: Vec<Fix>,
    #[serde(default)]
    pub groups: Vec<Group>,
}
