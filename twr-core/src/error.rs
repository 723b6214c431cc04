//! Error types for the fix-review store.
//!
//! Every public store operation returns `Result<_, StoreError>`. Nothing in
//! this crate panics across the store boundary, so a host can call any
//! operation without wrapping it in its own recovery logic.

/// Failure raised by a key-value persistence backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend refused the write because it is full.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// Generic backend failure with a human-readable cause.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// SQLite-specific failure from `SqliteStore`.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Refusal or failure reported by `DecisionHistoryStore`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Index outside `[0, count)`.
    #[error("fix index {index} out of range (fix count {count})")]
    InvalidIndex { index: usize, count: usize },

    /// Operation called before `init` (or after `reset`).
    #[error("review session not initialized")]
    NotInitialized,

    /// Bulk call referenced a group id that was never registered.
    #[error("unknown group {0:?}")]
    UnknownGroup(String),

    /// Navigation mode text did not name a known mode.
    #[error("unknown navigation mode {0:?}")]
    UnknownMode(String),

    /// Enumerated field (severity, tier, status) given unrecognised text.
    #[error("unknown {kind} {value:?}")]
    UnknownValue { kind: &'static str, value: String },

    /// Notes can only be attached to fixes that already carry a decision.
    #[error("fix {0} has no decision to attach a note to")]
    NoteOnPending(usize),

    /// Fix list or group definitions rejected at `init`.
    #[error("invalid review setup: {0}")]
    InvalidSetup(String),

    /// Backend I/O failed; in-memory state is unchanged.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StorageError),

    /// Save payload could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Save payload written by an incompatible format version.
    #[error("incompatible save version {found:?}")]
    IncompatibleSaveVersion { found: Option<u64> },
}

impl StoreError {
    /// Returns `true` for refusals caused by caller input rather than I/O.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        !matches!(
            self,
            StoreError::PersistenceFailure(_) | StoreError::Serialization(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
