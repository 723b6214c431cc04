//! Key-value persistence boundary and the versioned save payload.
//!
//! The store never talks to a database directly. It serialises one
//! [`SavedProgress`] document per document id and hands the JSON string to a
//! [`KeyValueStore`], whose contract mirrors browser `localStorage`:
//! synchronous, string-valued, and allowed to fail on quota.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::history::History;
use crate::types::{Decision, Filters, NavigationMode};

/// Save payload format version. Anything else is ignored on restore.
pub const SAVE_VERSION: u64 = 1;

const KEY_PREFIX: &str = "twr_fix_progress_";

/// Backend key under which a document's progress is stored.
pub fn progress_key(doc_id: &str) -> String {
    format!("{KEY_PREFIX}{doc_id}")
}

/// String-valued key-value backend.
pub trait KeyValueStore: Send {
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process backend. Clones share the same map.
///
/// An optional byte quota (sum of key and value lengths) makes writes fail
/// with [`StorageError::QuotaExceeded`] the way a full browser store does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock()?;
        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Everything needed to resume a review session.
///
/// `decisions` is keyed by fix index; JSON stringifies the keys and serde
/// parses them back into integers on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProgress {
    pub version: u64,
    pub doc_id: String,
    pub session_id: String,
    pub fix_count: usize,
    pub decisions: BTreeMap<usize, Decision>,
    pub current_index: usize,
    pub navigation_mode: NavigationMode,
    pub filters: Filters,
    pub search_query: String,
    pub history: History,
    pub session_start_time: i64,
    pub saved_at: i64,
}

/// Parses a stored payload, rejecting unknown versions before the body.
///
/// The version is read from a loosely typed probe first so that a payload
/// written by a newer format is reported as incompatible rather than as a
/// decode error on some renamed field.
pub(crate) fn decode(raw: &str) -> Result<SavedProgress, crate::error::StoreError> {
    #[derive(Deserialize)]
    struct Probe {
        version: Option<u64>,
    }

    let probe: Probe = serde_json::from_str(raw)?;
    if probe.version != Some(SAVE_VERSION) {
        return Err(crate::error::StoreError::IncompatibleSaveVersion {
            found: probe.version,
        });
    }
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn memory_store_clones_share_entries() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        a.remove("k").unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn quota_rejects_oversized_write() {
        let mut store = MemoryStore::with_quota(8);
        store.set("k", "1234").unwrap();
        assert!(matches!(
            store.set("other", "12345"),
            Err(StorageError::QuotaExceeded)
        ));
        // Overwriting the same key only counts the new value.
        store.set("k", "1234567").unwrap();
    }

    #[test]
    fn decode_rejects_wrong_version() {
        let err = decode(r#"{"version": 2}"#).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IncompatibleSaveVersion { found: Some(2) }
        ));
        let err = decode(r#"{"decisions": {}}"#).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IncompatibleSaveVersion { found: None }
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(StoreError::Serialization(_))));
    }
}
