use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension};

use crate::error::StorageError;
use crate::persist::KeyValueStore;

/// SQLite-backed [`KeyValueStore`] for hosts that want progress to survive a
/// restart.
///
/// One row per key in the `kv_store` table. Writes use `BEGIN IMMEDIATE` so a
/// second process sharing the file waits on `busy_timeout` instead of failing.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`, configures WAL mode, and
    /// applies schema migrations.
    ///
    /// `busy_timeout` is set via the `Connection` method (not a PRAGMA string)
    /// so the setting takes effect regardless of pragma caching.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Sqlite` if the file cannot be opened, WAL
    /// configuration fails, or schema DDL fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let mut conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        crate::schema::migrate(&mut conn)?;

        tracing::debug!("opened progress database");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database. Contents vanish on drop.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Sqlite` if schema DDL fails.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let mut conn = Connection::open_in_memory()?;
        crate::schema::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Lists stored keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Sqlite` if the query fails.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv_store WHERE substr(key, 1, ?2) = ?1 ORDER BY key")?;
        let rows = stmt
            .query_map(rusqlite::params![prefix, prefix.chars().count() as i64], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
    }
}

/// Returns the current Unix timestamp in milliseconds.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key)
             DO UPDATE SET value = excluded.value,
                           updated_at = excluded.updated_at",
            rusqlite::params![key, value, now_millis()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }
}
