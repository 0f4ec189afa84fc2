//! Local key/value storage backed by SQLite
//!
//! Plays the role of browser local storage: string values under string keys,
//! shared by every process that opens the same file. Changes committed by
//! another connection surface as [`StorageEvent`]s for watched keys; a
//! connection never sees events for its own writes.

use crate::error::StorageError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub type Result<T> = std::result::Result<T, StorageError>;

/// A watched key changed in another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

pub struct LocalStorage {
    conn: Connection,
    data_version: i64,
    // Last value seen for each watched key
    watched: HashMap<String, Option<String>>,
}

impl LocalStorage {
    /// Open or create storage at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        let storage = Self::init(conn)?;
        debug!(path = %path.display(), "Storage opened");
        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        let data_version = read_data_version(&conn)?;
        Ok(Self {
            conn,
            data_version,
            watched: HashMap::new(),
        })
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        self.note_own_write(key, Some(value.to_string()));
        Ok(())
    }

    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        self.note_own_write(key, None);
        Ok(())
    }

    /// Start reporting changes to `key` made by other connections
    pub fn watch(&mut self, key: &str) -> Result<()> {
        let current = self.get_item(key)?;
        self.watched.insert(key.to_string(), current);
        Ok(())
    }

    /// Events for watched keys changed by other connections since the last poll
    pub fn poll_events(&mut self) -> Result<Vec<StorageEvent>> {
        let version = read_data_version(&self.conn)?;
        if version == self.data_version {
            return Ok(Vec::new());
        }
        self.data_version = version;

        let keys: Vec<String> = self.watched.keys().cloned().collect();
        let mut events = Vec::new();
        for key in keys {
            let current = self.get_item(&key)?;
            let previous = self.watched.insert(key.clone(), current.clone()).flatten();
            if previous != current {
                debug!(key = %key, "Storage changed in another context");
                events.push(StorageEvent {
                    key,
                    old_value: previous,
                    new_value: current,
                });
            }
        }
        Ok(events)
    }

    fn note_own_write(&mut self, key: &str, value: Option<String>) {
        if let Some(seen) = self.watched.get_mut(key) {
            *seen = value;
        }
    }
}

// Changes only when *another* connection commits
fn read_data_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}
