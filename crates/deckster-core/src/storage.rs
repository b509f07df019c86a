//! Key-value persistence.
//!
//! Every persisted record is a JSON document stored under a fixed key. The
//! [`Storage`] handle owns the JSON encoding and the failure policy: reads
//! fall back to a default, writes queue a warning and keep going.

use crate::error::{StorageError, StorageResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

/// Storage keys for the persisted records.
pub mod keys {
    pub const DECKS: &str = "flashcards_decks";
    pub const STATS: &str = "flashcards_stats";
    pub const STUDY_OPTIONS: &str = "flashcards_study_options";
    pub const SESSION: &str = "deckster_review_state";
}

/// Synchronous string key-value backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Volatile store, used for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Store backed by a single SQLite table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> StorageResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Shared handle over a backend.
///
/// Cloning is cheap and every clone sees the same backend and the same
/// warning queue.
#[derive(Clone)]
pub struct Storage {
    backend: Rc<dyn KeyValueStore>,
    warnings: Rc<RefCell<Vec<StorageError>>>,
}

impl Storage {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Rc::new(backend),
            warnings: Rc::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Decode the record under `key`, or `None` if it is missing or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding unreadable record");
                None
            }
        }
    }

    /// Like [`Storage::load`], falling back to `default`.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.load(key).unwrap_or(default)
    }

    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.backend.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write `value`. Returns false and queues a warning on failure.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| self.backend.set(key, &raw));
        self.settle(key, result)
    }

    pub fn remove(&self, key: &str) -> bool {
        let result = self.backend.remove(key);
        self.settle(key, result)
    }

    /// Drain queued write failures.
    pub fn take_warnings(&self) -> Vec<StorageError> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }

    pub fn raw(&self, key: &str) -> StorageResult<Option<String>> {
        self.backend.get(key)
    }

    fn settle(&self, key: &str, result: StorageResult<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to write record");
                self.warnings.borrow_mut().push(err);
                false
            }
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("pending_warnings", &self.warnings.borrow().len())
            .finish_non_exhaustive()
    }
}
