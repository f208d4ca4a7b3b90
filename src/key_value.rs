//! Contains the trait and implementations for the string-keyed blob stores
//! that hold all of the application's persisted state.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, OptionalExtension};

use crate::{StorageError, db::CreateTable};

/// Handles reading and writing string values by key.
///
/// Every operation may fail with a [StorageError]. A missing key is not an
/// error: [KeyValueStore::get] returns `Ok(None)`.
pub trait KeyValueStore {
    /// Retrieve the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any existing value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Stores key-value pairs in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteKeyValueStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteKeyValueStore {
    /// Create a new store for the SQLite `connection`.
    ///
    /// The `key_value` table must already exist, see [crate::initialize_db].
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StorageError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        f(&connection).map_err(StorageError::from)
    }
}

impl KeyValueStore for SQLiteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_connection(|connection| {
            connection
                .prepare("SELECT value FROM key_value WHERE key = ?1")?
                .query_row((key,), |row| row.get(0))
                .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO key_value (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.with_connection(|connection| {
            connection.execute("DELETE FROM key_value WHERE key = ?1", (key,))
        })?;

        Ok(())
    }
}

impl CreateTable for SQLiteKeyValueStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS key_value (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
            (),
        )?;

        Ok(())
    }
}

/// Keeps key-value pairs in memory.
///
/// Clones share the same underlying map, so a ledger and a session built from
/// clones of one store see each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::LockPoisoned)?;

        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::LockPoisoned)?;
        values.insert(key.to_owned(), value.to_owned());

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::LockPoisoned)?;
        values.remove(key);

        Ok(())
    }
}
