//! Key-value settings store
//!
//! Persisted preferences (theme, deferral) go through [`KeyValueStore`] so the
//! gallery can run against SQLite and tests against memory.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::error::StoreError;

/// Notification sent to subscribers after every `set`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub value: String,
}

const CHANGE_CAPACITY: usize = 32;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Receive every change made after this call
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// In-memory store, mostly for tests
#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        notify(&self.changes, key, value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

/// SQLite-backed store
///
/// The database file is created in the user's data directory:
/// - Linux: ~/.local/share/adaptive-gallery/settings.db
/// - macOS: ~/Library/Application Support/adaptive-gallery/settings.db
/// - Windows: %APPDATA%\adaptive-gallery\settings.db
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open (or create) the store in the default location
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&Self::default_path())
    }

    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Location {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;
        tracing::info!("📁 Settings store at: {}", db_path.display());
        Self::init(conn, Some(db_path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn default_path() -> PathBuf {
        let mut path = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(std::env::temp_dir);

        path.push("adaptive-gallery");
        path.push("settings.db");
        path
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                updated_at  INTEGER NOT NULL
            )",
            [],
        )?;

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            changes,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            conn.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, chrono::Utc::now().timestamp()],
            )?;
        }
        notify(&self.changes, key, value);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

fn notify(changes: &broadcast::Sender<StoreChange>, key: &str, value: &str) {
    // No subscribers is fine
    let _ = changes.send(StoreChange {
        key: key.to_string(),
        value: value.to_string(),
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    Light,
    #[default]
    Dark,
}

impl ThemeChoice {
    pub fn toggled(self) -> Self {
        match self {
            ThemeChoice::Light => ThemeChoice::Dark,
            ThemeChoice::Dark => ThemeChoice::Light,
        }
    }
}

/// User preferences persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub theme: ThemeChoice,
    pub defer_loading: bool,
}

impl Settings {
    const THEME: &'static str = "theme";
    const DEFER_LOADING: &'static str = "defer_loading";

    /// Read settings, using `defaults` for anything not stored yet
    pub fn load(store: &dyn KeyValueStore, defaults: Settings) -> Result<Self, StoreError> {
        Ok(Self {
            theme: read(store, Self::THEME)?.unwrap_or(defaults.theme),
            defer_loading: read(store, Self::DEFER_LOADING)?.unwrap_or(defaults.defer_loading),
        })
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        write(store, Self::THEME, &self.theme)?;
        write(store, Self::DEFER_LOADING, &self.defer_loading)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeChoice::default(),
            defer_loading: true,
        }
    }
}

fn read<T: for<'de> Deserialize<'de>>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StoreError::Value {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
}

fn write<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Value {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(store: &dyn KeyValueStore) {
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("greeting", "hello").unwrap();
        store.set("greeting", "bonjour").unwrap();
        assert_eq!(store.get("greeting").unwrap().as_deref(), Some("bonjour"));
    }

    #[test]
    fn test_memory_store() {
        round_trip(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store() {
        round_trip(&SqliteStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");

        SqliteStore::open(&path).unwrap().set("theme", "\"light\"").unwrap();

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("\"light\""));
        assert_eq!(reopened.path(), Some(path.as_path()));
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut changes = store.subscribe();

        store.set("defer_loading", "false").unwrap();

        assert_eq!(
            changes.try_recv().unwrap(),
            StoreChange {
                key: "defer_loading".into(),
                value: "false".into(),
            }
        );
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_settings_defaults_and_save() {
        let store = MemoryStore::new();
        let defaults = Settings::default();
        assert_eq!(Settings::load(&store, defaults).unwrap(), defaults);

        let changed = Settings {
            theme: ThemeChoice::Light,
            defer_loading: false,
        };
        changed.save(&store).unwrap();

        assert_eq!(store.get("theme").unwrap().as_deref(), Some("\"light\""));
        assert_eq!(Settings::load(&store, defaults).unwrap(), changed);
    }

    #[test]
    fn test_corrupt_value_is_an_error() {
        let store = MemoryStore::new();
        store.set("theme", "purple").unwrap();
        assert!(matches!(
            Settings::load(&store, Settings::default()),
            Err(StoreError::Value { .. })
        ));
    }
}
