//! Session key-value storage for the carried inventory.
//!
//! The browser build backs this with `localStorage`; the console uses a JSON
//! file and tests use [`MemoryStore`]. Nothing stored here is load-bearing:
//! any read problem means "no saved state" and any write problem is logged.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use bevy::prelude::Resource;
use thiserror::Error;
use tracing::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError>;
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write store file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode store contents: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.entries.insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// A flat JSON object on disk, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(
                        target: "geocache::persistence",
                        path = %path.display(),
                        error = %err,
                        "store.corrupt=ignored"
                    );
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(
                    target: "geocache::persistence",
                    path = %path.display(),
                    error = %err,
                    "store.read_failed"
                );
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        let encoded = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, encoded).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// The persistence adapter owned by a session.
#[derive(Resource)]
pub struct SessionStore {
    store: Box<dyn KeyValueStore>,
    inventory_key: String,
}

impl SessionStore {
    pub fn new(store: Box<dyn KeyValueStore>, inventory_key: impl Into<String>) -> Self {
        Self {
            store,
            inventory_key: inventory_key.into(),
        }
    }

    pub fn inventory_key(&self) -> &str {
        &self.inventory_key
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }

    /// Saved inventory, if there is a usable one.
    pub fn restore_inventory(&self) -> Option<u32> {
        let raw = self.store.get(&self.inventory_key)?;
        match parse_inventory(&raw) {
            Some(value) => Some(value),
            None => {
                warn!(
                    target: "geocache::persistence",
                    key = %self.inventory_key,
                    raw = %raw,
                    "inventory.restore_rejected"
                );
                None
            }
        }
    }

    pub fn persist_inventory(&mut self, value: u32) -> Result<(), PersistenceError> {
        self.store.set(&self.inventory_key, value.to_string())
    }
}

/// A non-negative integer that is either 0 or a power of two.
pub fn parse_inventory(raw: &str) -> Option<u32> {
    let value = raw.trim().parse::<u32>().ok()?;
    (value == 0 || value.is_power_of_two()).then_some(value)
}
