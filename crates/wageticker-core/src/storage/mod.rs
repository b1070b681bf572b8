mod config;
pub mod database;
pub mod migrations;
mod store;

pub use config::{AccrualConfig, Config, DefaultsConfig, DisplayConfig, StorageConfig};
pub use database::Database;
pub use store::{LoadStatus, Loaded, PersistenceStore, DEFAULT_RECORD_KEY};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::PersistenceError;

/// Returns the data directory, creating it if needed.
///
/// `WAGETICKER_DATA_DIR` wins when set. Otherwise `~/.config/wageticker/`,
/// or `~/.config/wageticker-dev/` when `WAGETICKER_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, PersistenceError> {
    let dir = match std::env::var_os("WAGETICKER_DATA_DIR") {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WAGETICKER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wageticker-dev")
            } else {
                base_dir.join("wageticker")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| PersistenceError::DataDirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Durable string storage addressed by key.
///
/// Implementations are synchronous and local. Callers must still expect
/// every call to fail.
pub trait StateBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// In-process backend for tests and dry runs. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<String, String>>,
    writes: Cell<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with one record, e.g. a legacy export.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let backend = Self::new();
        backend
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        backend
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl StateBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
