//! Action-value table persistence
//!
//! A store holds at most one table and exchanges it whole: `load_table`
//! reads the complete table or fails, `save_table` replaces the complete
//! table or leaves the previous one in place. A store with nothing persisted
//! yet loads as a zero-filled table.

pub mod sqlite;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{GreenhouseError, GreenhouseResult};
use crate::learning::ActionValueTable;

pub use sqlite::SqliteTableStore;

/// Load/store capability for the 5×5×3×3 action-value table
pub trait TableStore: Send + Sync {
    /// Persisted table, or zeros when nothing has been saved yet
    fn load_table(&self) -> GreenhouseResult<ActionValueTable>;

    /// Replace the persisted table
    fn save_table(&self, table: &ActionValueTable) -> GreenhouseResult<()>;

    /// Short human-readable location, for logs
    fn describe(&self) -> String;
}

/// Which store implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::File => "file",
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Memory => "memory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" | "blob" => Some(StoreBackend::File),
            "sqlite" | "db" => Some(StoreBackend::Sqlite),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open a store of the given kind. `path` is ignored by the memory backend.
pub fn open_store(backend: StoreBackend, path: &Path) -> GreenhouseResult<Box<dyn TableStore>> {
    let store: Box<dyn TableStore> = match backend {
        StoreBackend::File => Box::new(FileTableStore::new(path)),
        StoreBackend::Sqlite => Box::new(SqliteTableStore::open(path)?),
        StoreBackend::Memory => Box::new(MemoryTableStore::new()),
    };
    log::debug!("opened {} table store at {}", backend, store.describe());
    Ok(store)
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store; keeps the encoded blob so loads go through the same
/// validation as the persistent stores
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    blob: Mutex<Option<Vec<u8>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw bytes
    pub fn with_blob(bytes: Vec<u8>) -> Self {
        Self {
            blob: Mutex::new(Some(bytes)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blob.lock().is_none()
    }
}

impl TableStore for MemoryTableStore {
    fn load_table(&self) -> GreenhouseResult<ActionValueTable> {
        match self.blob.lock().as_deref() {
            Some(bytes) => ActionValueTable::from_bytes(bytes),
            None => Ok(ActionValueTable::zeros()),
        }
    }

    fn save_table(&self, table: &ActionValueTable) -> GreenhouseResult<()> {
        *self.blob.lock() = Some(table.to_bytes());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// File
// ============================================================================

/// Single-file blob store.
///
/// Saves write a sibling temporary file and rename it over the target, so
/// the target is either the old or the new table, never a partial write.
#[derive(Debug, Clone)]
pub struct FileTableStore {
    path: PathBuf,
}

impl FileTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "table".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TableStore for FileTableStore {
    fn load_table(&self) -> GreenhouseResult<ActionValueTable> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!(
                    "no action-value table at {}, starting from zeros",
                    self.path.display()
                );
                return Ok(ActionValueTable::zeros());
            }
            Err(e) => {
                return Err(GreenhouseError::from(e)
                    .with_context("path", self.path.display().to_string()))
            }
        };

        let table = ActionValueTable::from_bytes(&bytes).map_err(|e| {
            log::warn!("rejected action-value table at {}: {}", self.path.display(), e.message);
            e.with_context("path", self.path.display().to_string())
        })?;
        log::info!("loaded action-value table from {}", self.path.display());
        Ok(table)
    }

    fn save_table(&self, table: &ActionValueTable) -> GreenhouseResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        let written = fs::write(&tmp, table.to_bytes()).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(GreenhouseError::from(e).with_context("path", self.path.display().to_string()));
        }

        log::info!("saved action-value table to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
