//! SQLite-backed table store
//!
//! Keeps named action-value tables in a single database file. Each row holds
//! the encoded table blob next to its declared shape; both are checked on
//! load.
//!
//! # Usage
//!
//! ```ignore
//! use fuzzy_greenhouse::store::{SqliteTableStore, TableStore};
//!
//! let store = SqliteTableStore::open("greenhouse.db")?;
//! let table = store.load_table()?; // zeros on a fresh database
//! store.save_table(&table)?;
//! ```

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};

use super::TableStore;
use crate::error::{GreenhouseError, GreenhouseResult};
use crate::learning::table::SHAPE;
use crate::learning::ActionValueTable;

const DEFAULT_TABLE: &str = "default";

/// SQLite table store
pub struct SqliteTableStore {
    /// Database connection (wrapped in Mutex for Send/Sync)
    conn: Mutex<Connection>,
    /// Row key of the table this store reads and writes
    name: String,
    location: String,
}

impl SqliteTableStore {
    /// Open a store at the given path
    ///
    /// Creates the database file if it doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> GreenhouseResult<Self> {
        let location = path.as_ref().display().to_string();
        let conn = Connection::open(path)?;
        Self::from_connection(conn, location)
    }

    /// Create an in-memory store
    ///
    /// Data is lost when the store is dropped.
    pub fn in_memory() -> GreenhouseResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> GreenhouseResult<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS action_values (
                name TEXT PRIMARY KEY,
                shape TEXT NOT NULL,      -- comma separated dimensions
                data BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            name: DEFAULT_TABLE.to_string(),
            location,
        })
    }

    /// Read and write the table stored under `name` instead of the default
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of all persisted tables
    pub fn table_names(&self) -> GreenhouseResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM action_values ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn lock(&self) -> GreenhouseResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| GreenhouseError::internal("sqlite connection mutex poisoned"))
    }

    fn shape_text() -> String {
        SHAPE
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl TableStore for SqliteTableStore {
    fn load_table(&self) -> GreenhouseResult<ActionValueTable> {
        let conn = self.lock()?;
        let row: Option<(String, Vec<u8>)> = conn
            .query_row(
                "SELECT shape, data FROM action_values WHERE name = ?1",
                params![self.name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((shape, data)) = row else {
            log::info!(
                "no action-value table '{}' in {}, starting from zeros",
                self.name,
                self.location
            );
            return Ok(ActionValueTable::zeros());
        };

        let expected = Self::shape_text();
        if shape != expected {
            log::warn!("rejected table '{}': shape {} != {}", self.name, shape, expected);
            return Err(GreenhouseError::invalid_table(format!(
                "persisted shape ({}) does not match ({})",
                shape, expected
            ))
            .with_context("table", self.name.clone()));
        }

        let table = ActionValueTable::from_bytes(&data)
            .map_err(|e| e.with_context("table", self.name.clone()))?;
        log::info!("loaded action-value table '{}' from {}", self.name, self.location);
        Ok(table)
    }

    fn save_table(&self, table: &ActionValueTable) -> GreenhouseResult<()> {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO action_values (name, shape, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![self.name, Self::shape_text(), table.to_bytes(), updated_at],
        )?;
        tx.commit()?;

        log::info!("saved action-value table '{}' to {}", self.name, self.location);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}#{}", self.location, self.name)
    }
}

impl std::fmt::Debug for SqliteTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteTableStore")
            .field("location", &self.location)
            .field("name", &self.name)
            .finish()
    }
}
