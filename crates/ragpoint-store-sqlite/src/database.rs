// crates/ragpoint-store-sqlite/src/database.rs
// ============================================================================
// Module: SQLite Database Setup
// Description: Connection settings, errors, and schema bootstrap.
// Purpose: Open SQLite files with durable pragmas and versioned schemas.
// Dependencies: rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! Both the catalog and the per-project vector stores open their databases
//! through [`open_database`]. Paths are validated before any file is
//! touched, pragmas are applied on every connection, and a `store_meta`
//! table pins the schema version so that a newer or foreign file fails
//! closed instead of being silently reused.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ragpoint_core::CatalogError;
use ragpoint_core::VectorStoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Connection tuning shared by every `SQLite` file Ragpoint opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SqliteTuning {
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for SqliteTuning {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Configuration for a single `SQLite` database file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Connection tuning.
    #[serde(flatten)]
    pub tuning: SqliteTuning,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tuning: SqliteTuning::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("already exists: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<SqliteStoreError> for VectorStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Corrupt(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Corrupt(message)
            }
            SqliteStoreError::Invalid(message)
            | SqliteStoreError::NotFound(message)
            | SqliteStoreError::Conflict(message) => Self::Invalid(message),
            SqliteStoreError::Db(message) => Self::Store(message),
        }
    }
}

impl From<SqliteStoreError> for CatalogError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            other => Self::Store(other.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Open
// ============================================================================

/// Opens a database, applies pragmas, and creates or validates its schema.
///
/// `schema` is executed once, when the file carries no schema version yet.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the path is unsafe, the file cannot be
/// opened, or the stored schema version differs from `version`.
pub fn open_database(
    config: &SqliteStoreConfig,
    version: i64,
    schema: &str,
) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let mut connection = open_connection(config)?;
    initialize_schema(&mut connection, version, schema)?;
    Ok(connection)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config.tuning)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(connection: &Connection, tuning: SqliteTuning) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", tuning.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", tuning.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(tuning.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(
    connection: &mut Connection,
    version: i64,
    schema: &str,
) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let stored: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match stored {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![version])?;
            tx.execute_batch(schema)?;
        }
        Some(value) if value == version => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
