// crates/nonprofit-locator-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Organization Store
// Description: Store configuration, scoped connections, and the zip extension.
// Purpose: Own the single database file shared by builder, loader, and resolver.
// Dependencies: nonprofit-locator-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`OrganizationStore`] owns the path and pragmas of one database file. It
//! never holds a long-lived connection: every operation asks for a scoped
//! [`Connection`] through [`OrganizationStore::connection`], which applies the
//! configured pragmas and registers the `clean_zip` scalar function so stored
//! and caller-supplied zips are compared through the same truncation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use nonprofit_locator_core::ZIP_FUNCTION_NAME;
use nonprofit_locator_core::is_sql_identifier;
use nonprofit_locator_core::normalize_zip;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::functions::FunctionFlags;
use rusqlite::params;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    Wal,
    /// Delete journal mode; leaves a single file behind.
    #[default]
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
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    Full,
    /// Normal synchronous mode (balanced).
    #[default]
    Normal,
    /// No syncs; fastest bulk loads, unsafe on power loss.
    Off,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
            Self::Off => "off",
        }
    }
}

/// Configuration for the organization store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
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

impl SqliteStoreConfig {
    /// Creates a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
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

/// Organization store errors.
///
/// # Invariants
/// - Error messages never embed row payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store configuration or identifiers.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Handle to one organization database file.
///
/// # Invariants
/// - The database file and its parent directory exist once opened.
/// - Connections are created per operation and never cached.
#[derive(Debug, Clone)]
pub struct OrganizationStore {
    /// Store configuration.
    config: SqliteStoreConfig,
}

impl OrganizationStore {
    /// Opens (creating when absent) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe or the database
    /// cannot be opened.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let store = Self {
            config,
        };
        drop(store.connection()?);
        Ok(store)
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Opens a scoped connection with pragmas and the zip extension applied.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the connection cannot be opened
    /// or configured.
    pub fn connection(&self) -> Result<Connection, SqliteStoreError> {
        let connection = open_connection(&self.config)?;
        register_zip_function(&connection)?;
        Ok(connection)
    }

    /// Returns true when `table` exists.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the catalog query fails.
    pub fn table_exists(&self, table: &str) -> Result<bool, SqliteStoreError> {
        let connection = self.connection()?;
        table_exists(&connection, table)
    }

    /// Returns the column names of `table` in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the table name is unsafe or the
    /// catalog query fails.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, SqliteStoreError> {
        let quoted = quote_identifier(table)?;
        let connection = self.connection()?;
        let mut stmt = connection.prepare(&format!("PRAGMA table_info({quoted})"))?;
        let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
        columns.map(|column| column.map_err(SqliteStoreError::from)).collect()
    }

    /// Returns the number of rows in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the table name is unsafe or the
    /// count fails.
    pub fn row_count(&self, table: &str) -> Result<u64, SqliteStoreError> {
        let quoted = quote_identifier(table)?;
        let connection = self.connection()?;
        let count: i64 =
            connection.query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| row.get(0))?;
        count_to_u64(count)
    }
}

// ============================================================================
// SECTION: Zip Extension
// ============================================================================

/// Registers the deterministic `clean_zip` scalar function on `connection`.
///
/// Text, integer, and real arguments are truncated to five characters; NULL
/// stays NULL.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Db`] when registration fails.
pub fn register_zip_function(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection.create_scalar_function(
        ZIP_FUNCTION_NAME,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(value_text(ctx.get_raw(0)).map(|text| normalize_zip(&text).to_string())),
    )?;
    Ok(())
}

/// Renders a stored value as text; `None` for NULL.
pub(crate) fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(number) => Some(number.to_string()),
        ValueRef::Real(number) => Some(number.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Double-quotes a plain SQL identifier, rejecting anything else.
pub(crate) fn quote_identifier(name: &str) -> Result<String, SqliteStoreError> {
    if is_sql_identifier(name) {
        Ok(format!("\"{name}\""))
    } else {
        Err(SqliteStoreError::Invalid(format!("unsafe sql identifier: {name}")))
    }
}

/// Returns true when `table` exists on `connection`.
pub(crate) fn table_exists(connection: &Connection, table: &str) -> Result<bool, SqliteStoreError> {
    let found: Option<i64> = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Converts an SQL count into an unsigned counter.
pub(crate) fn count_to_u64(count: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(count).map_err(|_| SqliteStoreError::Invalid(format!("negative count: {count}")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
pub(crate) fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
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
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies journal, sync, and busy-timeout pragmas.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::quote_identifier;

    #[test]
    fn identifiers_are_quoted_or_rejected() {
        assert_eq!(quote_identifier("postcard_forms").ok(), Some("\"postcard_forms\"".to_string()));
        assert!(quote_identifier("x\"; DROP TABLE y").is_err());
    }
}
