// crates/nonprofit-locator-store-sqlite/src/builder.rs
// ============================================================================
// Module: Table Builder
// Description: Database creation under an overwrite policy and table creation.
// Purpose: Turn source descriptors into empty, idempotently created tables.
// Dependencies: nonprofit-locator-core, rusqlite
// ============================================================================

//! ## Overview
//! [`ensure_database`] decides what happens to an existing file: the
//! [`OverwritePolicy`] may decline, which is a normal outcome reported as
//! [`DatabaseOutcome::Declined`] and never an error. [`create_table`] issues
//! `CREATE TABLE IF NOT EXISTS`, so repeated runs never fail on existing
//! tables. Document-folder sources are created with their canonical column
//! list rather than any per-document field names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use nonprofit_locator_core::OverwritePolicy;
use nonprofit_locator_core::SourceDescriptor;

use crate::store::OrganizationStore;
use crate::store::SqliteStoreConfig;
use crate::store::SqliteStoreError;
use crate::store::quote_identifier;
use crate::store::validate_store_path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Database file name used when none is given.
pub const DEFAULT_DATABASE_NAME: &str = "IRS_DATA";

/// Extension appended to database names that do not already carry it.
pub const DATABASE_EXTENSION: &str = "sqlite3";

/// Suffixes of the side files `SQLite` may leave next to a database.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Builds the database path from an optional file name and directory.
///
/// The name defaults to [`DEFAULT_DATABASE_NAME`]; `.sqlite3` is appended
/// when the name does not already mention the extension.
#[must_use]
pub fn resolve_database_path(file_name: Option<&str>, save_location: Option<&Path>) -> PathBuf {
    let name = file_name.map(str::trim).filter(|name| !name.is_empty()).unwrap_or(DEFAULT_DATABASE_NAME);
    let name = if name.contains(DATABASE_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}.{DATABASE_EXTENSION}")
    };
    save_location.map_or_else(|| PathBuf::from(&name), |dir| dir.join(&name))
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// Outcome of preparing the target database.
#[derive(Debug, Clone)]
pub enum DatabaseOutcome {
    /// The database is open and ready for tables.
    Ready(OrganizationStore),
    /// An existing database was kept because overwrite was declined.
    Declined {
        /// Path of the untouched database.
        path: PathBuf,
    },
}

/// Opens a fresh database at `config.path`, consulting `policy` first when a
/// file already exists there.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the path is unsafe, the old file cannot
/// be removed, or the new database cannot be opened.
pub fn ensure_database(
    config: SqliteStoreConfig,
    policy: OverwritePolicy<'_>,
) -> Result<DatabaseOutcome, SqliteStoreError> {
    validate_store_path(&config.path)?;
    if config.path.exists() {
        if !policy.allows_overwrite(&config.path) {
            return Ok(DatabaseOutcome::Declined {
                path: config.path,
            });
        }
        remove_database_files(&config.path)?;
    }
    OrganizationStore::open(config).map(DatabaseOutcome::Ready)
}

/// Removes a database file and any side files next to it.
fn remove_database_files(path: &Path) -> Result<(), SqliteStoreError> {
    std::fs::remove_file(path).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
    for suffix in SIDE_FILE_SUFFIXES {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        let side = PathBuf::from(side);
        if side.exists() {
            std::fs::remove_file(&side).map_err(|err| SqliteStoreError::Io(err.to_string()))?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Renders the idempotent creation statement for `descriptor`'s table.
///
/// # Errors
///
/// Returns [`SqliteStoreError::Invalid`] when the table or a column name is
/// not a plain identifier, or the descriptor has no columns.
pub fn create_table_sql(descriptor: &SourceDescriptor) -> Result<String, SqliteStoreError> {
    let table = quote_identifier(&descriptor.table_name)?;
    let columns = descriptor
        .table_columns()
        .into_iter()
        .map(|column| quote_identifier(column).map(|quoted| format!("{quoted} TEXT")))
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(SqliteStoreError::Invalid(format!(
            "table {} declares no columns",
            descriptor.table_name
        )));
    }
    Ok(format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", ")))
}

/// Creates `descriptor`'s table unless it already exists.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when the statement is invalid or fails.
pub fn create_table(
    store: &OrganizationStore,
    descriptor: &SourceDescriptor,
) -> Result<(), SqliteStoreError> {
    let sql = create_table_sql(descriptor)?;
    let connection = store.connection()?;
    connection.execute_batch(&sql)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
