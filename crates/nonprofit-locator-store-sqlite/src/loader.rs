// crates/nonprofit-locator-store-sqlite/src/loader.rs
// ============================================================================
// Module: Record Loader
// Description: Streams one source into its table with per-record isolation.
// Purpose: Persist every loadable record and ledger the rest.
// Dependencies: nonprofit-locator-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`load_source`] reads a text source line by line or a document folder
//! file by file, never holding a whole source in memory. Each record becomes
//! a typed `Result<NormalizedRow, RecordFailure>`; failures go to the
//! [`FailureLedger`] and loading continues with the next record.
//!
//! The optional limit bounds attempts: every non-blank line and every
//! document counts, including those that fail. Blank lines never count. One
//! source is written inside a single transaction on a scoped connection;
//! values are always bound as parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use nonprofit_locator_core::DocumentError;
use nonprofit_locator_core::DocumentField;
use nonprofit_locator_core::FailureLedger;
use nonprofit_locator_core::InsertFailure;
use nonprofit_locator_core::NoopProgress;
use nonprofit_locator_core::NormalizedRow;
use nonprofit_locator_core::ProgressObserver;
use nonprofit_locator_core::RawRecord;
use nonprofit_locator_core::RecordFailure;
use nonprofit_locator_core::RejectedRecord;
use nonprofit_locator_core::SourceDescriptor;
use nonprofit_locator_core::SourceFormat;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::check_field_count;
use nonprofit_locator_core::parse_delimited_line;
use nonprofit_locator_core::parse_document_record;
use rusqlite::Statement;
use rusqlite::params_from_iter;
use serde::Serialize;
use thiserror::Error;

use crate::audit::IngestAuditEvent;
use crate::audit::IngestAuditSink;
use crate::audit::IngestNoopAuditSink;
use crate::store::OrganizationStore;
use crate::store::SqliteStoreError;
use crate::store::quote_identifier;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Source-level load failures; per-record failures never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The source file or folder could not be opened or read.
    #[error("source {source_id} unreadable at {}: {message}", .path.display())]
    SourceUnreadable {
        /// Source that failed.
        source_id: SourceId,
        /// Location that could not be read.
        path: PathBuf,
        /// I/O error message.
        message: String,
    },
    /// The store failed outside any single record.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
}

// ============================================================================
// SECTION: Options and Reports
// ============================================================================

/// Per-source load options.
#[derive(Clone, Copy)]
pub struct LoadOptions<'a> {
    /// Maximum records to attempt; `None` loads everything.
    pub limit: Option<u64>,
    /// Progress observer; has no effect on control flow.
    pub progress: &'a dyn ProgressObserver,
    /// Audit sink for load events.
    pub audit: &'a dyn IngestAuditSink,
}

impl Default for LoadOptions<'static> {
    fn default() -> Self {
        Self {
            limit: None,
            progress: &NoopProgress,
            audit: &IngestNoopAuditSink,
        }
    }
}

/// Result of loading one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLoadReport {
    /// Source that was loaded.
    pub source: SourceId,
    /// Destination table.
    pub table_name: String,
    /// File or folder that was read.
    pub path: PathBuf,
    /// Records attempted (bounded by the limit).
    pub attempted: u64,
    /// Rows written.
    pub inserted: u64,
    /// Failures recorded during the load.
    pub ledger: FailureLedger,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Opened source input.
enum SourceInput<'d> {
    /// Text file read line by line.
    Lines {
        /// Open file handle.
        file: File,
        /// Field delimiter.
        delimiter: char,
    },
    /// Documents in listing order.
    Documents {
        /// Document paths, sorted by name.
        paths: Vec<PathBuf>,
        /// Canonical fields to extract.
        canonical: &'d [DocumentField],
    },
}

/// Loads the source at `path` into `descriptor`'s existing table.
///
/// # Errors
///
/// Returns [`LoadError::SourceUnreadable`] when the source cannot be opened
/// or read, and [`LoadError::Store`] when the transaction cannot be opened or
/// committed. Per-record failures are returned in the report's ledger.
pub fn load_source(
    store: &OrganizationStore,
    descriptor: &SourceDescriptor,
    path: &Path,
    options: &LoadOptions<'_>,
) -> Result<SourceLoadReport, LoadError> {
    let input = open_input(descriptor, path)?;
    let insert_sql = insert_sql(descriptor)?;
    options.audit.record(&IngestAuditEvent::source_started(
        descriptor.id,
        &descriptor.table_name,
        path,
    ));

    let mut connection = store.connection()?;
    let tx = connection.transaction().map_err(SqliteStoreError::from)?;
    let mut run = LoadRun::new(descriptor, options);
    {
        let mut insert = tx.prepare(&insert_sql).map_err(SqliteStoreError::from)?;
        match input {
            SourceInput::Lines {
                file,
                delimiter,
            } => load_lines(&mut run, &mut insert, path, file, delimiter)?,
            SourceInput::Documents {
                paths,
                canonical,
            } => load_documents(&mut run, &mut insert, &paths, canonical),
        }
    }
    tx.commit().map_err(SqliteStoreError::from)?;

    options.progress.on_source_complete(descriptor.id, run.attempted);
    let failed = u64::try_from(run.ledger.failed_record_count()).unwrap_or(u64::MAX);
    options.audit.record(&IngestAuditEvent::source_finished(
        descriptor.id,
        run.attempted,
        run.inserted,
        failed,
    ));
    Ok(SourceLoadReport {
        source: descriptor.id,
        table_name: descriptor.table_name.clone(),
        path: path.to_path_buf(),
        attempted: run.attempted,
        inserted: run.inserted,
        ledger: run.ledger,
    })
}

/// Opens the text file or lists the document folder.
fn open_input<'d>(
    descriptor: &'d SourceDescriptor,
    path: &Path,
) -> Result<SourceInput<'d>, LoadError> {
    match &descriptor.format {
        SourceFormat::Delimited {
            delimiter,
        } => {
            if path.is_dir() {
                return Err(unreadable(descriptor.id, path, "expected a file, found a directory"));
            }
            let file = File::open(path).map_err(|err| unreadable(descriptor.id, path, err))?;
            Ok(SourceInput::Lines {
                file,
                delimiter: *delimiter,
            })
        }
        SourceFormat::DocumentFolder {
            canonical,
        } => {
            let paths = document_paths(path).map_err(|err| unreadable(descriptor.id, path, err))?;
            Ok(SourceInput::Documents {
                paths,
                canonical,
            })
        }
    }
}

/// Lists regular files in `folder`, sorted by path.
fn document_paths(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Streams delimited lines into the table.
fn load_lines(
    run: &mut LoadRun<'_>,
    insert: &mut Statement<'_>,
    path: &Path,
    file: File,
    delimiter: char,
) -> Result<(), LoadError> {
    let mut reader = BufReader::new(file);
    let mut buffer = Vec::new();
    while !run.limit_reached() {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .map_err(|err| unreadable(run.descriptor.id, path, err))?;
        if read == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buffer);
        let Some(record) = parse_delimited_line(&line, delimiter) else {
            continue;
        };
        let index = run.begin_attempt();
        let row = record.into_row();
        let fields = row.values().to_vec();
        if let Err(failure) = run.write_row(insert, row) {
            run.record_failure(path, index, fields, failure);
        }
        run.finish_attempt();
    }
    Ok(())
}

/// Parses and writes each document in turn.
fn load_documents(
    run: &mut LoadRun<'_>,
    insert: &mut Statement<'_>,
    paths: &[PathBuf],
    canonical: &[DocumentField],
) {
    for document in paths {
        if run.limit_reached() {
            break;
        }
        let index = run.begin_attempt();
        match read_document(document, canonical) {
            Ok(row) => {
                let fields = row.values().to_vec();
                if let Err(failure) = run.write_row(insert, row) {
                    run.record_failure(document, index, fields, failure);
                }
            }
            Err(error) => run.record_failure(document, index, Vec::new(), RecordFailure::Parse(error)),
        }
        run.finish_attempt();
    }
}

/// Reads one document and extracts its canonical row.
fn read_document(path: &Path, canonical: &[DocumentField]) -> Result<NormalizedRow, DocumentError> {
    let bytes = std::fs::read(path).map_err(|err| DocumentError::Undecodable(err.to_string()))?;
    parse_document_record(&bytes, canonical).map(RawRecord::into_row)
}

// ============================================================================
// SECTION: Run State
// ============================================================================

/// Counters and ledger for one source load.
struct LoadRun<'a> {
    /// Source being loaded.
    descriptor: &'a SourceDescriptor,
    /// Caller options.
    options: &'a LoadOptions<'a>,
    /// Table column count.
    expected: usize,
    /// Records attempted.
    attempted: u64,
    /// Rows written.
    inserted: u64,
    /// Failures so far.
    ledger: FailureLedger,
}

impl<'a> LoadRun<'a> {
    /// Starts an empty run.
    fn new(descriptor: &'a SourceDescriptor, options: &'a LoadOptions<'a>) -> Self {
        Self {
            descriptor,
            options,
            expected: descriptor.table_columns().len(),
            attempted: 0,
            inserted: 0,
            ledger: FailureLedger::new(),
        }
    }

    /// Returns true once the attempt limit is reached.
    fn limit_reached(&self) -> bool {
        self.options.limit.is_some_and(|limit| self.attempted >= limit)
    }

    /// Counts an attempt and returns its zero-based index.
    fn begin_attempt(&mut self) -> u64 {
        let index = self.attempted;
        self.attempted += 1;
        index
    }

    /// Reports progress after an attempt.
    fn finish_attempt(&self) {
        self.options.progress.on_progress(self.descriptor.id, self.attempted);
    }

    /// Writes one row, or explains why it was rejected.
    fn write_row(
        &mut self,
        insert: &mut Statement<'_>,
        row: NormalizedRow,
    ) -> Result<(), RecordFailure> {
        check_field_count(row.len(), self.expected).map_err(RecordFailure::Insert)?;
        insert.execute(params_from_iter(row.values().iter())).map_err(|err| {
            RecordFailure::Insert(InsertFailure::Store {
                message: err.to_string(),
            })
        })?;
        self.inserted += 1;
        Ok(())
    }

    /// Folds a record failure into the ledger and the audit log.
    fn record_failure(
        &mut self,
        location: &Path,
        record_index: u64,
        fields: Vec<String>,
        failure: RecordFailure,
    ) {
        self.options.audit.record(&IngestAuditEvent::record_failed(
            self.descriptor.id,
            location,
            record_index,
            failure.to_string(),
        ));
        match failure {
            RecordFailure::Parse(error) => self.ledger.record_unrecoverable(location, error),
            RecordFailure::Insert(reason) => self.ledger.record_rejected(
                location,
                RejectedRecord {
                    record_index,
                    fields,
                    reason,
                },
            ),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders the parameterized insert for `descriptor`'s table.
fn insert_sql(descriptor: &SourceDescriptor) -> Result<String, SqliteStoreError> {
    let table = quote_identifier(&descriptor.table_name)?;
    let columns = descriptor
        .table_columns()
        .into_iter()
        .map(quote_identifier)
        .collect::<Result<Vec<_>, _>>()?;
    let placeholders: Vec<String> =
        (1 ..= columns.len()).map(|position| format!("?{position}")).collect();
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// Builds a source-unreadable error.
fn unreadable(source_id: SourceId, path: &Path, error: impl ToString) -> LoadError {
    LoadError::SourceUnreadable {
        source_id,
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}
