// crates/nonprofit-locator-core/src/core/ledger.rs
// ============================================================================
// Module: Failure Ledger
// Description: Per-run record of records that could not be parsed or stored.
// Purpose: Isolate per-record failures without aborting a batch.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Loading never aborts on a bad record. Each failure is classified as a
//! [`RecordFailure`] and folded into a [`FailureLedger`] keyed by location:
//! - an undecodable document is keyed by its own path with an
//!   [`FailureEntry::Unrecoverable`] marker;
//! - a rejected row is appended to a [`FailureEntry::Rejected`] list keyed by
//!   the path it was read from (the source file for text, the document for
//!   folders).
//!
//! The ledger lives for one load run and is returned to the caller; it is
//! never persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::parse::DocumentError;

// ============================================================================
// SECTION: Failure Types
// ============================================================================

/// Reason a row insertion was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsertFailure {
    /// The record's field count differs from the table's column count.
    #[error("expected {expected} fields, found {actual}")]
    ColumnCount {
        /// Table column count.
        expected: usize,
        /// Record field count.
        actual: usize,
    },
    /// The store refused the row.
    #[error("store rejected row: {message}")]
    Store {
        /// Store error message.
        message: String,
    },
}

/// Typed outcome of a single failed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordFailure {
    /// The record could not be parsed at all.
    #[error("parse failure: {0}")]
    Parse(DocumentError),
    /// The record parsed but its row was rejected.
    #[error("insert failure: {0}")]
    Insert(InsertFailure),
}

/// A rejected row and the payload that was offered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    /// Zero-based index of the record within its source.
    pub record_index: u64,
    /// Field values offered for insertion.
    pub fields: Vec<String>,
    /// Rejection reason.
    pub reason: InsertFailure,
}

/// Ledger value for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureEntry {
    /// The record at this location could not be decoded.
    Unrecoverable {
        /// Decode failure.
        error: DocumentError,
    },
    /// Rows read from this location were rejected.
    Rejected {
        /// Rejected rows in encounter order.
        records: Vec<RejectedRecord>,
    },
}

impl FailureEntry {
    /// Returns how many records this entry accounts for.
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            Self::Unrecoverable {
                ..
            } => 1,
            Self::Rejected {
                records,
            } => records.len(),
        }
    }
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Failures accumulated during one load run, keyed by location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailureLedger {
    /// Entries keyed by file path.
    entries: BTreeMap<PathBuf, FailureEntry>,
}

impl FailureLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an undecodable document at `path`.
    pub fn record_unrecoverable(&mut self, path: &Path, error: DocumentError) {
        self.entries.insert(path.to_path_buf(), FailureEntry::Unrecoverable {
            error,
        });
    }

    /// Appends a rejected row under `path`.
    ///
    /// An existing unrecoverable marker for `path` takes precedence.
    pub fn record_rejected(&mut self, path: &Path, rejected: RejectedRecord) {
        let entry = self.entries.entry(path.to_path_buf()).or_insert_with(|| FailureEntry::Rejected {
            records: Vec::new(),
        });
        if let FailureEntry::Rejected {
            records,
        } = entry
        {
            records.push(rejected);
        }
    }

    /// Folds another ledger into this one.
    pub fn merge(&mut self, other: Self) {
        for (path, entry) in other.entries {
            match entry {
                FailureEntry::Unrecoverable {
                    error,
                } => self.record_unrecoverable(&path, error),
                FailureEntry::Rejected {
                    records,
                } => {
                    for record in records {
                        self.record_rejected(&path, record);
                    }
                }
            }
        }
    }

    /// Returns the entry for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&FailureEntry> {
        self.entries.get(path)
    }

    /// Iterates entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &FailureEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_path(), entry))
    }

    /// Returns the number of failed locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of failed records across all locations.
    #[must_use]
    pub fn failed_record_count(&self) -> usize {
        self.entries.values().map(FailureEntry::record_count).sum()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
