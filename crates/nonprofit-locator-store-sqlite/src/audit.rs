// crates/nonprofit-locator-store-sqlite/src/audit.rs
// ============================================================================
// Module: Ingestion Audit Logging
// Description: Structured audit events for source loading.
// Purpose: Emit JSON-lines load events without hard logging dependencies.
// Dependencies: nonprofit-locator-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Loading reports what it did through [`IngestAuditSink`]. Events are flat
//! serde structs, one JSON object per line, so operators can route them to
//! whatever pipeline they use. Sinks never affect control flow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use nonprofit_locator_core::SourceId;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ingestion audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Source the event concerns, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
    /// Destination table, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// File or folder location, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Zero-based record index for record events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_index: Option<u64>,
    /// Records attempted so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempted: Option<u64>,
    /// Rows inserted so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<u64>,
    /// Failed record or location count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl IngestAuditEvent {
    /// Creates an event with a timestamp and no optional fields.
    fn named(event: &'static str) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            source: None,
            table: None,
            path: None,
            record_index: None,
            attempted: None,
            inserted: None,
            failed: None,
            reason: None,
        }
    }

    /// A source is about to be read.
    #[must_use]
    pub fn source_started(source: SourceId, table: &str, path: &Path) -> Self {
        Self {
            source: Some(source),
            table: Some(table.to_string()),
            path: Some(path.display().to_string()),
            ..Self::named("ingest_source_started")
        }
    }

    /// One record was skipped.
    #[must_use]
    pub fn record_failed(source: SourceId, path: &Path, record_index: u64, reason: String) -> Self {
        Self {
            source: Some(source),
            path: Some(path.display().to_string()),
            record_index: Some(record_index),
            reason: Some(reason),
            ..Self::named("ingest_record_failed")
        }
    }

    /// A source finished loading.
    #[must_use]
    pub fn source_finished(source: SourceId, attempted: u64, inserted: u64, failed: u64) -> Self {
        Self {
            source: Some(source),
            attempted: Some(attempted),
            inserted: Some(inserted),
            failed: Some(failed),
            ..Self::named("ingest_source_finished")
        }
    }

    /// A source could not be read or written at all.
    #[must_use]
    pub fn source_unreadable(source: SourceId, path: &Path, reason: String) -> Self {
        Self {
            source: Some(source),
            path: Some(path.display().to_string()),
            reason: Some(reason),
            ..Self::named("ingest_source_unreadable")
        }
    }

    /// The whole run finished; `failed` counts failed locations.
    #[must_use]
    pub fn run_finished(inserted: u64, failed: u64) -> Self {
        Self {
            inserted: Some(inserted),
            failed: Some(failed),
            ..Self::named("ingest_run_finished")
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for ingestion events.
pub trait IngestAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &IngestAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct IngestStderrAuditSink;

impl IngestAuditSink for IngestStderrAuditSink {
    fn record(&self, event: &IngestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct IngestFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl IngestFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl IngestAuditSink for IngestFileAuditSink {
    fn record(&self, event: &IngestAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct IngestNoopAuditSink;

impl IngestAuditSink for IngestNoopAuditSink {
    fn record(&self, _event: &IngestAuditEvent) {}
}
