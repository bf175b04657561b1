// crates/nonprofit-locator-store-sqlite/tests/record_loader.rs
// ============================================================================
// Module: Record Loader Tests
// Description: Failure isolation, attempt limits, documents, and progress.
// Purpose: Ensure bad records are ledgered while the batch keeps loading.
// ============================================================================

//! ## Overview
//! Single-source loader tests:
//! - rejected rows and unrecoverable documents are ledgered
//! - the batch keeps loading after each failure
//! - limits count attempts, including failed ones
//! - progress and audit observers see every record

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use nonprofit_locator_core::DocumentError;
use nonprofit_locator_core::FailureEntry;
use nonprofit_locator_core::InsertFailure;
use nonprofit_locator_core::MAX_DOCUMENT_DEPTH;
use nonprofit_locator_core::OverwritePolicy;
use nonprofit_locator_core::ProgressObserver;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_store_sqlite::DatabaseOutcome;
use nonprofit_locator_store_sqlite::IngestAuditEvent;
use nonprofit_locator_store_sqlite::IngestAuditSink;
use nonprofit_locator_store_sqlite::IngestNoopAuditSink;
use nonprofit_locator_store_sqlite::LoadError;
use nonprofit_locator_store_sqlite::LoadOptions;
use nonprofit_locator_store_sqlite::OrganizationStore;
use nonprofit_locator_store_sqlite::SqliteStoreConfig;
use nonprofit_locator_store_sqlite::create_table;
use nonprofit_locator_store_sqlite::ensure_database;
use nonprofit_locator_store_sqlite::load_source;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

#[derive(Default)]
struct RecordingProgress {
    counts: RefCell<Vec<u64>>,
    completed: RefCell<Option<u64>>,
}

impl ProgressObserver for RecordingProgress {
    fn on_progress(&self, _source: SourceId, attempted: u64) {
        self.counts.borrow_mut().push(attempted);
    }

    fn on_source_complete(&self, _source: SourceId, attempted: u64) {
        *self.completed.borrow_mut() = Some(attempted);
    }
}

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<IngestAuditEvent>>,
}

impl IngestAuditSink for RecordingAudit {
    fn record(&self, event: &IngestAuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

fn open_store(dir: &TempDir, registry: &SourceRegistry) -> OrganizationStore {
    let config = SqliteStoreConfig::new(dir.path().join("loader.sqlite3"));
    let DatabaseOutcome::Ready(store) =
        ensure_database(config, OverwritePolicy::Force).expect("database")
    else {
        panic!("database declined");
    };
    for descriptor in registry.iter() {
        create_table(&store, descriptor).expect("table");
    }
    store
}

fn revocation_line(ein: &str, name: &str) -> String {
    [ein, name, "", "1 MAIN ST", "CHICAGO", "IL", "60605", "US", "", "", "", ""].join("|")
}

fn write_lines(dir: &TempDir, name: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, lines.join("\n")).expect("write source");
    path
}

fn filing(ein: &str, name: &str, zip: &str) -> String {
    format!(
        "<Return xmlns=\"http://www.irs.gov/efile\"><ReturnHeader><Filer><EIN>{ein}</EIN>\
         <BusinessName><BusinessNameLine1Txt>{name}</BusinessNameLine1Txt></BusinessName>\
         <USAddress><CityNm>CHICAGO</CityNm><StateAbbreviationCd>IL</StateAbbreviationCd>\
         <ZIPCd>{zip}</ZIPCd></USAddress></Filer></ReturnHeader></Return>"
    )
}

// ============================================================================
// SECTION: Delimited Sources
// ============================================================================

#[test]
fn short_record_is_ledgered_and_the_good_one_persists() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let source = write_lines(
        &dir,
        "revocations.txt",
        &[revocation_line("010000001", "GOOD ORG"), "020000002|TOO FEW".to_string()],
    );
    let descriptor = registry.get(SourceId::Revocations).expect("revocations");

    let report = load_source(&store, descriptor, &source, &LoadOptions::default()).expect("load");

    assert_eq!(report.inserted, 1);
    assert_eq!(report.attempted, 2);
    assert_eq!(store.row_count("irs_revocations").expect("count"), 1);
    assert_eq!(report.ledger.len(), 1);
    match report.ledger.get(&source).expect("entry") {
        FailureEntry::Rejected {
            records,
        } => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].record_index, 1);
            assert_eq!(records[0].fields, vec!["020000002", "TOO FEW"]);
            assert_eq!(
                records[0].reason,
                InsertFailure::ColumnCount {
                    expected: 12,
                    actual: 2,
                }
            );
        }
        FailureEntry::Unrecoverable {
            ..
        } => panic!("row rejection must not be unrecoverable"),
    }
}

#[test]
fn limit_stops_after_five_of_twenty() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let lines: Vec<String> =
        (0 .. 20).map(|index| revocation_line(&format!("{index:09}"), "ORG")).collect();
    let source = write_lines(&dir, "revocations.txt", &lines);
    let options = LoadOptions {
        limit: Some(5),
        ..LoadOptions::default()
    };

    let report = load_source(&store, registry.get(SourceId::Revocations).expect("revocations"), &source, &options)
        .expect("load");

    assert_eq!(report.attempted, 5);
    assert_eq!(store.row_count("irs_revocations").expect("count"), 5);
}

#[test]
fn blank_lines_are_neither_inserted_nor_counted() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let source = write_lines(
        &dir,
        "revocations.txt",
        &[
            revocation_line("1", "A"),
            String::new(),
            "   ".to_string(),
            revocation_line("2", "B"),
            revocation_line("3", "C"),
        ],
    );
    let options = LoadOptions {
        limit: Some(2),
        ..LoadOptions::default()
    };

    let report = load_source(&store, registry.get(SourceId::Revocations).expect("revocations"), &source, &options)
        .expect("load");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.inserted, 2);
    assert!(report.ledger.is_empty());
}

#[test]
fn rejected_rows_count_toward_the_limit() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let source = write_lines(
        &dir,
        "revocations.txt",
        &["bad|row".to_string(), revocation_line("1", "A"), revocation_line("2", "B")],
    );
    let options = LoadOptions {
        limit: Some(2),
        ..LoadOptions::default()
    };

    let report = load_source(&store, registry.get(SourceId::Revocations).expect("revocations"), &source, &options)
        .expect("load");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.ledger.failed_record_count(), 1);
}

#[test]
fn crlf_terminators_and_invalid_bytes_degrade_values_only() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let path = dir.path().join("pub78.txt");
    let mut bytes = b"010000001|CAF\xc9 ORG|CHICAGO|IL|United States|PC\r\n".to_vec();
    bytes.extend_from_slice(b"020000002|OTHER|DENVER|CO|United States|PF\r\n");
    fs::write(&path, bytes).expect("write");

    let report = load_source(&store, registry.get(SourceId::Eligibility).expect("eligibility"), &path, &LoadOptions::default())
        .expect("load");
    assert_eq!(report.inserted, 2);

    let connection = store.connection().expect("connection");
    let code: String = connection
        .query_row(
            "SELECT deductibility_status_code FROM pub_seven_data WHERE ein = '020000002'",
            [],
            |row| row.get(0),
        )
        .expect("row");
    assert_eq!(code, "PF");
}

#[test]
fn missing_source_file_is_unreadable() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let missing = dir.path().join("absent.txt");

    let result = load_source(
        &store,
        registry.get(SourceId::Postcards).expect("postcards"),
        &missing,
        &LoadOptions::default(),
    );
    assert!(matches!(
        result,
        Err(LoadError::SourceUnreadable { source_id: SourceId::Postcards, .. })
    ));
}

// ============================================================================
// SECTION: Document Folders
// ============================================================================

#[test]
fn undecodable_documents_are_unrecoverable_and_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let folder = dir.path().join("IRS_990_FORMS");
    fs::create_dir(&folder).expect("folder");
    fs::write(folder.join("a_good.xml"), filing("010000001", "FIRST", "606051234")).expect("write");
    fs::write(folder.join("b_broken.xml"), b"<Return><Filer>\xff\xfe").expect("write");
    fs::write(folder.join("c_good.xml"), filing("020000002", "SECOND", "80202")).expect("write");
    fs::create_dir(folder.join("nested")).expect("nested dir");

    let report = load_source(&store, registry.get(SourceId::Filings).expect("filings"), &folder, &LoadOptions::default())
        .expect("load");

    assert_eq!(report.attempted, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.ledger.len(), 1);
    assert!(matches!(
        report.ledger.get(&folder.join("b_broken.xml")),
        Some(FailureEntry::Unrecoverable {
            error: DocumentError::Undecodable(_)
        })
    ));
}

#[test]
fn over_deep_document_is_unrecoverable_and_siblings_still_load() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let folder = dir.path().join("IRS_990_FORMS");
    fs::create_dir(&folder).expect("folder");
    let deep = format!("{}{}", "<Return>".repeat(50_000), "</Return>".repeat(50_000));
    fs::write(folder.join("a_good.xml"), filing("010000001", "FIRST", "60605")).expect("write");
    fs::write(folder.join("b_deep.xml"), deep).expect("write");
    fs::write(folder.join("c_good.xml"), filing("020000002", "SECOND", "80202")).expect("write");

    let report = load_source(&store, registry.get(SourceId::Filings).expect("filings"), &folder, &LoadOptions::default())
        .expect("load");

    assert_eq!(report.attempted, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(store.row_count("nine_nineties").expect("count"), 2);
    assert_eq!(
        report.ledger.get(&folder.join("b_deep.xml")),
        Some(&FailureEntry::Unrecoverable {
            error: DocumentError::DepthLimitExceeded {
                max_depth: MAX_DOCUMENT_DEPTH,
            },
        })
    );
}

#[test]
fn missing_document_fields_are_stored_empty() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let folder = dir.path().join("IRS_990_FORMS");
    fs::create_dir(&folder).expect("folder");
    fs::write(folder.join("only.xml"), filing("010000001", "FIRST", "60605")).expect("write");

    load_source(&store, registry.get(SourceId::Filings).expect("filings"), &folder, &LoadOptions::default())
        .expect("load");

    let connection = store.connection().expect("connection");
    let (name, mission, zip): (String, String, String) = connection
        .query_row("SELECT org_name, mission, zip FROM nine_nineties", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .expect("row");
    assert_eq!(name, "FIRST");
    assert_eq!(mission, "");
    assert_eq!(zip, "60605");
}

#[test]
fn document_limit_counts_failed_documents() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let folder = dir.path().join("IRS_990_FORMS");
    fs::create_dir(&folder).expect("folder");
    fs::write(folder.join("a.xml"), "not xml at all <").expect("write");
    fs::write(folder.join("b.xml"), filing("1", "B", "60605")).expect("write");
    fs::write(folder.join("c.xml"), filing("2", "C", "60605")).expect("write");
    let options = LoadOptions {
        limit: Some(2),
        ..LoadOptions::default()
    };

    let report = load_source(&store, registry.get(SourceId::Filings).expect("filings"), &folder, &options)
        .expect("load");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.inserted, 1);
}

#[test]
fn missing_folder_is_unreadable() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let result = load_source(
        &store,
        registry.get(SourceId::Filings).expect("filings"),
        Path::new("/definitely/not/here"),
        &LoadOptions::default(),
    );
    assert!(matches!(result, Err(LoadError::SourceUnreadable { .. })));
}

// ============================================================================
// SECTION: Observers
// ============================================================================

#[test]
fn progress_is_monotonic_and_audit_events_are_emitted() {
    let dir = TempDir::new().expect("tempdir");
    let registry = SourceRegistry::standard();
    let store = open_store(&dir, &registry);
    let source = write_lines(
        &dir,
        "revocations.txt",
        &[revocation_line("1", "A"), "x|y".to_string(), revocation_line("2", "B")],
    );
    let progress = RecordingProgress::default();
    let audit = RecordingAudit::default();
    let options = LoadOptions {
        limit: None,
        progress: &progress,
        audit: &audit,
    };

    load_source(&store, registry.get(SourceId::Revocations).expect("revocations"), &source, &options)
        .expect("load");

    assert_eq!(*progress.counts.borrow(), vec![1, 2, 3]);
    assert_eq!(*progress.completed.borrow(), Some(3));
    let events = audit.events.lock().expect("audit lock");
    let names: Vec<&str> = events.iter().map(|event| event.event).collect();
    assert_eq!(
        names,
        vec!["ingest_source_started", "ingest_record_failed", "ingest_source_finished"]
    );
    assert_eq!(events[1].record_index, Some(1));
    assert_eq!(events[2].failed, Some(1));
}

#[test]
fn noop_audit_sink_accepts_events() {
    IngestNoopAuditSink.record(&IngestAuditEvent::run_finished(0, 0));
}
