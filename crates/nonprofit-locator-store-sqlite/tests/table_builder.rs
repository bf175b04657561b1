// crates/nonprofit-locator-store-sqlite/tests/table_builder.rs
// ============================================================================
// Module: Table Builder Tests
// Description: Database creation, overwrite policy, and idempotent tables.
// Purpose: Ensure builds never fail on existing tables and never destroy a
//          database without permission.
// ============================================================================

//! ## Overview
//! Database creation and table bootstrap tests:
//! - overwrite policy (force, reject, prompt)
//! - directory paths are rejected
//! - idempotent table creation with safe identifiers

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

use std::cell::Cell;
use std::path::Path;

use nonprofit_locator_core::OverwritePolicy;
use nonprofit_locator_core::OverwritePrompt;
use nonprofit_locator_core::SourceDescriptor;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_store_sqlite::DatabaseOutcome;
use nonprofit_locator_store_sqlite::OrganizationStore;
use nonprofit_locator_store_sqlite::SqliteStoreConfig;
use nonprofit_locator_store_sqlite::SqliteStoreError;
use nonprofit_locator_store_sqlite::create_table;
use nonprofit_locator_store_sqlite::create_table_sql;
use nonprofit_locator_store_sqlite::ensure_database;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct ScriptedPrompt {
    answer: bool,
    asked: Cell<bool>,
}

impl OverwritePrompt for ScriptedPrompt {
    fn confirm_overwrite(&self, _path: &Path) -> bool {
        self.asked.set(true);
        self.answer
    }
}

fn ready(outcome: DatabaseOutcome) -> OrganizationStore {
    match outcome {
        DatabaseOutcome::Ready(store) => store,
        DatabaseOutcome::Declined {
            path,
        } => panic!("unexpected decline for {}", path.display()),
    }
}

fn existing_store(dir: &TempDir) -> OrganizationStore {
    let config = SqliteStoreConfig::new(dir.path().join("IRS_DATA.sqlite3"));
    let store = ready(ensure_database(config, OverwritePolicy::Reject).expect("create"));
    let registry = SourceRegistry::standard();
    create_table(&store, registry.get(SourceId::Eligibility).expect("eligibility")).expect("table");
    store
}

// ============================================================================
// SECTION: Tables
// ============================================================================

#[test]
fn create_table_twice_keeps_one_table_with_original_columns() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let registry = SourceRegistry::standard();
    let descriptor = registry.get(SourceId::Eligibility).expect("eligibility");

    create_table(&store, descriptor).expect("second create");

    let connection = store.connection().expect("connection");
    let tables: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'pub_seven_data'",
            [],
            |row| row.get(0),
        )
        .expect("count");
    assert_eq!(tables, 1);
    assert_eq!(
        store.table_columns("pub_seven_data").expect("columns"),
        vec!["ein", "org_name", "city", "state", "country", "deductibility_status_code"]
    );
}

#[test]
fn document_folder_table_uses_canonical_columns() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let registry = SourceRegistry::standard();
    create_table(&store, registry.get(SourceId::Filings).expect("filings")).expect("table");
    assert_eq!(
        store.table_columns("nine_nineties").expect("columns"),
        vec!["ein", "org_name", "org_name_2", "city", "state", "website", "mission", "zip"]
    );
    assert_eq!(store.row_count("nine_nineties").expect("count"), 0);
}

#[test]
fn every_standard_table_can_be_created() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    for descriptor in SourceRegistry::standard().iter() {
        create_table(&store, descriptor).expect("table");
        assert!(store.table_exists(&descriptor.table_name).expect("exists"));
    }
}

#[test]
fn unsafe_identifiers_never_reach_sql() {
    let mut descriptor = SourceDescriptor::delimited(
        SourceId::Revocations,
        &["ein", "org_name", "city", "state", "zip"],
        '|',
        "a.txt",
    );
    descriptor.table_name = "irs_revocations; DROP TABLE pub_seven_data".to_string();
    assert!(matches!(create_table_sql(&descriptor), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn creation_statement_is_idempotent_text() {
    let registry = SourceRegistry::standard();
    let sql = create_table_sql(registry.get(SourceId::Revocations).expect("revocations")).expect("sql");
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"irs_revocations\" (\"ein\" TEXT"));
}

// ============================================================================
// SECTION: Overwrite Policy
// ============================================================================

#[test]
fn new_database_is_created_without_consulting_the_prompt() {
    let dir = TempDir::new().expect("tempdir");
    let prompt = ScriptedPrompt {
        answer: false,
        asked: Cell::new(false),
    };
    let config = SqliteStoreConfig::new(dir.path().join("nested").join("fresh.sqlite3"));
    let store = ready(ensure_database(config, OverwritePolicy::Confirm(&prompt)).expect("create"));
    assert!(store.path().exists());
    assert!(!prompt.asked.get());
}

#[test]
fn reject_policy_leaves_existing_database_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let config = store.config().clone();

    let outcome = ensure_database(config, OverwritePolicy::Reject).expect("ensure");
    assert!(matches!(outcome, DatabaseOutcome::Declined { .. }));
    assert!(store.table_exists("pub_seven_data").expect("exists"));
}

#[test]
fn declining_prompt_is_a_normal_outcome() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let prompt = ScriptedPrompt {
        answer: false,
        asked: Cell::new(false),
    };

    let outcome =
        ensure_database(store.config().clone(), OverwritePolicy::Confirm(&prompt)).expect("ensure");
    assert!(prompt.asked.get());
    match outcome {
        DatabaseOutcome::Declined {
            path,
        } => assert_eq!(path, store.path()),
        DatabaseOutcome::Ready(_) => panic!("database should have been kept"),
    }
    assert!(store.table_exists("pub_seven_data").expect("exists"));
}

#[test]
fn confirmed_prompt_recreates_an_empty_database() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let prompt = ScriptedPrompt {
        answer: true,
        asked: Cell::new(false),
    };

    let fresh = ready(
        ensure_database(store.config().clone(), OverwritePolicy::Confirm(&prompt)).expect("ensure"),
    );
    assert!(prompt.asked.get());
    assert!(!fresh.table_exists("pub_seven_data").expect("exists"));
}

#[test]
fn force_policy_overwrites_without_asking() {
    let dir = TempDir::new().expect("tempdir");
    let store = existing_store(&dir);
    let fresh = ready(ensure_database(store.config().clone(), OverwritePolicy::Force).expect("ensure"));
    assert!(!fresh.table_exists("pub_seven_data").expect("exists"));
}

#[test]
fn directory_paths_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let config = SqliteStoreConfig::new(dir.path());
    assert!(matches!(
        ensure_database(config, OverwritePolicy::Force),
        Err(SqliteStoreError::Invalid(_))
    ));
}
