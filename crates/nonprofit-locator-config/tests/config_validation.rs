// crates/nonprofit-locator-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Load guards, section defaults, and fail-closed limits.
// Purpose: Ensure nonprofit-locator.toml handling rejects unusable values.
// Dependencies: nonprofit-locator-config, nonprofit-locator-core, tempfile
// ============================================================================

//! ## Overview
//! Covers path/size/encoding guards on load, per-section validation, and how
//! source overrides are applied to a registry.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use nonprofit_locator_config::ConfigError;
use nonprofit_locator_config::LocatorConfig;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_store_sqlite::SqliteStoreMode;
use nonprofit_locator_store_sqlite::SqliteSyncMode;
use tempfile::NamedTempFile;

// ============================================================================
// SECTION: Helpers
// ============================================================================

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<LocatorConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn write_config(content: &[u8]) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content).map_err(|err| err.to_string())?;
    Ok(file)
}

// ============================================================================
// SECTION: Load Guards
// ============================================================================

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_invalid(LocatorConfig::load(Some(Path::new(&long_path))), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_invalid(
        LocatorConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&vec![b'#'; 1_048_577])?;
    assert_invalid(LocatorConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let file = write_config(&[0xFF, 0xFE, 0xFF])?;
    assert_invalid(LocatorConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_requires_explicit_file_to_exist() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(LocatorConfig::load(Some(&missing)), "config io error")
}

#[test]
fn load_reports_parse_errors() -> TestResult {
    let file = write_config(b"[store\nbusy_timeout_ms = 1")?;
    assert_invalid(LocatorConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_without_default_file_uses_defaults() -> TestResult {
    let config = LocatorConfig::load(None).map_err(|err| err.to_string())?;
    if config.loaded_from.is_some() || config.sources.data_root != Path::new(".") {
        return Err("expected built-in defaults".to_string());
    }
    Ok(())
}

#[test]
fn load_records_source_file() -> TestResult {
    let file = write_config(b"[ingest]\nlimit = 25\n")?;
    let config = LocatorConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    assert_eq!(config.loaded_from.as_deref(), Some(file.path()));
    assert_eq!(config.ingest.limit, Some(25));
    Ok(())
}

// ============================================================================
// SECTION: Sections
// ============================================================================

#[test]
fn empty_document_yields_defaults() -> TestResult {
    let config = LocatorConfig::from_toml("").map_err(|err| err.to_string())?;
    assert_eq!(config, LocatorConfig::default());
    assert_eq!(config.store.busy_timeout_ms, 5_000);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Delete);
    assert_eq!(config.store.sync_mode, SqliteSyncMode::Normal);
    assert_eq!(config.ingest.progress_interval, 10_000);
    assert!(!config.ingest.audit_stderr);
    Ok(())
}

#[test]
fn store_section_parses_pragmas() -> TestResult {
    let config = LocatorConfig::from_toml(
        "[store]\nbusy_timeout_ms = 250\njournal_mode = \"wal\"\nsync_mode = \"off\"\n",
    )
    .map_err(|err| err.to_string())?;
    let store = config.store.store_config(PathBuf::from("IRS_DATA.sqlite3"));
    assert_eq!(store.busy_timeout_ms, 250);
    assert_eq!(store.journal_mode, SqliteStoreMode::Wal);
    assert_eq!(store.sync_mode, SqliteSyncMode::Off);
    assert_eq!(store.path, PathBuf::from("IRS_DATA.sqlite3"));
    Ok(())
}

#[test]
fn store_rejects_unknown_journal_mode() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[store]\njournal_mode = \"memory\"\n"),
        "config parse error",
    )
}

#[test]
fn store_rejects_zero_busy_timeout() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[store]\nbusy_timeout_ms = 0\n"),
        "store.busy_timeout_ms out of range",
    )
}

#[test]
fn store_rejects_excessive_busy_timeout() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[store]\nbusy_timeout_ms = 600001\n"),
        "store.busy_timeout_ms out of range",
    )
}

#[test]
fn ingest_rejects_zero_limit() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[ingest]\nlimit = 0\n"),
        "ingest.limit must be greater than zero",
    )
}

#[test]
fn ingest_rejects_zero_progress_interval() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[ingest]\nprogress_interval = 0\n"),
        "ingest.progress_interval must be greater than zero",
    )
}

#[test]
fn ingest_rejects_blank_audit_log() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[ingest]\naudit_log = \"  \"\n"),
        "ingest.audit_log must be non-empty",
    )
}

#[test]
fn sources_reject_empty_data_root() -> TestResult {
    assert_invalid(
        LocatorConfig::from_toml("[sources]\ndata_root = \"\"\n"),
        "sources.data_root must be non-empty",
    )
}

#[test]
fn sources_reject_long_override_component() -> TestResult {
    let toml = format!("[sources]\npostcards = \"{}/list.txt\"\n", "p".repeat(256));
    assert_invalid(LocatorConfig::from_toml(&toml), "sources.postcards path component too long")
}

// ============================================================================
// SECTION: Source Overrides
// ============================================================================

#[test]
fn overrides_replace_only_named_sources() -> TestResult {
    let config = LocatorConfig::from_toml(
        "[sources]\ndata_root = \"/srv/irs\"\nrevocations = \"revoked/latest.txt\"\n",
    )
    .map_err(|err| err.to_string())?;
    let mut registry = SourceRegistry::standard();
    config.sources.apply_overrides(&mut registry);

    let revocations = registry.get(SourceId::Revocations).ok_or("missing revocations")?;
    assert_eq!(
        revocations.path_under(&config.sources.data_root),
        PathBuf::from("/srv/irs/revoked/latest.txt")
    );
    let postcards = registry.get(SourceId::Postcards).ok_or("missing postcards")?;
    assert_eq!(
        postcards.path_under(&config.sources.data_root),
        PathBuf::from("/srv/irs/IRS_990N_FORMS/data-download-epostcard.txt")
    );
    assert_eq!(config.sources.override_for(SourceId::Filings), None);
    Ok(())
}
