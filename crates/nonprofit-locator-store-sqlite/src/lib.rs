// crates/nonprofit-locator-store-sqlite/src/lib.rs
// ============================================================================
// Module: Nonprofit Locator SQLite Store Library
// Description: SQLite-backed table builder, record loader, and resolver.
// Purpose: Expose store-backed ingestion and cascade resolution.
// Dependencies: nonprofit-locator-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Everything in this crate touches the database file: creating it under an
//! overwrite policy, creating one table per source, streaming sources into
//! those tables, and resolving organizations across them. Every operation
//! opens its own scoped connection with the `clean_zip` extension
//! registered; no connection outlives the call that opened it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod builder;
pub mod ingest;
pub mod loader;
pub mod resolver;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::IngestAuditEvent;
pub use audit::IngestAuditSink;
pub use audit::IngestFileAuditSink;
pub use audit::IngestNoopAuditSink;
pub use audit::IngestStderrAuditSink;
pub use builder::DATABASE_EXTENSION;
pub use builder::DEFAULT_DATABASE_NAME;
pub use builder::DatabaseOutcome;
pub use builder::create_table;
pub use builder::create_table_sql;
pub use builder::ensure_database;
pub use builder::resolve_database_path;
pub use ingest::BuildReport;
pub use ingest::SourceOutcome;
pub use ingest::ingest_sources;
pub use loader::LoadError;
pub use loader::LoadOptions;
pub use loader::SourceLoadReport;
pub use loader::load_source;
pub use resolver::resolve;
pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::OrganizationStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::register_zip_function;
