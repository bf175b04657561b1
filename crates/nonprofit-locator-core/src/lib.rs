// crates/nonprofit-locator-core/src/lib.rs
// ============================================================================
// Module: Nonprofit Locator Core Library
// Description: Public API surface for source descriptions and record parsing.
// Purpose: Expose the schema registry, parsers, ledger, and resolution types.
// Dependencies: crate::{core, interfaces, parse, profile}
// ============================================================================

//! ## Overview
//! Nonprofit Locator ingests four bulk-data sources describing tax-exempt
//! organizations into a relational store and resolves one organization by
//! name or identifier across them. This crate holds everything that does not
//! touch the store: the [`SourceRegistry`], the zip normalizer, the delimited
//! and document parsers, the [`FailureLedger`], and the resolution result
//! types. Store-backed loading and lookup live in
//! `nonprofit-locator-store-sqlite`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod parse;
pub mod profile;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::LocationProfileProvider;
pub use interfaces::NoopProgress;
pub use interfaces::OverwritePolicy;
pub use interfaces::OverwritePrompt;
pub use interfaces::ProgressObserver;
pub use parse::DocumentError;
pub use parse::DocumentNode;
pub use parse::MAX_DOCUMENT_DEPTH;
pub use parse::check_field_count;
pub use parse::parse_delimited_line;
pub use parse::parse_document;
pub use parse::parse_document_record;
pub use profile::LocationKey;
pub use profile::LocationProfile;
pub use profile::ProfileError;
pub use profile::ProfileMetric;
pub use profile::ProfileTable;
pub use profile::percentile_rank;
pub use profile::state_name;
