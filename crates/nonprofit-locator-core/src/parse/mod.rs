// crates/nonprofit-locator-core/src/parse/mod.rs
// ============================================================================
// Module: Format Parsers
// Description: Delimited-text and document-tree record parsers.
// Purpose: Convert raw source units into records.
// Dependencies: crate::core, quick-xml
// ============================================================================

//! ## Overview
//! Turns raw source units into [`crate::RawRecord`] values. Delimited sources
//! are split one line at a time; document sources are parsed one file at a
//! time into a namespace-free tree and projected onto canonical fields.
//! Parsers never touch the store.

pub mod delimited;
pub mod document;

pub use delimited::check_field_count;
pub use delimited::parse_delimited_line;
pub use document::DocumentError;
pub use document::DocumentNode;
pub use document::MAX_DOCUMENT_DEPTH;
pub use document::extract_fields;
pub use document::parse_document;
pub use document::parse_document_record;
