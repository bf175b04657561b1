// crates/nonprofit-locator-core/src/core/mod.rs
// ============================================================================
// Module: Nonprofit Locator Core Types
// Description: Source registry, records, ledger, and resolution types.
// Purpose: Shared data model for loading and resolution.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Data model shared by loading and resolution:
//! - the closed set of sources and their table strategies
//! - zip normalization
//! - raw records and the failure ledger
//! - search keys and resolution results

pub mod ledger;
pub mod record;
pub mod resolution;
pub mod source;
pub mod zip;

pub use ledger::*;
pub use record::*;
pub use resolution::*;
pub use source::*;
pub use zip::*;
