// crates/nonprofit-locator-config/src/lib.rs
// ============================================================================
// Module: Nonprofit Locator Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for nonprofit-locator.toml semantics.
// Dependencies: nonprofit-locator-core, nonprofit-locator-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `nonprofit-locator-config` defines the configuration model for builds and
//! lookups: store pragmas, source locations, and ingestion defaults. Loading
//! is strict and fails closed; a missing default file falls back to built-in
//! defaults.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
