// crates/nonprofit-locator-cli/src/lib.rs
// ============================================================================
// Module: Nonprofit Locator CLI Library
// Description: Shared helpers for the nonprofit-locator command-line interface.
// Purpose: Provide the message catalog to the binary and its tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library houses the CLI message catalog. The binary entry point
//! (`src/main.rs`) routes every user-facing line through [`t!`] so output
//! stays consistent across commands.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Message catalog and translation helpers.
pub mod i18n;
