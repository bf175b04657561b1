// crates/nonprofit-locator-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Provides the message catalog and placeholder substitution.
// Purpose: Centralize user-facing strings so every command words output alike.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The CLI stores user-facing strings in a small catalog keyed by dotted
//! names. All runtime output should be routed through the [`t!`](crate::t)
//! macro.
//!
//! ## Invariants
//! - The catalog is built once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "nonprofit-locator {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("config.validate.defaults", "No config file found; built-in defaults are valid."),
    ("registry.invalid", "Source registry is invalid: {error}"),
    ("build.database.failed", "Failed to prepare database {path}: {error}"),
    ("build.declined", "Kept existing database {path}; nothing was loaded."),
    ("build.prompt.overwrite", "Database {path} already exists. Overwrite it? [Y/N]"),
    ("build.audit.open_failed", "Failed to open audit log {path}: {error}"),
    ("build.progress", "{source}: {attempted} records processed"),
    ("build.source.complete", "{source}: finished after {attempted} records"),
    (
        "build.source.loaded",
        "{source} -> {table}: {inserted} of {attempted} records inserted, {failed} failed",
    ),
    ("build.source.failed", "{source} could not be loaded from {path}: {error}"),
    (
        "build.summary",
        "Database {path} built with {inserted} rows; {locations} locations had failed records.",
    ),
    ("build.report.serialize_failed", "Failed to serialize build report: {error}"),
    ("build.report.write_failed", "Failed to write build report to {path}: {error}"),
    ("build.report.written", "Build report written to {path}"),
    ("resolve.database_missing", "Database not found: {path}"),
    ("resolve.failed", "Lookup failed: {error}"),
    ("resolve.not_found", "No organization matched {query}."),
    ("resolve.serialize_failed", "Failed to render lookup result: {error}"),
    ("sources.entry", "{source} ({selector}) -> table {table}, {format}, at {path}"),
    ("sources.columns", "  columns: {columns}"),
    ("sources.format.delimited", "delimited by '{delimiter}'"),
    ("sources.format.documents", "document folder"),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

/// Returns the raw catalog entries in declaration order.
#[cfg(test)]
pub(crate) const fn catalog_entries() -> &'static [(&'static str, &'static str)] {
    CATALOG
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Looks up `key` in the catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
