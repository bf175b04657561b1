// crates/nonprofit-locator-core/src/core/zip.rs
// ============================================================================
// Module: Zip Normalizer
// Description: Truncates zip-like strings to their five-character prefix.
// Purpose: Share one normalization rule between load time and query time.
// Dependencies: None
// ============================================================================

//! ## Overview
//! The normalizer is a truncation, not a validation: it never fails and never
//! inspects the characters it keeps. The store registers it as the
//! `clean_zip` SQL function so stored 9-digit or malformed values compare
//! directly against a 5-digit key.

/// Name under which the normalizer is registered with the store.
pub const ZIP_FUNCTION_NAME: &str = "clean_zip";

/// Length of a normalized zip, in characters.
pub const NORMALIZED_ZIP_LEN: usize = 5;

/// Returns the first five characters of `value`, or all of it when shorter.
#[must_use]
pub fn normalize_zip(value: &str) -> &str {
    match value.char_indices().nth(NORMALIZED_ZIP_LEN) {
        Some((end, _)) => &value[.. end],
        None => value,
    }
}
