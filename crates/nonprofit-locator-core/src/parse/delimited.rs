// crates/nonprofit-locator-core/src/parse/delimited.rs
// ============================================================================
// Module: Delimited Line Parser
// Description: Splits one text line into positional fields.
// Purpose: Turn bulk-file lines into records for row insertion.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Trailing line terminators are stripped and blank lines are skipped rather
//! than inserted. Field-count agreement with the table is checked separately
//! by [`check_field_count`]; a mismatch is an insertion failure, never a parse
//! failure.

use crate::core::InsertFailure;
use crate::core::RawRecord;

/// Splits `line` on `delimiter`, or returns `None` for a blank line.
#[must_use]
pub fn parse_delimited_line(line: &str, delimiter: char) -> Option<RawRecord> {
    let stripped = line.trim_end_matches(['\r', '\n']);
    if stripped.trim().is_empty() {
        return None;
    }
    Some(RawRecord::Delimited(stripped.split(delimiter).map(str::to_string).collect()))
}

/// Checks that a record supplies exactly one value per column.
///
/// # Errors
///
/// Returns [`InsertFailure::ColumnCount`] on mismatch.
pub const fn check_field_count(actual: usize, expected: usize) -> Result<(), InsertFailure> {
    if actual == expected {
        Ok(())
    } else {
        Err(InsertFailure::ColumnCount {
            expected,
            actual,
        })
    }
}
