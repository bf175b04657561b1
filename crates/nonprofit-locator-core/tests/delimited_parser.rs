// crates/nonprofit-locator-core/tests/delimited_parser.rs
// ============================================================================
// Module: Delimited Parser Tests
// Description: Line splitting, blank-line skipping, and field-count checks.
// Purpose: Ensure text records are split positionally and blanks never insert.
// ============================================================================

//! ## Overview
//! Covers positional splitting of delimited lines:
//! - CR/LF terminators are stripped before splitting
//! - blank lines yield no record
//! - field-count mismatches are reported with both counts

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use nonprofit_locator_core::InsertFailure;
use nonprofit_locator_core::RawRecord;
use nonprofit_locator_core::check_field_count;
use nonprofit_locator_core::parse_delimited_line;

fn fields(record: RawRecord) -> Vec<String> {
    match record {
        RawRecord::Delimited(fields) => fields,
        RawRecord::Document(_) => panic!("expected delimited record"),
    }
}

#[test]
fn splits_on_pipe_and_strips_terminators() {
    let record = parse_delimited_line("010000001|EXAMPLE FOUNDATION|CHICAGO|IL|United States|PC\r\n", '|')
        .expect("record");
    assert_eq!(
        fields(record),
        vec!["010000001", "EXAMPLE FOUNDATION", "CHICAGO", "IL", "United States", "PC"]
    );
}

#[test]
fn keeps_empty_positional_fields() {
    let record = parse_delimited_line("1||3|\n", '|').expect("record");
    assert_eq!(fields(record), vec!["1", "", "3", ""]);
}

#[test]
fn blank_lines_are_skipped() {
    assert!(parse_delimited_line("", '|').is_none());
    assert!(parse_delimited_line("\n", '|').is_none());
    assert!(parse_delimited_line("   \r\n", '|').is_none());
}

#[test]
fn field_count_mismatch_is_an_insert_failure() {
    assert!(check_field_count(6, 6).is_ok());
    assert_eq!(
        check_field_count(2, 6),
        Err(InsertFailure::ColumnCount {
            expected: 6,
            actual: 2,
        })
    );
}
