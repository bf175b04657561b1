// crates/nonprofit-locator-core/src/core/record.rs
// ============================================================================
// Module: Records
// Description: Raw parsed records and the rows written from them.
// Purpose: Carry one input unit from a parser to a single row insertion.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RawRecord`] is either the positional fields of one delimited line or
//! the extracted fields of one document. Records are ephemeral: produced and
//! consumed within one load step. [`RawRecord::into_row`] is the only place a
//! [`FieldValue::Missing`] becomes an empty stored value.

use serde::Serialize;

// ============================================================================
// SECTION: Field Values
// ============================================================================

/// Value of a logical document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// A candidate path matched; holds its (possibly empty) text.
    Present(String),
    /// No candidate path matched.
    Missing,
}

impl FieldValue {
    /// Returns the extracted text, if any path matched.
    #[must_use]
    pub fn as_present(&self) -> Option<&str> {
        match self {
            Self::Present(value) => Some(value),
            Self::Missing => None,
        }
    }

    /// Returns true when no candidate path matched.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Converts to the stored representation; missing degrades to empty.
    #[must_use]
    pub fn into_stored(self) -> String {
        match self {
            Self::Present(value) => value,
            Self::Missing => String::new(),
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Fields extracted from one document, in canonical column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    /// `(column, value)` pairs in canonical order.
    fields: Vec<(String, FieldValue)>,
}

impl DocumentRecord {
    /// Creates a document record from ordered fields.
    #[must_use]
    pub const fn new(fields: Vec<(String, FieldValue)>) -> Self {
        Self {
            fields,
        }
    }

    /// Returns the value extracted for `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Returns the columns with no matching path.
    #[must_use]
    pub fn missing_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, value)| value.is_missing())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One parsed unit of input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum RawRecord {
    /// Positional fields of a delimited line.
    Delimited(Vec<String>),
    /// Extracted fields of a document.
    Document(DocumentRecord),
}

impl RawRecord {
    /// Converts the record into row values in column order.
    #[must_use]
    pub fn into_row(self) -> NormalizedRow {
        match self {
            Self::Delimited(fields) => NormalizedRow::new(fields),
            Self::Document(record) => NormalizedRow::new(
                record.fields.into_iter().map(|(_, value)| value.into_stored()).collect(),
            ),
        }
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Row values in table column order, stored as raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRow {
    /// Values in column order.
    values: Vec<String>,
}

impl NormalizedRow {
    /// Creates a row from ordered values.
    #[must_use]
    pub const fn new(values: Vec<String>) -> Self {
        Self {
            values,
        }
    }

    /// Returns the values in column order.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Consumes the row into its values.
    #[must_use]
    pub fn into_values(self) -> Vec<String> {
        self.values
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the row has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
