// crates/nonprofit-locator-core/src/core/resolution.rs
// ============================================================================
// Module: Resolution Types
// Description: Lookup keys, matched rows, and resolution outcomes.
// Purpose: Describe what a cascade lookup returns to its caller.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A lookup yields either [`Resolution::Found`] with every row matched in the
//! first table of the cascade, or [`Resolution::NotFound`]. "Found with zero
//! co-located organizations" cannot occur: the matched row itself is counted.
//! Results are built fresh per request and never cached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;

use crate::core::GeoKeyStrategy;
use crate::core::IDENTIFIER_COLUMN;
use crate::core::NAME_COLUMN;
use crate::core::SourceId;
use crate::core::normalize_zip;
use crate::profile::LocationKey;
use crate::profile::state_name;

// ============================================================================
// SECTION: Search Keys
// ============================================================================

/// What a lookup matches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum SearchKey {
    /// Organization tax identifier.
    Identifier(String),
    /// Organization name.
    Name(String),
}

impl SearchKey {
    /// Builds a key from free text and the identifier flag.
    #[must_use]
    pub fn from_query(query: impl Into<String>, by_identifier: bool) -> Self {
        let query = query.into();
        if by_identifier { Self::Identifier(query) } else { Self::Name(query) }
    }

    /// Returns the column the key is compared against.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Identifier(_) => IDENTIFIER_COLUMN,
            Self::Name(_) => NAME_COLUMN,
        }
    }

    /// Returns the search text.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Identifier(value) | Self::Name(value) => value,
        }
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One named column value of a matched row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowField {
    /// Column name as projected.
    pub column: String,
    /// Stored value; `None` for SQL NULL.
    pub value: Option<String>,
}

/// A matched row with its columns in projection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationRow {
    /// Fields in projection order.
    fields: Vec<RowField>,
}

impl OrganizationRow {
    /// Creates a row from ordered fields.
    #[must_use]
    pub const fn new(fields: Vec<RowField>) -> Self {
        Self {
            fields,
        }
    }

    /// Returns the value of `column`, matched case-insensitively.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.column.eq_ignore_ascii_case(column))
            .and_then(|field| field.value.as_deref())
    }

    /// Returns column names in projection order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.column.as_str()).collect()
    }

    /// Returns the fields in projection order.
    #[must_use]
    pub fn fields(&self) -> &[RowField] {
        &self.fields
    }
}

impl Serialize for OrganizationRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.column, &field.value)?;
        }
        map.end()
    }
}

// ============================================================================
// SECTION: Geographic Keys
// ============================================================================

/// Location shared by co-located organizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoKey {
    /// Normalized zip.
    Zip {
        /// Five-character zip prefix.
        zip: String,
    },
    /// City and state pair.
    CityState {
        /// City as stored.
        city: String,
        /// State as stored.
        state: String,
    },
}

impl GeoKeyStrategy {
    /// Derives the geographic key from a matched row.
    #[must_use]
    pub fn key_for(self, row: &OrganizationRow) -> GeoKey {
        match self {
            Self::Zip {
                column,
            } => GeoKey::Zip {
                zip: normalize_zip(row.get(column).unwrap_or_default()).to_string(),
            },
            Self::CityState {
                city,
                state,
            } => GeoKey::CityState {
                city: row.get(city).unwrap_or_default().to_string(),
                state: row.get(state).unwrap_or_default().to_string(),
            },
        }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Rows matched in the winning table plus the co-located count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// Source whose table matched first.
    pub source: SourceId,
    /// Table the rows came from.
    pub table_name: String,
    /// Every matching row, in table order.
    pub matched_rows: Vec<OrganizationRow>,
    /// Geographic key of the first matched row.
    pub geo_key: GeoKey,
    /// Rows in the same table sharing `geo_key`.
    pub co_located_count: u64,
}

impl ResolutionResult {
    /// Returns the first matched row.
    #[must_use]
    pub fn primary(&self) -> Option<&OrganizationRow> {
        self.matched_rows.first()
    }

    /// Derives the location key handed to the statistics collaborator.
    ///
    /// Prefers the primary row's normalized zip, then the full name of its
    /// state (the raw value when the code is not a known postal code).
    #[must_use]
    pub fn location_key(&self) -> Option<LocationKey> {
        let row = self.primary()?;
        if let Some(zip) = row.get("zip").map(normalize_zip).filter(|zip| !zip.trim().is_empty()) {
            return Some(LocationKey::Zip(zip.to_string()));
        }
        row.get("state").map(str::trim).filter(|state| !state.is_empty()).map(|state| {
            LocationKey::State(state_name(state).map_or_else(|| state.to_string(), str::to_string))
        })
    }
}

/// Outcome of a cascade lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    /// A table matched.
    Found(ResolutionResult),
    /// No table matched.
    NotFound,
}

impl Resolution {
    /// Returns the result when found.
    #[must_use]
    pub const fn found(&self) -> Option<&ResolutionResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound => None,
        }
    }

    /// Returns true when no table matched.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
