// crates/nonprofit-locator-core/src/core/source.rs
// ============================================================================
// Module: Source Registry
// Description: Static descriptions of the four bulk-data sources.
// Purpose: Name each source's table, column order, and record format.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`SourceRegistry`] is an explicit, constructed list of
//! [`SourceDescriptor`] values handed to the table builder and record loader.
//! There is no process-wide registry; callers build one with
//! [`SourceRegistry::standard`] or assemble their own for tests.
//!
//! Each [`SourceId`] doubles as the table-variant tag used by resolution: it
//! carries a [`TableStrategy`] describing which columns a lookup projects and
//! which geographic key the co-located count aggregates on.
//!
//! ## Invariants
//! - Table and column names are plain SQL identifiers (validated).
//! - For delimited sources, `fields.len()` equals the column count of every
//!   well-formed line.
//! - For document-folder sources, the canonical field list replaces `fields`
//!   for both table creation and row writing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Resolution cascade: small-filer postcards, revocations, filings, then the
/// eligibility list.
pub const RESOLUTION_ORDER: [SourceId; 4] =
    [SourceId::Postcards, SourceId::Revocations, SourceId::Filings, SourceId::Eligibility];

/// Default delimiter for the pipe-delimited bulk files.
pub const PIPE_DELIMITER: char = '|';

/// Column holding the organization identifier in every table.
pub const IDENTIFIER_COLUMN: &str = "ein";

/// Column holding the organization name in every table.
pub const NAME_COLUMN: &str = "org_name";

// ============================================================================
// SECTION: Source Identifiers
// ============================================================================

/// Closed set of bulk-data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Eligibility list of currently recognized tax-exempt organizations.
    Eligibility,
    /// Folder of per-organization annual XML filings.
    Filings,
    /// Abbreviated small-filer postcard list.
    Postcards,
    /// Revocation list.
    Revocations,
}

impl SourceId {
    /// All sources in registry order.
    pub const ALL: [Self; 4] = [Self::Eligibility, Self::Filings, Self::Postcards, Self::Revocations];

    /// Returns the stable lower-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eligibility => "eligibility",
            Self::Filings => "filings",
            Self::Postcards => "postcards",
            Self::Revocations => "revocations",
        }
    }

    /// Returns the bulk-download selector name used on the command line.
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Eligibility => "PUB_78_DATA",
            Self::Filings => "IRS_990_FORMS",
            Self::Postcards => "IRS_990N_FORMS",
            Self::Revocations => "IRS_REVOCATIONS",
        }
    }

    /// Returns the default table name for the source.
    #[must_use]
    pub const fn default_table_name(self) -> &'static str {
        match self {
            Self::Eligibility => "pub_seven_data",
            Self::Filings => "nine_nineties",
            Self::Postcards => "postcard_forms",
            Self::Revocations => "irs_revocations",
        }
    }

    /// Returns the projection and geographic-key strategy for the source's table.
    #[must_use]
    pub const fn strategy(self) -> &'static TableStrategy {
        match self {
            Self::Eligibility => &ELIGIBILITY_STRATEGY,
            Self::Filings => &FILINGS_STRATEGY,
            Self::Postcards => &POSTCARDS_STRATEGY,
            Self::Revocations => &REVOCATIONS_STRATEGY,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a source selector is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source selector: {0}")]
pub struct UnknownSourceError(pub String);

impl FromStr for SourceId {
    type Err = UnknownSourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|id| {
                id.as_str().eq_ignore_ascii_case(trimmed) || id.selector().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownSourceError(trimmed.to_string()))
    }
}

// ============================================================================
// SECTION: Table Strategies
// ============================================================================

/// One projected column of a resolution lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectedColumn {
    /// Column returned as stored.
    Plain(&'static str),
    /// Zip column returned through the zip normalizer, under its own name.
    NormalizedZip(&'static str),
}

impl ProjectedColumn {
    /// Returns the output column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plain(name) | Self::NormalizedZip(name) => name,
        }
    }
}

/// Columns returned by a resolution lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Every table column in table order.
    All,
    /// A fixed convenience projection.
    Columns(&'static [ProjectedColumn]),
}

/// Geographic key used by the co-located count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoKeyStrategy {
    /// Count rows sharing the normalized value of a zip column.
    Zip {
        /// Zip column name.
        column: &'static str,
    },
    /// Count rows sharing an exact (city, state) pair.
    CityState {
        /// City column name.
        city: &'static str,
        /// State column name.
        state: &'static str,
    },
}

/// Per-table resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStrategy {
    /// Projection issued by the match query.
    pub projection: Projection,
    /// Aggregation key for the co-located count.
    pub geo_key: GeoKeyStrategy,
}

/// Eligibility list: no zip column, so counting falls back to city + state.
const ELIGIBILITY_STRATEGY: TableStrategy = TableStrategy {
    projection: Projection::Columns(&[
        ProjectedColumn::Plain("ein"),
        ProjectedColumn::Plain("org_name"),
        ProjectedColumn::Plain("city"),
        ProjectedColumn::Plain("state"),
        ProjectedColumn::Plain("deductibility_status_code"),
    ]),
    geo_key: GeoKeyStrategy::CityState {
        city: "city",
        state: "state",
    },
};

/// Filings: returned whole.
const FILINGS_STRATEGY: TableStrategy = TableStrategy {
    projection: Projection::All,
    geo_key: GeoKeyStrategy::Zip {
        column: "zip",
    },
};

/// Postcards.
const POSTCARDS_STRATEGY: TableStrategy = TableStrategy {
    projection: Projection::Columns(&[
        ProjectedColumn::Plain("ein"),
        ProjectedColumn::Plain("org_name"),
        ProjectedColumn::Plain("website"),
        ProjectedColumn::Plain("city"),
        ProjectedColumn::Plain("state"),
        ProjectedColumn::NormalizedZip("zip"),
    ]),
    geo_key: GeoKeyStrategy::Zip {
        column: "zip",
    },
};

/// Revocations.
const REVOCATIONS_STRATEGY: TableStrategy = TableStrategy {
    projection: Projection::Columns(&[
        ProjectedColumn::Plain("ein"),
        ProjectedColumn::Plain("org_name"),
        ProjectedColumn::Plain("city"),
        ProjectedColumn::Plain("state"),
        ProjectedColumn::NormalizedZip("zip"),
    ]),
    geo_key: GeoKeyStrategy::Zip {
        column: "zip",
    },
};

// ============================================================================
// SECTION: Field Lists
// ============================================================================

/// Eligibility list columns, in file order.
const ELIGIBILITY_FIELDS: &[&str] =
    &["ein", "org_name", "city", "state", "country", "deductibility_status_code"];

/// Postcard columns, in file order.
const POSTCARD_FIELDS: &[&str] = &[
    "ein",
    "year",
    "org_name",
    "small_org_status",
    "termination_status",
    "fiscal_year_start",
    "fiscal_year_end",
    "website",
    "contact_name",
    "street_address",
    "building_num",
    "city",
    "province",
    "state",
    "zip",
    "country",
    "mail_address",
    "mail_building_num",
    "mail_city",
    "mail_province",
    "mail_state",
    "mail_zip",
    "mail_country",
    "dba_name_1",
    "dba_name_2",
    "dba_name_3",
];

/// Revocation columns, in file order.
const REVOCATION_FIELDS: &[&str] = &[
    "ein",
    "org_name",
    "alt_name",
    "street_address",
    "city",
    "state",
    "zip",
    "country",
    "org_type",
    "date_expired",
    "date_posted",
    "date_renewed",
];

/// Canonical filing columns with their candidate document paths.
const FILING_FIELDS: &[(&str, &[&str])] = &[
    ("ein", &["Filer/EIN"]),
    (
        "org_name",
        &[
            "Filer/BusinessName/BusinessNameLine1Txt",
            "Filer/BusinessName/BusinessNameLine1",
            "Filer/Name/BusinessNameLine1",
        ],
    ),
    (
        "org_name_2",
        &[
            "Filer/BusinessName/BusinessNameLine2Txt",
            "Filer/BusinessName/BusinessNameLine2",
            "Filer/Name/BusinessNameLine2",
        ],
    ),
    ("city", &["Filer/USAddress/CityNm", "Filer/USAddress/City"]),
    ("state", &["Filer/USAddress/StateAbbreviationCd", "Filer/USAddress/State"]),
    ("website", &["IRS990/WebsiteAddressTxt", "IRS990/WebSite", "IRS990EZ/WebsiteAddressTxt"]),
    (
        "mission",
        &[
            "IRS990/ActivityOrMissionDesc",
            "IRS990/ActivityOrMissionDescription",
            "IRS990/MissionDesc",
            "IRS990EZ/PrimaryExemptPurposeTxt",
        ],
    ),
    ("zip", &["Filer/USAddress/ZIPCd", "Filer/USAddress/ZIPCode"]),
];

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// A logical document field and the ordered paths that may hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentField {
    /// Column the extracted value is written to.
    pub column: String,
    /// Namespace-free, `/`-separated candidate paths; first match wins.
    pub candidates: Vec<String>,
}

impl DocumentField {
    /// Creates a document field from a column name and candidate paths.
    #[must_use]
    pub fn new(column: impl Into<String>, candidates: &[&str]) -> Self {
        Self {
            column: column.into(),
            candidates: candidates.iter().map(|path| (*path).to_string()).collect(),
        }
    }
}

/// Record format of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFormat {
    /// One record per line, fields split on `delimiter`.
    Delimited {
        /// Field delimiter.
        delimiter: char,
    },
    /// Directory of structured documents, one record per file.
    DocumentFolder {
        /// Canonical columns persisted for every document.
        canonical: Vec<DocumentField>,
    },
}

/// Immutable description of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source identifier and table-variant tag.
    pub id: SourceId,
    /// Destination table name.
    pub table_name: String,
    /// Ordered field names as published for the source.
    pub fields: Vec<String>,
    /// Record format.
    pub format: SourceFormat,
    /// Source location relative to the data root.
    pub default_path: PathBuf,
}

impl SourceDescriptor {
    /// Builds a delimited-text descriptor.
    #[must_use]
    pub fn delimited(
        id: SourceId,
        fields: &[&str],
        delimiter: char,
        default_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            table_name: id.default_table_name().to_string(),
            fields: fields.iter().map(|field| (*field).to_string()).collect(),
            format: SourceFormat::Delimited {
                delimiter,
            },
            default_path: default_path.into(),
        }
    }

    /// Builds a document-folder descriptor; `fields` lists each canonical
    /// field's primary path.
    #[must_use]
    pub fn document_folder(
        id: SourceId,
        canonical: Vec<DocumentField>,
        default_path: impl Into<PathBuf>,
    ) -> Self {
        let fields = canonical
            .iter()
            .map(|field| field.candidates.first().cloned().unwrap_or_else(|| field.column.clone()))
            .collect();
        Self {
            id,
            table_name: id.default_table_name().to_string(),
            fields,
            format: SourceFormat::DocumentFolder {
                canonical,
            },
            default_path: default_path.into(),
        }
    }

    /// Returns true when the source is a folder of structured documents.
    #[must_use]
    pub const fn is_document_folder(&self) -> bool {
        matches!(self.format, SourceFormat::DocumentFolder { .. })
    }

    /// Returns the delimiter for text sources.
    #[must_use]
    pub const fn delimiter(&self) -> Option<char> {
        match self.format {
            SourceFormat::Delimited {
                delimiter,
            } => Some(delimiter),
            SourceFormat::DocumentFolder {
                ..
            } => None,
        }
    }

    /// Returns the columns used for table creation and row writing.
    ///
    /// Document-folder sources substitute their canonical list.
    #[must_use]
    pub fn table_columns(&self) -> Vec<&str> {
        match &self.format {
            SourceFormat::Delimited {
                ..
            } => self.fields.iter().map(String::as_str).collect(),
            SourceFormat::DocumentFolder {
                canonical,
            } => canonical.iter().map(|field| field.column.as_str()).collect(),
        }
    }

    /// Resolves the source location under `data_root`.
    #[must_use]
    pub fn path_under(&self, data_root: &Path) -> PathBuf {
        data_root.join(&self.default_path)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Errors raised by registry validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The same source was described twice.
    #[error("duplicate source descriptor: {0}")]
    DuplicateSource(SourceId),
    /// Two sources target the same table.
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),
    /// A table or column name is not a plain SQL identifier.
    #[error("invalid identifier for {source_id}: {name}")]
    InvalidIdentifier {
        /// Offending source.
        source_id: SourceId,
        /// Offending name.
        name: String,
    },
    /// A source has no columns.
    #[error("source {0} declares no columns")]
    NoColumns(SourceId),
    /// A column required by resolution is absent.
    #[error("source {source_id} is missing required column {column}")]
    MissingColumn {
        /// Offending source.
        source_id: SourceId,
        /// Required column.
        column: String,
    },
}

/// Ordered list of source descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRegistry {
    /// Descriptors in load order.
    descriptors: Vec<SourceDescriptor>,
}

impl SourceRegistry {
    /// Builds a registry from explicit descriptors after validation.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when names collide, identifiers are unsafe,
    /// or a resolution column is missing.
    pub fn new(descriptors: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        let registry = Self {
            descriptors,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// Returns the registry describing the four bulk-download sources.
    #[must_use]
    pub fn standard() -> Self {
        let canonical =
            FILING_FIELDS.iter().map(|(column, paths)| DocumentField::new(*column, paths)).collect();
        Self {
            descriptors: vec![
                SourceDescriptor::delimited(
                    SourceId::Eligibility,
                    ELIGIBILITY_FIELDS,
                    PIPE_DELIMITER,
                    "IRS_Pub_78_Data/data-download-pub78.txt",
                ),
                SourceDescriptor::document_folder(SourceId::Filings, canonical, "IRS_990_FORMS"),
                SourceDescriptor::delimited(
                    SourceId::Postcards,
                    POSTCARD_FIELDS,
                    PIPE_DELIMITER,
                    "IRS_990N_FORMS/data-download-epostcard.txt",
                ),
                SourceDescriptor::delimited(
                    SourceId::Revocations,
                    REVOCATION_FIELDS,
                    PIPE_DELIMITER,
                    "IRS_Revocations/data-download-revocation.txt",
                ),
            ],
        }
    }

    /// Returns the descriptor for `id`.
    #[must_use]
    pub fn get(&self, id: SourceId) -> Option<&SourceDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.id == id)
    }

    /// Returns a mutable descriptor for `id`.
    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut SourceDescriptor> {
        self.descriptors.iter_mut().find(|descriptor| descriptor.id == id)
    }

    /// Iterates descriptors in load order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.descriptors.iter()
    }

    /// Returns the descriptors to load: all of them, or only `only`.
    #[must_use]
    pub fn select(&self, only: Option<SourceId>) -> Vec<&SourceDescriptor> {
        self.descriptors.iter().filter(|descriptor| only.is_none_or(|id| descriptor.id == id)).collect()
    }

    /// Returns descriptors in resolution cascade order, skipping absent sources.
    #[must_use]
    pub fn resolution_order(&self) -> Vec<&SourceDescriptor> {
        RESOLUTION_ORDER.iter().filter_map(|id| self.get(*id)).collect()
    }

    /// Validates identifier safety and required columns.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on the first violation found.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut ids = BTreeSet::new();
        let mut tables = BTreeSet::new();
        for descriptor in &self.descriptors {
            if !ids.insert(descriptor.id) {
                return Err(RegistryError::DuplicateSource(descriptor.id));
            }
            if !tables.insert(descriptor.table_name.to_ascii_lowercase()) {
                return Err(RegistryError::DuplicateTable(descriptor.table_name.clone()));
            }
            if !is_sql_identifier(&descriptor.table_name) {
                return Err(RegistryError::InvalidIdentifier {
                    source_id: descriptor.id,
                    name: descriptor.table_name.clone(),
                });
            }
            let columns = descriptor.table_columns();
            if columns.is_empty() {
                return Err(RegistryError::NoColumns(descriptor.id));
            }
            if let Some(bad) = columns.iter().find(|column| !is_sql_identifier(column)) {
                return Err(RegistryError::InvalidIdentifier {
                    source_id: descriptor.id,
                    name: (*bad).to_string(),
                });
            }
            for required in required_columns(descriptor.id) {
                if !columns.contains(&required) {
                    return Err(RegistryError::MissingColumn {
                        source_id: descriptor.id,
                        column: required.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Columns the resolution engine reads from a source's table.
fn required_columns(id: SourceId) -> Vec<&'static str> {
    let strategy = id.strategy();
    let mut columns = vec![IDENTIFIER_COLUMN, NAME_COLUMN];
    if let Projection::Columns(projected) = strategy.projection {
        columns.extend(projected.iter().map(|column| column.name()));
    }
    match strategy.geo_key {
        GeoKeyStrategy::Zip {
            column,
        } => columns.push(column),
        GeoKeyStrategy::CityState {
            city,
            state,
        } => {
            columns.push(city);
            columns.push(state);
        }
    }
    columns
}

/// Returns true for names safe to interpolate as SQL identifiers.
#[must_use]
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
