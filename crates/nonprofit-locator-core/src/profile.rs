// crates/nonprofit-locator-core/src/profile.rs
// ============================================================================
// Module: Location Profiles
// Description: Location keys and the community-statistics collaborator seam.
// Purpose: Hand a resolved location to an external statistics provider.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Resolution stops at a [`LocationKey`]. Community statistics come from an
//! external service behind [`LocationProfileProvider`]; [`ProfileTable`] is
//! the in-memory form of such a population, used to rank one location
//! against all others with [`percentile_rank`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::interfaces::LocationProfileProvider;

// ============================================================================
// SECTION: State Names
// ============================================================================

/// Two-letter postal codes and the names statistics services key states by.
const STATE_NAMES: &[(&str, &str)] = &[
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AS", "American Samoa"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DC", "District of Columbia"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("GU", "Guam"),
    ("HI", "Hawaii"),
    ("IA", "Iowa"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MA", "Massachusetts"),
    ("MD", "Maryland"),
    ("ME", "Maine"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MO", "Missouri"),
    ("MP", "Northern Mariana Islands"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("NA", "National"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("PR", "Puerto Rico"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("VI", "Virgin Islands"),
    ("VT", "Vermont"),
    ("WA", "Washington"),
    ("WI", "Wisconsin"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
];

/// Returns the full name for a two-letter state code.
#[must_use]
pub fn state_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    STATE_NAMES.iter().find(|(abbr, _)| abbr.eq_ignore_ascii_case(code)).map(|(_, name)| *name)
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Location handed to the statistics collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LocationKey {
    /// Five-digit zip tabulation area.
    Zip(String),
    /// Full state name.
    State(String),
}

impl LocationKey {
    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Zip(value) | Self::State(value) => value,
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Community statistics for one location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationProfile {
    /// Total population.
    pub population: f64,
    /// Median household income.
    pub median_income: f64,
    /// Mean age.
    pub mean_age: f64,
    /// Percent of households with children.
    pub percent_kids_households: f64,
}

/// Metrics carried by a [`LocationProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMetric {
    /// Total population.
    Population,
    /// Median household income.
    MedianIncome,
    /// Mean age.
    MeanAge,
    /// Percent of households with children.
    PercentKidsHouseholds,
}

impl ProfileMetric {
    /// All metrics in display order.
    pub const ALL: [Self; 4] =
        [Self::Population, Self::MedianIncome, Self::MeanAge, Self::PercentKidsHouseholds];
}

impl LocationProfile {
    /// Returns the value of `metric`.
    #[must_use]
    pub const fn metric(&self, metric: ProfileMetric) -> f64 {
        match metric {
            ProfileMetric::Population => self.population,
            ProfileMetric::MedianIncome => self.median_income,
            ProfileMetric::MeanAge => self.mean_age,
            ProfileMetric::PercentKidsHouseholds => self.percent_kids_households,
        }
    }
}

/// Statistics collaborator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// No statistics exist for the location.
    #[error("no profile for location {0}")]
    UnknownLocation(String),
    /// The collaborator failed.
    #[error("profile provider error: {0}")]
    Provider(String),
}

// ============================================================================
// SECTION: Percentiles
// ============================================================================

/// Ranks `benchmark` within `population` on a 0-99 scale.
///
/// Scans interpolated percentiles 0..=99 (NaN values ignored) and returns the
/// last one strictly below the benchmark; 0 when the benchmark is at or under
/// the minimum, 99 when no percentile reaches it.
#[must_use]
pub fn percentile_rank(population: &[f64], benchmark: f64) -> u8 {
    let mut sorted: Vec<f64> = population.iter().copied().filter(|value| !value.is_nan()).collect();
    if sorted.is_empty() {
        return 99;
    }
    sorted.sort_by(f64::total_cmp);
    for percentile in 0_u8 .. 100 {
        if interpolated_percentile(&sorted, percentile) >= benchmark {
            return percentile.saturating_sub(1);
        }
    }
    99
}

/// Linear-interpolated percentile of a sorted, NaN-free, non-empty slice.
fn interpolated_percentile(sorted: &[f64], percentile: u8) -> f64 {
    let position = usize::from(percentile) * (sorted.len() - 1);
    let lower = position / 100;
    let upper = position.div_ceil(100);
    let fraction = u32::try_from(position % 100).map_or(0.0, f64::from) / 100.0;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

// ============================================================================
// SECTION: Profile Table
// ============================================================================

/// In-memory population of location profiles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileTable {
    /// Profiles keyed by location.
    entries: BTreeMap<LocationKey, LocationProfile>,
}

impl ProfileTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the profile for `key`.
    pub fn insert(&mut self, key: LocationKey, profile: LocationProfile) {
        self.entries.insert(key, profile);
    }

    /// Returns the number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ranks `key` against every location of the same kind, per metric.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownLocation`] when `key` is absent.
    pub fn percentiles(&self, key: &LocationKey) -> Result<Vec<(ProfileMetric, u8)>, ProfileError> {
        let profile = self.profile_for(key)?;
        let peers: Vec<&LocationProfile> = self
            .entries
            .iter()
            .filter(|(other, _)| std::mem::discriminant(*other) == std::mem::discriminant(key))
            .map(|(_, profile)| profile)
            .collect();
        Ok(ProfileMetric::ALL
            .into_iter()
            .map(|metric| {
                let values: Vec<f64> = peers.iter().map(|peer| peer.metric(metric)).collect();
                (metric, percentile_rank(&values, profile.metric(metric)))
            })
            .collect())
    }
}

impl LocationProfileProvider for ProfileTable {
    fn profile_for(&self, key: &LocationKey) -> Result<LocationProfile, ProfileError> {
        self.entries.get(key).copied().ok_or_else(|| ProfileError::UnknownLocation(key.to_string()))
    }
}
