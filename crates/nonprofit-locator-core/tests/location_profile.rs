// crates/nonprofit-locator-core/tests/location_profile.rs
// ============================================================================
// Module: Location Profile Tests
// Description: Location-key derivation and percentile ranking.
// Purpose: Pin the handoff from a resolved row to the statistics collaborator.
// ============================================================================

//! ## Overview
//! Covers the location-key handoff from a resolved row and percentile
//! ranking over the in-memory profile table.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::float_cmp,
    reason = "Test-only assertions and helpers are permitted."
)]

use nonprofit_locator_core::GeoKey;
use nonprofit_locator_core::LocationKey;
use nonprofit_locator_core::LocationProfile;
use nonprofit_locator_core::LocationProfileProvider;
use nonprofit_locator_core::OrganizationRow;
use nonprofit_locator_core::ProfileError;
use nonprofit_locator_core::ProfileMetric;
use nonprofit_locator_core::ProfileTable;
use nonprofit_locator_core::ResolutionResult;
use nonprofit_locator_core::RowField;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::percentile_rank;
use nonprofit_locator_core::state_name;
use proptest::prelude::*;

fn row(pairs: &[(&str, Option<&str>)]) -> OrganizationRow {
    OrganizationRow::new(
        pairs
            .iter()
            .map(|(column, value)| RowField {
                column: (*column).to_string(),
                value: value.map(str::to_string),
            })
            .collect(),
    )
}

fn result_for(primary: OrganizationRow) -> ResolutionResult {
    ResolutionResult {
        source: SourceId::Postcards,
        table_name: "postcard_forms".to_string(),
        matched_rows: vec![primary],
        geo_key: GeoKey::Zip {
            zip: String::new(),
        },
        co_located_count: 1,
    }
}

fn profile(population: f64) -> LocationProfile {
    LocationProfile {
        population,
        median_income: population * 2.0,
        mean_age: 40.0,
        percent_kids_households: 30.0,
    }
}

#[test]
fn zip_is_preferred_and_normalized() {
    let result = result_for(row(&[("zip", Some("606051234")), ("state", Some("IL"))]));
    assert_eq!(result.location_key(), Some(LocationKey::Zip("60605".to_string())));
}

#[test]
fn state_name_is_used_without_zip() {
    let result = result_for(row(&[("city", Some("CHICAGO")), ("state", Some("il"))]));
    assert_eq!(result.location_key(), Some(LocationKey::State("Illinois".to_string())));
}

#[test]
fn blank_zip_falls_through_to_state() {
    let result = result_for(row(&[("zip", Some("  ")), ("state", Some("CO"))]));
    assert_eq!(result.location_key(), Some(LocationKey::State("Colorado".to_string())));
}

#[test]
fn unknown_state_code_passes_through() {
    assert_eq!(state_name("ZZ"), None);
    let result = result_for(row(&[("state", Some("ZZ"))]));
    assert_eq!(result.location_key(), Some(LocationKey::State("ZZ".to_string())));
}

#[test]
fn no_location_columns_yield_no_key() {
    let result = result_for(row(&[("ein", Some("1")), ("zip", None)]));
    assert_eq!(result.location_key(), None);
}

#[test]
fn percentile_rank_matches_interpolated_scan() {
    let population: Vec<f64> = (1 ..= 100).map(f64::from).collect();
    assert_eq!(percentile_rank(&population, 50.0), 49);
    assert_eq!(percentile_rank(&population, 1.0), 0);
    assert_eq!(percentile_rank(&population, 0.0), 0);
    assert_eq!(percentile_rank(&population, 1000.0), 99);
}

#[test]
fn percentile_rank_ignores_nan_and_handles_empty() {
    assert_eq!(percentile_rank(&[], 5.0), 99);
    assert_eq!(percentile_rank(&[f64::NAN, 1.0, 2.0], 1.0), 0);
}

#[test]
fn profile_table_ranks_against_same_kind_only() {
    let mut table = ProfileTable::new();
    for (index, zip) in ["60601", "60602", "60603", "60604", "60605"].into_iter().enumerate() {
        let population = f64::from(u32::try_from(index).expect("index") + 1) * 100.0;
        table.insert(LocationKey::Zip(zip.to_string()), profile(population));
    }
    table.insert(LocationKey::State("Illinois".to_string()), profile(1.0e9));
    assert_eq!(table.len(), 6);

    let ranks = table.percentiles(&LocationKey::Zip("60605".to_string())).expect("ranks");
    assert_eq!(ranks.len(), ProfileMetric::ALL.len());
    let population_rank =
        ranks.iter().find(|(metric, _)| *metric == ProfileMetric::Population).map(|(_, rank)| *rank);
    assert_eq!(population_rank, Some(99));
}

#[test]
fn unknown_location_is_reported() {
    let table = ProfileTable::new();
    let key = LocationKey::Zip("00000".to_string());
    assert!(table.is_empty());
    assert_eq!(table.profile_for(&key), Err(ProfileError::UnknownLocation("00000".to_string())));
    assert!(table.percentiles(&key).is_err());
}

proptest! {
    #[test]
    fn percentile_rank_stays_in_range(
        population in proptest::collection::vec(-1.0e6_f64 .. 1.0e6, 0 .. 50),
        benchmark in -2.0e6_f64 .. 2.0e6,
    ) {
        prop_assert!(percentile_rank(&population, benchmark) <= 99);
    }
}
