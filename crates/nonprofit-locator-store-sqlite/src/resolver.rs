// crates/nonprofit-locator-store-sqlite/src/resolver.rs
// ============================================================================
// Module: Resolution Engine
// Description: Prioritized multi-table lookup with co-located counting.
// Purpose: Resolve one organization by name or identifier across all tables.
// Dependencies: nonprofit-locator-core, rusqlite
// ============================================================================

//! ## Overview
//! Tables are searched in the registry's resolution order. The first table
//! returning any row wins and later tables are never queried. Each table's
//! [`TableStrategy`] chooses the projected columns and the geographic key;
//! a second query on the winning table counts rows sharing that key.
//! Name and identifier comparisons are case-insensitive. Tables absent from
//! the store (a partial build) are skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use nonprofit_locator_core::GeoKey;
use nonprofit_locator_core::GeoKeyStrategy;
use nonprofit_locator_core::OrganizationRow;
use nonprofit_locator_core::ProjectedColumn;
use nonprofit_locator_core::Projection;
use nonprofit_locator_core::Resolution;
use nonprofit_locator_core::ResolutionResult;
use nonprofit_locator_core::RowField;
use nonprofit_locator_core::SearchKey;
use nonprofit_locator_core::SourceDescriptor;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_core::TableStrategy;
use nonprofit_locator_core::ZIP_FUNCTION_NAME;
use rusqlite::Connection;
use rusqlite::params;

use crate::store::OrganizationStore;
use crate::store::SqliteStoreError;
use crate::store::count_to_u64;
use crate::store::quote_identifier;
use crate::store::table_exists;
use crate::store::value_text;

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves `key` against the store's tables in cascade order.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when a query fails; a lookup with no match
/// is [`Resolution::NotFound`], never an error.
pub fn resolve(
    store: &OrganizationStore,
    registry: &SourceRegistry,
    key: &SearchKey,
) -> Result<Resolution, SqliteStoreError> {
    let connection = store.connection()?;
    for descriptor in registry.resolution_order() {
        if !table_exists(&connection, &descriptor.table_name)? {
            continue;
        }
        let strategy = descriptor.id.strategy();
        let matched_rows = find_matches(&connection, descriptor, strategy, key)?;
        let Some(primary) = matched_rows.first() else {
            continue;
        };
        let geo_key = strategy.geo_key.key_for(primary);
        let co_located_count = count_co_located(&connection, &descriptor.table_name, strategy, &geo_key)?;
        return Ok(Resolution::Found(ResolutionResult {
            source: descriptor.id,
            table_name: descriptor.table_name.clone(),
            matched_rows,
            geo_key,
            co_located_count,
        }));
    }
    Ok(Resolution::NotFound)
}

/// Returns every row of one table matching `key`, in table order.
fn find_matches(
    connection: &Connection,
    descriptor: &SourceDescriptor,
    strategy: &TableStrategy,
    key: &SearchKey,
) -> Result<Vec<OrganizationRow>, SqliteStoreError> {
    let table = quote_identifier(&descriptor.table_name)?;
    let column = quote_identifier(key.column())?;
    let projection = projection_sql(strategy.projection)?;
    let mut stmt = connection.prepare(&format!(
        "SELECT {projection} FROM {table} WHERE {column} = ?1 COLLATE NOCASE ORDER BY rowid"
    ))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query(params![key.value()])?;
    let mut matched = Vec::new();
    while let Some(row) = rows.next()? {
        let mut fields = Vec::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            fields.push(RowField {
                column: name.clone(),
                value: value_text(row.get_ref(index)?),
            });
        }
        matched.push(OrganizationRow::new(fields));
    }
    Ok(matched)
}

/// Counts rows of `table` sharing `geo_key`.
fn count_co_located(
    connection: &Connection,
    table: &str,
    strategy: &TableStrategy,
    geo_key: &GeoKey,
) -> Result<u64, SqliteStoreError> {
    let table = quote_identifier(table)?;
    let count: i64 = match (strategy.geo_key, geo_key) {
        (
            GeoKeyStrategy::Zip {
                column,
            },
            GeoKey::Zip {
                zip,
            },
        ) => {
            let column = quote_identifier(column)?;
            connection.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {table} WHERE \
                     {ZIP_FUNCTION_NAME}({column}) = {ZIP_FUNCTION_NAME}(?1)"
                ),
                params![zip],
                |row| row.get(0),
            )?
        }
        (
            GeoKeyStrategy::CityState {
                city: city_column,
                state: state_column,
            },
            GeoKey::CityState {
                city,
                state,
            },
        ) => {
            let city_column = quote_identifier(city_column)?;
            let state_column = quote_identifier(state_column)?;
            connection.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {table} WHERE {city_column} = ?1 AND {state_column} = ?2"
                ),
                params![city, state],
                |row| row.get(0),
            )?
        }
        _ => {
            return Err(SqliteStoreError::Invalid(
                "geographic key does not match table strategy".to_string(),
            ));
        }
    };
    count_to_u64(count)
}

/// Renders a projection as a select list.
fn projection_sql(projection: Projection) -> Result<String, SqliteStoreError> {
    match projection {
        Projection::All => Ok("*".to_string()),
        Projection::Columns(columns) => {
            let rendered = columns
                .iter()
                .map(|column| match column {
                    ProjectedColumn::Plain(name) => quote_identifier(name),
                    ProjectedColumn::NormalizedZip(name) => quote_identifier(name)
                        .map(|quoted| format!("{ZIP_FUNCTION_NAME}({quoted}) AS {quoted}")),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rendered.join(", "))
        }
    }
}
