// crates/nonprofit-locator-store-sqlite/src/ingest.rs
// ============================================================================
// Module: Ingestion Run
// Description: Creates tables and loads every selected source in turn.
// Purpose: Run a multi-source build that never aborts on one bad source.
// Dependencies: nonprofit-locator-core, serde
// ============================================================================

//! ## Overview
//! [`ingest_sources`] walks the registry selection in load order. For each
//! source it creates the table and loads the file or folder found under the
//! data root. A source that cannot be read or written becomes a
//! [`SourceOutcome::Failed`] entry and the run moves on. The merged
//! [`FailureLedger`] of all sources is always reported.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use nonprofit_locator_core::FailureLedger;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use serde::Serialize;

use crate::audit::IngestAuditEvent;
use crate::builder::create_table;
use crate::loader::LoadError;
use crate::loader::LoadOptions;
use crate::loader::SourceLoadReport;
use crate::loader::load_source;
use crate::store::OrganizationStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of one source within a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The source was loaded; individual records may still have failed.
    Loaded(SourceLoadReport),
    /// The source could not be read or written.
    Failed {
        /// Source that failed.
        source: SourceId,
        /// Location that was attempted.
        path: PathBuf,
        /// Failure message.
        message: String,
    },
}

impl SourceOutcome {
    /// Returns the source this outcome describes.
    #[must_use]
    pub const fn source(&self) -> SourceId {
        match self {
            Self::Loaded(report) => report.source,
            Self::Failed {
                source,
                ..
            } => *source,
        }
    }
}

/// Summary of a multi-source build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Per-source outcomes in load order.
    pub sources: Vec<SourceOutcome>,
    /// Record failures merged across all loaded sources.
    pub ledger: FailureLedger,
}

impl BuildReport {
    /// Returns the number of failed locations (files or documents).
    #[must_use]
    pub fn failed_location_count(&self) -> usize {
        self.ledger.len()
    }

    /// Returns the number of failed records across all locations.
    #[must_use]
    pub fn failed_record_count(&self) -> usize {
        self.ledger.failed_record_count()
    }

    /// Returns the total rows written.
    #[must_use]
    pub fn inserted_total(&self) -> u64 {
        self.sources
            .iter()
            .map(|outcome| match outcome {
                SourceOutcome::Loaded(report) => report.inserted,
                SourceOutcome::Failed {
                    ..
                } => 0,
            })
            .sum()
    }

    /// Returns the sources that could not be loaded.
    #[must_use]
    pub fn failed_sources(&self) -> Vec<SourceId> {
        self.sources
            .iter()
            .filter(|outcome| matches!(outcome, SourceOutcome::Failed { .. }))
            .map(SourceOutcome::source)
            .collect()
    }
}

// ============================================================================
// SECTION: Run
// ============================================================================

/// Creates tables for and loads the selected sources from `data_root`.
///
/// `only` restricts the run to one source. Each descriptor's path is
/// resolved with [`nonprofit_locator_core::SourceDescriptor::path_under`].
#[must_use]
pub fn ingest_sources(
    store: &OrganizationStore,
    registry: &SourceRegistry,
    data_root: &Path,
    only: Option<SourceId>,
    options: &LoadOptions<'_>,
) -> BuildReport {
    let mut report = BuildReport::default();
    for descriptor in registry.select(only) {
        let path = descriptor.path_under(data_root);
        let loaded = create_table(store, descriptor)
            .map_err(LoadError::from)
            .and_then(|()| load_source(store, descriptor, &path, options));
        match loaded {
            Ok(source_report) => {
                report.ledger.merge(source_report.ledger.clone());
                report.sources.push(SourceOutcome::Loaded(source_report));
            }
            Err(error) => {
                let message = error.to_string();
                options.audit.record(&IngestAuditEvent::source_unreadable(
                    descriptor.id,
                    &path,
                    message.clone(),
                ));
                report.sources.push(SourceOutcome::Failed {
                    source: descriptor.id,
                    path,
                    message,
                });
            }
        }
    }
    let failed = u64::try_from(report.failed_location_count()).unwrap_or(u64::MAX);
    options.audit.record(&IngestAuditEvent::run_finished(report.inserted_total(), failed));
    report
}
