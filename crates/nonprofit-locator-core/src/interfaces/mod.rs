// crates/nonprofit-locator-core/src/interfaces/mod.rs
// ============================================================================
// Module: Nonprofit Locator Interfaces
// Description: Seams to the operator, progress display, and statistics service.
// Purpose: Keep the loader and resolver free of terminal and network concerns.
// Dependencies: crate::core, crate::profile
// ============================================================================

//! ## Overview
//! The store reports progress through [`ProgressObserver`], asks before
//! destroying an existing database through [`OverwritePolicy`], and hands
//! resolved locations to a [`LocationProfileProvider`]. None of these affect
//! control flow beyond what their return values state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::core::SourceId;
use crate::profile::LocationKey;
use crate::profile::LocationProfile;
use crate::profile::ProfileError;

// ============================================================================
// SECTION: Progress
// ============================================================================

/// Receives the monotonic per-source attempted counter during a load.
pub trait ProgressObserver {
    /// Called after each attempted record.
    fn on_progress(&self, source: SourceId, attempted: u64);

    /// Called once when a source finishes loading.
    fn on_source_complete(&self, _source: SourceId, _attempted: u64) {}
}

/// Observer that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _source: SourceId, _attempted: u64) {}
}

// ============================================================================
// SECTION: Overwrite Policy
// ============================================================================

/// Asks an operator whether an existing database may be destroyed.
pub trait OverwritePrompt {
    /// Returns true when the database at `path` may be overwritten.
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

/// What to do when the target database already exists.
#[derive(Clone, Copy)]
pub enum OverwritePolicy<'a> {
    /// Leave the existing database untouched.
    Reject,
    /// Defer to a prompt.
    Confirm(&'a dyn OverwritePrompt),
    /// Overwrite without asking.
    Force,
}

impl OverwritePolicy<'_> {
    /// Returns true when the database at `path` may be overwritten.
    #[must_use]
    pub fn allows_overwrite(&self, path: &Path) -> bool {
        match self {
            Self::Reject => false,
            Self::Confirm(prompt) => prompt.confirm_overwrite(path),
            Self::Force => true,
        }
    }
}

impl std::fmt::Debug for OverwritePolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => f.write_str("Reject"),
            Self::Confirm(_) => f.write_str("Confirm"),
            Self::Force => f.write_str("Force"),
        }
    }
}

// ============================================================================
// SECTION: Statistics Collaborator
// ============================================================================

/// External source of community statistics for a location.
pub trait LocationProfileProvider {
    /// Returns the statistics profile for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] when the location is unknown or the provider
    /// fails.
    fn profile_for(&self, key: &LocationKey) -> Result<LocationProfile, ProfileError>;
}
