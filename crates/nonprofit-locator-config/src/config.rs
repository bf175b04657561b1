// crates/nonprofit-locator-config/src/config.rs
// ============================================================================
// Module: Nonprofit Locator Configuration
// Description: Configuration loading and validation for builds and lookups.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: nonprofit-locator-core, nonprofit-locator-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is read from the path given on the command line, else from
//! `NONPROFIT_LOCATOR_CONFIG`, else from `nonprofit-locator.toml` in the
//! working directory. An explicitly named file must exist; the default file
//! is optional and its absence yields [`LocatorConfig::default`]. Every
//! section validates its own limits and invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use nonprofit_locator_store_sqlite::SqliteStoreConfig;
use nonprofit_locator_store_sqlite::SqliteStoreMode;
use nonprofit_locator_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "nonprofit-locator.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "NONPROFIT_LOCATOR_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum busy timeout accepted for store connections (ms).
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Default number of records between progress reports.
const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Store pragmas.
    #[serde(default)]
    pub store: StoreConfig,
    /// Source locations.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Ingestion defaults.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// File the configuration was read from, if any (not serialized).
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

/// How the config path was chosen.
enum ConfigLocation {
    /// Named on the command line or in the environment; must exist.
    Required(PathBuf),
    /// The default file name; optional.
    Default(PathBuf),
}

impl LocatorConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when reading, parsing, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, required) = match resolve_path(path)? {
            ConfigLocation::Required(path) => (path, true),
            ConfigLocation::Default(path) => (path, false),
        };
        validate_path(&resolved)?;
        if !required && !resolved.is_file() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        config.loaded_from = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values outside their limits.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.sources.validate()?;
        self.ingest.validate()
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the busy timeout is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.busy_timeout_ms
            )));
        }
        Ok(())
    }

    /// Builds the store configuration for the database at `path`.
    #[must_use]
    pub fn store_config(&self, path: PathBuf) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Returns the default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Sources
// ============================================================================

/// `[sources]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Directory the bulk downloads were unpacked into.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    /// Eligibility list file, overriding the default layout.
    #[serde(default)]
    pub eligibility: Option<PathBuf>,
    /// Filings folder, overriding the default layout.
    #[serde(default)]
    pub filings: Option<PathBuf>,
    /// Postcard list file, overriding the default layout.
    #[serde(default)]
    pub postcards: Option<PathBuf>,
    /// Revocation list file, overriding the default layout.
    #[serde(default)]
    pub revocations: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            eligibility: None,
            filings: None,
            postcards: None,
            revocations: None,
        }
    }
}

impl SourcesConfig {
    /// Validates configured paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for empty or overlong paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("sources.data_root", &self.data_root.to_string_lossy())?;
        for id in SourceId::ALL {
            if let Some(path) = self.override_for(id) {
                validate_path_string(&format!("sources.{id}"), &path.to_string_lossy())?;
            }
        }
        Ok(())
    }

    /// Returns the configured override for `id`.
    #[must_use]
    pub fn override_for(&self, id: SourceId) -> Option<&Path> {
        match id {
            SourceId::Eligibility => self.eligibility.as_deref(),
            SourceId::Filings => self.filings.as_deref(),
            SourceId::Postcards => self.postcards.as_deref(),
            SourceId::Revocations => self.revocations.as_deref(),
        }
    }

    /// Rewrites source locations in `registry` with the configured overrides.
    ///
    /// Relative overrides stay relative to `data_root`.
    pub fn apply_overrides(&self, registry: &mut SourceRegistry) {
        for id in SourceId::ALL {
            if let Some(path) = self.override_for(id)
                && let Some(descriptor) = registry.get_mut(id)
            {
                descriptor.default_path = path.to_path_buf();
            }
        }
    }
}

/// Returns the default data root.
fn default_data_root() -> PathBuf {
    PathBuf::from(".")
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

/// `[ingest]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Default per-source attempt limit.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Records between progress reports.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// JSON-lines audit log file.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    /// Emit audit events to stderr when no audit log is set.
    #[serde(default)]
    pub audit_stderr: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limit: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            audit_log: None,
            audit_stderr: false,
        }
    }
}

impl IngestConfig {
    /// Validates ingestion limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero limits or intervals and
    /// unusable audit paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == Some(0) {
            return Err(ConfigError::Invalid(
                "ingest.limit must be greater than zero".to_string(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(ConfigError::Invalid(
                "ingest.progress_interval must be greater than zero".to_string(),
            ));
        }
        if let Some(path) = &self.audit_log {
            validate_path_string("ingest.audit_log", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Returns the default progress interval.
const fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<ConfigLocation, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigLocation::Required(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigLocation::Required(PathBuf::from(env_path)));
    }
    Ok(ConfigLocation::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
