// crates/nonprofit-locator-cli/src/main.rs
// ============================================================================
// Module: Nonprofit Locator CLI Entry Point
// Description: Command dispatcher for database builds and organization lookups.
// Purpose: Provide a catalog-worded CLI over the ingestion and resolution crates.
// Dependencies: clap, nonprofit-locator-{config,core,store-sqlite}, serde, thiserror.
// ============================================================================

//! ## Overview
//! `nonprofit-locator build` creates the `SQLite` database from the unpacked
//! bulk downloads, `resolve` looks one organization up by name or
//! identifier, `sources` lists the source registry, and `config validate`
//! checks `nonprofit-locator.toml`. All user-facing strings are routed
//! through the message catalog. Declining to overwrite an existing database
//! is a successful no-op.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use nonprofit_locator_cli::t;
use nonprofit_locator_config::IngestConfig;
use nonprofit_locator_config::LocatorConfig;
use nonprofit_locator_core::LocationKey;
use nonprofit_locator_core::OverwritePolicy;
use nonprofit_locator_core::OverwritePrompt;
use nonprofit_locator_core::ProgressObserver;
use nonprofit_locator_core::Resolution;
use nonprofit_locator_core::ResolutionResult;
use nonprofit_locator_core::SearchKey;
use nonprofit_locator_core::SourceFormat;
use nonprofit_locator_core::SourceId;
use nonprofit_locator_core::SourceRegistry;
use nonprofit_locator_store_sqlite::BuildReport;
use nonprofit_locator_store_sqlite::DatabaseOutcome;
use nonprofit_locator_store_sqlite::IngestAuditSink;
use nonprofit_locator_store_sqlite::IngestFileAuditSink;
use nonprofit_locator_store_sqlite::IngestNoopAuditSink;
use nonprofit_locator_store_sqlite::IngestStderrAuditSink;
use nonprofit_locator_store_sqlite::LoadOptions;
use nonprofit_locator_store_sqlite::OrganizationStore;
use nonprofit_locator_store_sqlite::SourceOutcome;
use nonprofit_locator_store_sqlite::ensure_database;
use nonprofit_locator_store_sqlite::ingest_sources;
use nonprofit_locator_store_sqlite::resolve;
use nonprofit_locator_store_sqlite::resolve_database_path;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "nonprofit-locator", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the organization database from the bulk downloads.
    Build(BuildCommand),
    /// Look one organization up by name or identifier.
    Resolve(ResolveCommand),
    /// List the known sources and their tables.
    Sources(SourcesCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `build`.
#[derive(Args, Debug)]
struct BuildCommand {
    /// Database file name (defaults to `IRS_DATA`; `.sqlite3` is appended when absent).
    #[arg(long, value_name = "NAME")]
    filename: Option<String>,
    /// Directory the database is written into.
    #[arg(long = "save-location", value_name = "DIR")]
    save_location: Option<PathBuf>,
    /// Maximum records to attempt per source.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,
    /// Load only one source (`PUB_78_DATA`, `IRS_990_FORMS`, `IRS_990N_FORMS`, `IRS_REVOCATIONS`).
    #[arg(long, value_name = "SOURCE", value_parser = parse_source_selector)]
    specific: Option<SourceId>,
    /// Directory the bulk downloads were unpacked into (overrides config).
    #[arg(long = "data-root", value_name = "DIR")]
    data_root: Option<PathBuf>,
    /// Overwrite an existing database without asking.
    #[arg(long, conflicts_with = "no_overwrite")]
    force: bool,
    /// Keep an existing database without asking.
    #[arg(long = "no-overwrite")]
    no_overwrite: bool,
    /// Write the build report (outcomes and failure ledger) as JSON.
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Optional config file path (defaults to nonprofit-locator.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
struct ResolveCommand {
    /// Organization name, or identifier with `--ein`.
    query: String,
    /// Match the query against the identifier instead of the name.
    #[arg(long)]
    ein: bool,
    /// Database to search.
    #[arg(long, value_name = "PATH")]
    database: PathBuf,
    /// Optional config file path (defaults to nonprofit-locator.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `sources`.
#[derive(Args, Debug)]
struct SourcesCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Optional config file path (defaults to nonprofit-locator.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to nonprofit-locator.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Listing output formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// JSON array.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog-worded error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        emit_line(&t!("main.version", version = version))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Build(command) => command_build(&command),
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Sources(command) => command_sources(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Prints CLI help text.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    emit_line("")
}

// ============================================================================
// SECTION: Build Command
// ============================================================================

/// Result of preparing and loading the database.
enum BuildOutcome {
    /// The operator kept the existing database.
    Declined {
        /// Path of the untouched database.
        path: PathBuf,
    },
    /// The database was rebuilt.
    Built {
        /// Path of the new database.
        path: PathBuf,
        /// Per-source outcomes and failure ledger.
        report: BuildReport,
    },
}

/// Executes `build`.
fn command_build(command: &BuildCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    match run_build(command, &config, &StdinPrompt)? {
        BuildOutcome::Declined {
            path,
        } => emit_line(&t!("build.declined", path = path.display()))?,
        BuildOutcome::Built {
            path,
            report,
        } => {
            for outcome in &report.sources {
                emit_line(&render_outcome(outcome))?;
            }
            emit_line(&t!(
                "build.summary",
                path = path.display(),
                inserted = report.inserted_total(),
                locations = report.failed_location_count()
            ))?;
            if let Some(report_path) = &command.report {
                write_report(report_path, &report)?;
                emit_line(&t!("build.report.written", path = report_path.display()))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Prepares the database and loads the selected sources.
fn run_build(
    command: &BuildCommand,
    config: &LocatorConfig,
    prompt: &dyn OverwritePrompt,
) -> CliResult<BuildOutcome> {
    let registry = source_registry(config)?;
    let path = resolve_database_path(command.filename.as_deref(), command.save_location.as_deref());
    let policy = if command.force {
        OverwritePolicy::Force
    } else if command.no_overwrite {
        OverwritePolicy::Reject
    } else {
        OverwritePolicy::Confirm(prompt)
    };
    let outcome = ensure_database(config.store.store_config(path.clone()), policy).map_err(|err| {
        CliError::new(t!("build.database.failed", path = path.display(), error = err))
    })?;
    let store = match outcome {
        DatabaseOutcome::Ready(store) => store,
        DatabaseOutcome::Declined {
            path,
        } => {
            return Ok(BuildOutcome::Declined {
                path,
            });
        }
    };

    let audit = audit_sink(&config.ingest)?;
    let progress = StderrProgress {
        interval: config.ingest.progress_interval,
    };
    let options = LoadOptions {
        limit: command.limit.or(config.ingest.limit),
        progress: &progress,
        audit: audit.as_ref(),
    };
    let data_root = command.data_root.as_deref().unwrap_or(config.sources.data_root.as_path());
    let report = ingest_sources(&store, &registry, data_root, command.specific, &options);
    Ok(BuildOutcome::Built {
        path,
        report,
    })
}

/// Renders one source outcome as a summary line.
fn render_outcome(outcome: &SourceOutcome) -> String {
    match outcome {
        SourceOutcome::Loaded(report) => t!(
            "build.source.loaded",
            source = report.source,
            table = report.table_name,
            inserted = report.inserted,
            attempted = report.attempted,
            failed = report.ledger.failed_record_count()
        ),
        SourceOutcome::Failed {
            source,
            path,
            message,
        } => t!("build.source.failed", source = source, path = path.display(), error = message),
    }
}

/// Writes the build report as pretty JSON.
fn write_report(path: &Path, report: &BuildReport) -> CliResult<()> {
    let bytes = serde_json::to_vec_pretty(report)
        .map_err(|err| CliError::new(t!("build.report.serialize_failed", error = err)))?;
    fs::write(path, bytes).map_err(|err| {
        CliError::new(t!("build.report.write_failed", path = path.display(), error = err))
    })
}

/// Selects the audit sink configured for ingestion.
fn audit_sink(ingest: &IngestConfig) -> CliResult<Box<dyn IngestAuditSink>> {
    if let Some(path) = &ingest.audit_log {
        let sink = IngestFileAuditSink::new(path).map_err(|err| {
            CliError::new(t!("build.audit.open_failed", path = path.display(), error = err))
        })?;
        return Ok(Box::new(sink));
    }
    if ingest.audit_stderr {
        return Ok(Box::new(IngestStderrAuditSink));
    }
    Ok(Box::new(IngestNoopAuditSink))
}

/// Parses a `--specific` selector.
fn parse_source_selector(value: &str) -> Result<SourceId, String> {
    value.parse::<SourceId>().map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Operator Interaction
// ============================================================================

/// Asks on stdin before an existing database is destroyed.
struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        let stdin = std::io::stdin();
        let mut reader = stdin.lock();
        confirm_from(&mut reader, path)
    }
}

/// Repeats the overwrite question until a yes/no answer arrives.
///
/// End of input or a read failure counts as "no".
fn confirm_from(reader: &mut dyn BufRead, path: &Path) -> bool {
    loop {
        if write_stderr_line(&t!("build.prompt.overwrite", path = path.display())).is_err() {
            return false;
        }
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        if let Some(answer) = parse_confirmation(&line) {
            return answer;
        }
    }
}

/// Interprets one answer line; `None` when it is neither yes nor no.
fn parse_confirmation(input: &str) -> Option<bool> {
    let answer = input.trim();
    if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if answer.eq_ignore_ascii_case("n") || answer.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

/// Writes progress to stderr every `interval` attempted records.
struct StderrProgress {
    /// Records between reports.
    interval: u64,
}

impl ProgressObserver for StderrProgress {
    fn on_progress(&self, source: SourceId, attempted: u64) {
        if should_report(attempted, self.interval) {
            let _ = write_stderr_line(&t!("build.progress", source = source, attempted = attempted));
        }
    }

    fn on_source_complete(&self, source: SourceId, attempted: u64) {
        let _ =
            write_stderr_line(&t!("build.source.complete", source = source, attempted = attempted));
    }
}

/// Returns true when `attempted` lands on a reporting boundary.
const fn should_report(attempted: u64, interval: u64) -> bool {
    interval > 0 && attempted > 0 && attempted.is_multiple_of(interval)
}

// ============================================================================
// SECTION: Resolve Command
// ============================================================================

/// JSON body printed for a successful lookup.
#[derive(Serialize)]
struct ResolveOutput<'a> {
    /// Always `found`.
    status: &'static str,
    /// Winning table, rows, and co-located count.
    #[serde(flatten)]
    result: &'a ResolutionResult,
    /// Location handed to community statistics lookups.
    location_key: Option<LocationKey>,
}

/// Executes `resolve`.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    match run_resolve(command, &config)? {
        Resolution::Found(result) => emit_line(&render_resolution(&result)?)?,
        Resolution::NotFound => emit_line(&t!("resolve.not_found", query = command.query))?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Opens an existing database and runs the cascade lookup.
fn run_resolve(command: &ResolveCommand, config: &LocatorConfig) -> CliResult<Resolution> {
    if !command.database.is_file() {
        return Err(CliError::new(t!(
            "resolve.database_missing",
            path = command.database.display()
        )));
    }
    let registry = source_registry(config)?;
    let store = OrganizationStore::open(config.store.store_config(command.database.clone()))
        .map_err(|err| CliError::new(t!("resolve.failed", error = err)))?;
    let key = SearchKey::from_query(command.query.clone(), command.ein);
    resolve(&store, &registry, &key).map_err(|err| CliError::new(t!("resolve.failed", error = err)))
}

/// Renders a found lookup as pretty JSON.
fn render_resolution(result: &ResolutionResult) -> CliResult<String> {
    let output = ResolveOutput {
        status: "found",
        result,
        location_key: result.location_key(),
    };
    serde_json::to_string_pretty(&output)
        .map_err(|err| CliError::new(t!("resolve.serialize_failed", error = err)))
}

// ============================================================================
// SECTION: Sources Command
// ============================================================================

/// One registry entry as listed by `sources --format json`.
#[derive(Serialize)]
struct SourceListing<'a> {
    /// Source identifier.
    source: SourceId,
    /// Bulk-download selector accepted by `--specific`.
    selector: &'static str,
    /// Destination table.
    table_name: &'a str,
    /// Table columns in order.
    columns: Vec<&'a str>,
    /// Record format.
    format: &'a SourceFormat,
    /// Resolved input location.
    path: PathBuf,
}

/// Executes `sources`.
fn command_sources(command: &SourcesCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let registry = source_registry(&config)?;
    let listings: Vec<SourceListing<'_>> = registry
        .iter()
        .map(|descriptor| SourceListing {
            source: descriptor.id,
            selector: descriptor.id.selector(),
            table_name: &descriptor.table_name,
            columns: descriptor.table_columns(),
            format: &descriptor.format,
            path: descriptor.path_under(&config.sources.data_root),
        })
        .collect();
    match command.format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&listings)
                .map_err(|err| CliError::new(t!("resolve.serialize_failed", error = err)))?;
            emit_line(&text)?;
        }
        OutputFormat::Text => {
            for listing in &listings {
                for line in render_listing(listing) {
                    emit_line(&line)?;
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders one registry entry as text lines.
fn render_listing(listing: &SourceListing<'_>) -> [String; 2] {
    let format = match listing.format {
        SourceFormat::Delimited {
            delimiter,
        } => t!("sources.format.delimited", delimiter = delimiter),
        SourceFormat::DocumentFolder {
            ..
        } => t!("sources.format.documents"),
    };
    [
        t!(
            "sources.entry",
            source = listing.source,
            selector = listing.selector,
            table = listing.table_name,
            format = format,
            path = listing.path.display()
        ),
        t!("sources.columns", columns = listing.columns.join(", ")),
    ]
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    source_registry(&config)?;
    if config.loaded_from.is_some() {
        emit_line(&t!("config.validate.ok"))?;
    } else {
        emit_line(&t!("config.validate.defaults"))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Loads configuration, mapping failures to a CLI error.
fn load_config(path: Option<&Path>) -> CliResult<LocatorConfig> {
    LocatorConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Builds the standard registry with configured path overrides applied.
fn source_registry(config: &LocatorConfig) -> CliResult<SourceRegistry> {
    let mut registry = SourceRegistry::standard();
    config.sources.apply_overrides(&mut registry);
    registry.validate().map_err(|err| CliError::new(t!("registry.invalid", error = err)))?;
    Ok(registry)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stdout, mapping failures to a CLI error.
fn emit_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a catalog output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
