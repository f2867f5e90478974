// crates/execution-repo-cli/src/main.rs
// ============================================================================
// Module: Execution Repository CLI Entry Point
// Description: Command dispatcher for execution reads.
// Purpose: Read executions through the consistency router from the shell.
// Dependencies: clap, execution-repo-config, execution-repo-core, execution-repo-sqlite, tracing
// ============================================================================

//! ## Overview
//! The `execution-repo` binary loads `execution-repo.toml`, opens the primary
//! and optional replica stores read-only, and serves one read per invocation.
//! Both databases must already exist with an initialized schema. No
//! replication lag oracle is wired here, so consistent reads are served by
//! the primary and only eventual reads touch the replica.
//!
//! Results go to stdout; logs and errors go to stderr. The process exits
//! with status 1 on any error.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use execution_repo_config::ExecutionRepositoryConfig;
use execution_repo_config::LogFormat;
use execution_repo_config::LoggingConfig;
use execution_repo_core::ConsistencyRouter;
use execution_repo_core::ExecutionId;
use execution_repo_core::ExecutionKind;
use execution_repo_core::InMemoryReplicationLagOracle;
use execution_repo_core::NoopRetrieveMetrics;
use execution_repo_core::ReadContext;
use execution_repo_core::ReadReplicaRequirement;
use execution_repo_core::RetrieveError;
use execution_repo_sqlite::SqliteExecutionStore;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "execution-repo", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to execution-repo.toml or `EXECUTION_REPO_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an execution and its stages as JSON.
    Retrieve(ReadArgs),
    /// Print the status of an execution.
    Status(ReadArgs),
    /// Print the owning application of an execution.
    Application(ApplicationArgs),
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
    /// Load and validate the configuration file.
    Validate,
}

/// Arguments shared by freshness-aware reads.
#[derive(Args, Debug)]
struct ReadArgs {
    /// Execution kind.
    #[arg(long, value_enum, default_value_t = KindArg::Pipeline)]
    kind: KindArg,
    /// Execution identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Freshness required from the replica copy.
    #[arg(long, value_enum, default_value_t = ConsistencyArg::UpToDate)]
    consistency: ConsistencyArg,
    /// Abandon the read after this many milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

/// Arguments for the `application` subcommand.
#[derive(Args, Debug)]
struct ApplicationArgs {
    /// Execution kind.
    #[arg(long, value_enum, default_value_t = KindArg::Pipeline)]
    kind: KindArg,
    /// Execution identifier.
    #[arg(long, value_name = "ID")]
    id: String,
    /// Abandon the read after this many milliseconds.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

/// Execution kind argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    /// Pipeline executions.
    Pipeline,
    /// Orchestration executions.
    Orchestration,
}

impl From<KindArg> for ExecutionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Pipeline => Self::Pipeline,
            KindArg::Orchestration => Self::Orchestration,
        }
    }
}

/// Replica freshness argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ConsistencyArg {
    /// Any replica copy is acceptable.
    None,
    /// The replica copy must exist.
    Present,
    /// The replica copy must be current.
    UpToDate,
}

impl From<ConsistencyArg> for ReadReplicaRequirement {
    fn from(value: ConsistencyArg) -> Self {
        match value {
            ConsistencyArg::None => Self::None,
            ConsistencyArg::Present => Self::Present,
            ConsistencyArg::UpToDate => Self::UpToDate,
        }
    }
}

/// Router over on-disk stores with no oracle and no metrics.
type CliRouter = ConsistencyRouter<
    SqliteExecutionStore,
    SqliteExecutionStore,
    InMemoryReplicationLagOracle,
    NoopRetrieveMetrics,
>;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
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

/// Parses arguments and dispatches the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            let _ = err.print();
            return Ok(code);
        }
    };
    let output = execute(&cli)?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, initializes logging, and runs one command.
fn execute(cli: &Cli) -> CliResult<String> {
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    match &cli.command {
        Commands::Config {
            command: ConfigCommand::Validate,
        } => Ok("config ok".to_string()),
        Commands::Retrieve(args) => command_retrieve(&config, args),
        Commands::Status(args) => command_status(&config, args),
        Commands::Application(args) => command_application(&config, args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `retrieve` command.
fn command_retrieve(config: &ExecutionRepositoryConfig, args: &ReadArgs) -> CliResult<String> {
    let router = build_router(config)?;
    let kind = ExecutionKind::from(args.kind);
    let id = ExecutionId::new(args.id.as_str());
    let requirement = ReadReplicaRequirement::from(args.consistency);
    debug!(kind = %kind, id = %id, requirement = %requirement, "retrieving execution");
    let execution = router
        .retrieve_with(kind, &id, requirement, &read_context(args.timeout_ms))
        .map_err(|err| retrieve_error(&err))?;
    serde_json::to_string_pretty(&execution)
        .map_err(|err| CliError::new(format!("failed to render execution: {err}")))
}

/// Executes the `status` command.
fn command_status(config: &ExecutionRepositoryConfig, args: &ReadArgs) -> CliResult<String> {
    let router = build_router(config)?;
    let kind = ExecutionKind::from(args.kind);
    let id = ExecutionId::new(args.id.as_str());
    let requirement = ReadReplicaRequirement::from(args.consistency);
    debug!(kind = %kind, id = %id, requirement = %requirement, "retrieving execution status");
    let status = router
        .retrieve_status(kind, &id, requirement, &read_context(args.timeout_ms))
        .map_err(|err| retrieve_error(&err))?;
    Ok(status.to_string())
}

/// Executes the `application` command.
fn command_application(
    config: &ExecutionRepositoryConfig,
    args: &ApplicationArgs,
) -> CliResult<String> {
    let router = build_router(config)?;
    let kind = ExecutionKind::from(args.kind);
    let id = ExecutionId::new(args.id.as_str());
    debug!(kind = %kind, id = %id, "retrieving execution application");
    router
        .retrieve_application(kind, &id, &read_context(args.timeout_ms))
        .map_err(|err| retrieve_error(&err))
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Loads and validates the configuration file.
fn load_config(path: Option<&Path>) -> CliResult<ExecutionRepositoryConfig> {
    ExecutionRepositoryConfig::load(path).map_err(|err| CliError::new(err.to_string()))
}

/// Installs the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` overrides the configured filter.
fn init_logging(logging: &LoggingConfig) -> CliResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.filter)
            .map_err(|err| CliError::new(format!("invalid logging.filter: {err}")))?,
    };
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init(),
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).try_init()
        }
    };
    installed.map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

/// Opens the configured stores and builds the router.
fn build_router(config: &ExecutionRepositoryConfig) -> CliResult<CliRouter> {
    let policy = config.body_source_policy();
    let primary = SqliteExecutionStore::open(config.primary.clone(), policy)
        .map_err(|err| CliError::new(format!("failed to open primary store: {err}")))?;
    let replica = config
        .replica
        .clone()
        .map(|replica| SqliteExecutionStore::open(replica, policy))
        .transpose()
        .map_err(|err| CliError::new(format!("failed to open replica store: {err}")))?;
    Ok(ConsistencyRouter::new(primary, replica, None, NoopRetrieveMetrics, config.router_config()))
}

/// Builds the read context for an optional timeout.
fn read_context(timeout_ms: Option<u64>) -> ReadContext {
    timeout_ms.map_or_else(ReadContext::unbounded, |ms| {
        ReadContext::with_timeout(Duration::from_millis(ms))
    })
}

/// Maps a read failure to a CLI error, keeping not-found distinct.
fn retrieve_error(error: &RetrieveError) -> CliError {
    if error.is_not_found() {
        CliError::new(format!("execution not found: {error}"))
    } else {
        CliError::new(format!("execution read failed: {error}"))
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
