// crates/execution-repo-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument mapping and read helpers.
// Purpose: Ensure CLI flags map onto router requirements and errors stay distinct.
// Dependencies: execution-repo-cli main helpers
// ============================================================================

//! ## Overview
//! Validates argument parsing defaults, read context construction, and the
//! not-found versus failure split in CLI error messages.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::time::Duration;

use clap::Parser;
use execution_repo_config::ExecutionRepositoryConfig;
use execution_repo_core::DataAccessCause;
use execution_repo_core::ExecutionId;
use execution_repo_core::ExecutionKind;
use execution_repo_core::ReadOperation;
use execution_repo_core::ReadReplicaRequirement;
use execution_repo_core::ResultCode;
use execution_repo_core::RetrieveError;
use execution_repo_core::StoreError;
use execution_repo_sqlite::SqliteExecutionStore;
use execution_repo_sqlite::SqliteExecutionStoreConfig;
use tempfile::TempDir;

use super::ApplicationArgs;
use super::Cli;
use super::Commands;
use super::ConsistencyArg;
use super::KindArg;
use super::ReadArgs;
use super::build_router;
use super::command_application;
use super::command_retrieve;
use super::read_context;
use super::retrieve_error;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes a config whose primary path is not created.
fn bare_config_in(dir: &TempDir) -> ExecutionRepositoryConfig {
    let config_path = dir.path().join("execution-repo.toml");
    let primary = dir.path().join("primary.db");
    let toml = format!("[primary]\npath = {:?}\n", primary.to_string_lossy());
    fs::write(&config_path, toml).unwrap();
    ExecutionRepositoryConfig::load(Some(&config_path)).unwrap()
}

/// Writes a config over an empty, initialized primary store.
fn config_in(dir: &TempDir) -> ExecutionRepositoryConfig {
    let config = bare_config_in(dir);
    SqliteExecutionStore::initialize(&config.primary).unwrap();
    config
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

#[test]
fn retrieve_defaults_to_pipeline_up_to_date() {
    let cli = Cli::try_parse_from(["execution-repo", "retrieve", "--id", "abc"]).unwrap();
    match cli.command {
        Commands::Retrieve(args) => {
            assert_eq!(args.kind, KindArg::Pipeline);
            assert_eq!(args.consistency, ConsistencyArg::UpToDate);
            assert_eq!(args.timeout_ms, None);
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert!(cli.config.is_none());
}

#[test]
fn consistency_flags_map_to_requirements() {
    let cli = Cli::try_parse_from([
        "execution-repo",
        "status",
        "--kind",
        "orchestration",
        "--id",
        "abc",
        "--consistency",
        "present",
        "--config",
        "custom.toml",
    ])
    .unwrap();
    match cli.command {
        Commands::Status(args) => {
            assert_eq!(ExecutionKind::from(args.kind), ExecutionKind::Orchestration);
            assert_eq!(
                ReadReplicaRequirement::from(args.consistency),
                ReadReplicaRequirement::Present
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
    assert_eq!(cli.config.unwrap().to_string_lossy(), "custom.toml");
    assert_eq!(ReadReplicaRequirement::from(ConsistencyArg::None), ReadReplicaRequirement::None);
    assert_eq!(
        ReadReplicaRequirement::from(ConsistencyArg::UpToDate),
        ReadReplicaRequirement::UpToDate
    );
}

#[test]
fn parse_rejects_missing_id_and_unknown_consistency() {
    assert!(Cli::try_parse_from(["execution-repo", "retrieve"]).is_err());
    assert!(
        Cli::try_parse_from(["execution-repo", "retrieve", "--id", "a", "--consistency", "strong"])
            .is_err()
    );
}

// ============================================================================
// SECTION: Read Helpers
// ============================================================================

#[test]
fn read_context_applies_timeout() {
    assert!(read_context(None).deadline().is_none());
    let remaining = read_context(Some(60_000)).remaining().unwrap();
    assert!(remaining <= Duration::from_secs(60));
    assert!(remaining > Duration::from_secs(50));
}

#[test]
fn not_found_message_is_distinct() {
    let not_found = RetrieveError::NotFound {
        kind: ExecutionKind::Pipeline,
        id: ExecutionId::new("abc"),
        requirement: ReadReplicaRequirement::UpToDate,
    };
    let failure = RetrieveError::DataAccess {
        operation: ReadOperation::PrimaryLoad,
        result_code: ResultCode::Failure,
        source: DataAccessCause::Store(StoreError::Db("disk I/O error".to_string())),
    };
    assert!(retrieve_error(&not_found).to_string().starts_with("execution not found:"));
    let message = retrieve_error(&failure).to_string();
    assert!(message.starts_with("execution read failed:"));
    assert!(message.contains("disk I/O error"));
}

#[test]
fn missing_execution_reports_not_found() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let args = ReadArgs {
        kind: KindArg::Pipeline,
        id: "missing".to_string(),
        consistency: ConsistencyArg::UpToDate,
        timeout_ms: Some(5_000),
    };
    let error = command_retrieve(&config, &args).unwrap_err();
    assert!(error.to_string().starts_with("execution not found:"));

    let args = ApplicationArgs {
        kind: KindArg::Orchestration,
        id: "missing".to_string(),
        timeout_ms: None,
    };
    let error = command_application(&config, &args).unwrap_err();
    assert!(error.to_string().contains("ORCHESTRATION"));
}

// ============================================================================
// SECTION: Store Opening
// ============================================================================

#[test]
fn missing_primary_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let config = bare_config_in(&dir);

    let error = build_router(&config).err().unwrap();

    assert!(error.to_string().starts_with("failed to open primary store:"), "{error}");
    assert!(!config.primary.path.exists());
}

#[test]
fn missing_replica_fails_without_creating_it() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    let replica = dir.path().join("replica.db");
    config.replica = Some(SqliteExecutionStoreConfig::new(&replica));

    let error = build_router(&config).err().unwrap();

    assert!(error.to_string().starts_with("failed to open replica store:"), "{error}");
    assert!(!replica.exists());
}
