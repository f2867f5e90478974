// crates/execution-repo-cli/tests/read_command.rs
// ============================================================================
// Module: CLI Read Command Tests
// Description: Integration tests for the execution-repo binary.
// Purpose: Ensure reads print results on stdout and fail with exit status 1.
// Dependencies: execution-repo-cli binary
// ============================================================================
//! ## Overview
//! Seeds an on-disk primary store, then runs the binary against it and
//! checks stdout, stderr, and the exit status.

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
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use execution_repo_sqlite::SqliteExecutionStore;
use execution_repo_sqlite::SqliteExecutionStoreConfig;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn execution_repo_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_execution-repo"))
}

/// Writes a config and a primary store holding one pipeline with one stage.
fn seeded_workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let primary = dir.path().join("primary.db");
    SqliteExecutionStore::initialize(&SqliteExecutionStoreConfig::new(&primary))
        .expect("create schema");
    let connection = Connection::open(&primary).expect("open primary");
    connection
        .execute_batch(
            "INSERT INTO pipelines (id, application, status, build_time, start_time, end_time, \
             canceled, updated_at, body) VALUES ('exec-1', 'deployer', 'SUCCEEDED', 1000, 1500, \
             2000, 0, 2000, '{\"name\":\"deploy\"}');
             INSERT INTO pipeline_stages (id, execution_id, status, updated_at, body) VALUES \
             ('stage-1', 'exec-1', 'SUCCEEDED', 2000, '{\"name\":\"bake\"}');",
        )
        .expect("seed rows");
    let config_path = dir.path().join("execution-repo.toml");
    fs::write(&config_path, format!("[primary]\npath = {:?}\n", primary.to_string_lossy()))
        .expect("write config");
    (dir, config_path)
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(execution_repo_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run execution-repo")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn retrieve_prints_execution_json() {
    let (_dir, config) = seeded_workspace();
    let output = run(&config, &["retrieve", "--id", "exec-1"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let execution: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(execution["id"], "exec-1");
    assert_eq!(execution["name"], "deploy");
    assert_eq!(execution["status"], "SUCCEEDED");
    assert_eq!(execution["stages"][0]["name"], "bake");
}

#[test]
fn status_and_application_print_single_fields() {
    let (_dir, config) = seeded_workspace();

    let status = run(&config, &["status", "--id", "exec-1", "--consistency", "none"]);
    assert!(status.status.success());
    assert_eq!(String::from_utf8_lossy(&status.stdout).trim(), "SUCCEEDED");

    let application = run(&config, &["application", "--id", "exec-1", "--timeout-ms", "5000"]);
    assert!(application.status.success());
    assert_eq!(String::from_utf8_lossy(&application.stdout).trim(), "deployer");
}

#[test]
fn missing_execution_exits_with_failure() {
    let (_dir, config) = seeded_workspace();
    let output = run(&config, &["retrieve", "--kind", "orchestration", "--id", "exec-1"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("execution not found"), "stderr: {stderr}");
}

#[test]
fn invalid_config_exits_with_failure() {
    let dir = TempDir::new().expect("temp dir");
    let config = dir.path().join("execution-repo.toml");
    fs::write(&config, "[primary]\npath = \"p.db\"\n\n[read_replica]\nmax_attempts = 0\n")
        .expect("write config");

    let output = run(&config, &["config", "validate"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("read_replica.max_attempts"));
}

#[test]
fn missing_primary_database_is_not_created() {
    let dir = TempDir::new().expect("temp dir");
    let primary = dir.path().join("primary.db");
    let config = dir.path().join("execution-repo.toml");
    fs::write(&config, format!("[primary]\npath = {:?}\n", primary.to_string_lossy()))
        .expect("write config");

    let output = run(&config, &["retrieve", "--id", "exec-1"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open primary store"), "stderr: {stderr}");
    assert!(!primary.exists());
}
