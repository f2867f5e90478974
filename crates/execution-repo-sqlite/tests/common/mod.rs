// crates/execution-repo-sqlite/tests/common/mod.rs
// =============================================================================
// Module: SQLite Test Helpers
// Description: Temporary databases and row seeding for SQLite store suites.
// Purpose: Write execution rows the way the write path lays them out.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only helpers may panic on setup failure."
)]

use std::path::Path;
use std::path::PathBuf;

use execution_repo_core::BodySourcePolicy;
use execution_repo_core::CompressionState;
use execution_repo_core::ExecutionKind;
use execution_repo_sqlite::CompressionType;
use execution_repo_sqlite::DEFAULT_COMPRESSION_LEVEL;
use execution_repo_sqlite::SqliteExecutionStore;
use execution_repo_sqlite::SqliteExecutionStoreConfig;
use execution_repo_sqlite::compress_body;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;

/// Pipeline id used by most scenarios.
pub const PIPELINE_ID: &str = "01HZX3J6Q4PIPELINE";

/// Returns a fresh temporary directory.
pub fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Returns the database path `name` inside `dir`.
pub fn db_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

/// Returns the body source policy for a compression flag.
pub fn policy(compression_enabled: bool) -> BodySourcePolicy {
    BodySourcePolicy::new(CompressionState::from_enabled(compression_enabled))
}

/// Initializes the schema at `path` and opens a store over it.
pub fn open_store(path: &Path, compression_enabled: bool) -> SqliteExecutionStore {
    let config = SqliteExecutionStoreConfig::new(path);
    SqliteExecutionStore::initialize(&config).unwrap();
    SqliteExecutionStore::open(config, policy(compression_enabled)).unwrap()
}

/// Writes rows into a store database behind the store's back.
pub struct Seeder {
    /// Direct connection to the database.
    pub connection: Connection,
    /// Execution kind whose tables are written.
    kind: ExecutionKind,
}

impl Seeder {
    /// Opens a seeder for pipeline tables. The schema must already exist.
    pub fn pipelines(path: &Path) -> Self {
        Self::new(path, ExecutionKind::Pipeline)
    }

    /// Opens a seeder for the tables of `kind`.
    pub fn new(path: &Path, kind: ExecutionKind) -> Self {
        Self {
            connection: Connection::open(path).unwrap(),
            kind,
        }
    }

    /// Returns (executions, compressed executions, stages, compressed stages).
    fn tables(&self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self.kind {
            ExecutionKind::Pipeline => (
                "pipelines",
                "pipelines_compressed_executions",
                "pipeline_stages",
                "pipeline_stages_compressed_executions",
            ),
            ExecutionKind::Orchestration => (
                "orchestrations",
                "orchestrations_compressed_executions",
                "orchestration_stages",
                "orchestration_stages_compressed_executions",
            ),
        }
    }

    /// Inserts an execution row with an inline body.
    pub fn execution(&self, id: &str, name: &str, updated_at: i64) {
        let body = json!({ "name": name, "application": "deployer" }).to_string();
        self.execution_row(id, "RUNNING", updated_at, &body);
    }

    /// Inserts an execution row with an explicit status and raw body.
    pub fn execution_row(&self, id: &str, status: &str, updated_at: i64, body: &str) {
        let (executions, ..) = self.tables();
        self.connection
            .execute(
                &format!(
                    "INSERT INTO {executions} (id, application, status, build_time, start_time, \
                     end_time, canceled, updated_at, body) VALUES (?1, 'deployer', ?2, 1000, \
                     1500, NULL, 0, ?3, ?4)"
                ),
                params![id, status, updated_at, body],
            )
            .unwrap();
    }

    /// Inserts an execution row whose body lives in the compressed table.
    pub fn compressed_execution(
        &self,
        id: &str,
        name: &str,
        updated_at: i64,
        compressed_updated_at: i64,
    ) {
        self.compressed_execution_as(
            CompressionType::Zstd,
            id,
            name,
            updated_at,
            compressed_updated_at,
        );
    }

    /// Inserts an execution row whose body is compressed with `compression_type`.
    pub fn compressed_execution_as(
        &self,
        compression_type: CompressionType,
        id: &str,
        name: &str,
        updated_at: i64,
        compressed_updated_at: i64,
    ) {
        let (_, compressed_executions, ..) = self.tables();
        self.execution_row(id, "RUNNING", updated_at, "");
        let body = json!({ "name": name, "application": "deployer" }).to_string();
        insert_compressed(
            &self.connection,
            compressed_executions,
            id,
            &body,
            compression_type,
            compressed_updated_at,
        );
    }

    /// Inserts a stage row with an inline body recording `source`.
    pub fn stage(&self, execution_id: &str, stage_id: &str, updated_at: i64, source: &str) {
        let body = json!({ "name": format!("stage {stage_id}"), "source": source }).to_string();
        self.stage_row(execution_id, stage_id, updated_at, &body);
    }

    /// Inserts a stage row with an explicit raw body.
    pub fn stage_row(&self, execution_id: &str, stage_id: &str, updated_at: i64, body: &str) {
        let (_, _, stages, _) = self.tables();
        self.connection
            .execute(
                &format!(
                    "INSERT INTO {stages} (id, execution_id, status, updated_at, body) VALUES \
                     (?1, ?2, 'RUNNING', ?3, ?4)"
                ),
                params![stage_id, execution_id, updated_at, body],
            )
            .unwrap();
    }

    /// Inserts a stage row whose body lives in the compressed table.
    pub fn compressed_stage(
        &self,
        execution_id: &str,
        stage_id: &str,
        updated_at: i64,
        compressed_updated_at: i64,
        source: &str,
    ) {
        let (.., compressed_stages) = self.tables();
        self.stage_row(execution_id, stage_id, updated_at, "");
        let body = json!({ "name": format!("stage {stage_id}"), "source": source }).to_string();
        insert_compressed(
            &self.connection,
            compressed_stages,
            stage_id,
            &body,
            CompressionType::Zstd,
            compressed_updated_at,
        );
    }

    /// Drops a table to simulate a broken replica.
    pub fn drop_table(&self, table: &str) {
        self.connection.execute_batch(&format!("DROP TABLE {table};")).unwrap();
    }
}

/// Inserts a compressed body row.
fn insert_compressed(
    connection: &Connection,
    table: &str,
    id: &str,
    body: &str,
    compression_type: CompressionType,
    updated_at: i64,
) {
    let bytes = compress_body(body, compression_type, DEFAULT_COMPRESSION_LEVEL).unwrap();
    connection
        .execute(
            &format!(
                "INSERT INTO {table} (id, compressed_body, compression_type, updated_at) VALUES \
                 (?1, ?2, ?3, ?4)"
            ),
            params![id, bytes, compression_type.as_str(), updated_at],
        )
        .unwrap();
}
