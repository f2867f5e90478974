// crates/execution-repo-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Execution Store
// Description: Execution aggregate reads from one SQLite database.
// Purpose: Back the primary and replica stores used by the consistency router.
// Dependencies: execution-repo-core, rusqlite, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteExecutionStore`] loads an execution row and its stages from the
//! tables of one execution kind. Each entity may keep its body inline or in
//! a compressed side table; the injected [`BodySourcePolicy`] picks the body
//! source and the `updated_at` reported for freshness, so pipeline and stage
//! rows are treated identically. The store makes no freshness decisions.
//!
//! Reads go through a round-robin pool of read-only connections, and each
//! aggregate is read inside one deferred transaction so the execution row
//! and its stages come from the same snapshot. Opening never creates a file
//! or a table; [`SqliteExecutionStore::initialize`] lays out the schema for
//! the writer side and for test fixtures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use execution_repo_core::BodyCodec;
use execution_repo_core::BodyPayload;
use execution_repo_core::BodySource;
use execution_repo_core::BodySourcePolicy;
use execution_repo_core::CodecError;
use execution_repo_core::CompressedBody;
use execution_repo_core::DeadlineExceeded;
use execution_repo_core::Execution;
use execution_repo_core::ExecutionId;
use execution_repo_core::ExecutionKind;
use execution_repo_core::ExecutionStatus;
use execution_repo_core::ExecutionStore;
use execution_repo_core::ReadContext;
use execution_repo_core::RowVersion;
use execution_repo_core::StageExecution;
use execution_repo_core::StageId;
use execution_repo_core::StoreError;
use execution_repo_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::info;

use crate::codec::JsonBodyCodec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for execution tables.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for one `SQLite` execution store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `read_pool_size` must be greater than zero.
/// - Opening requires an existing, initialized database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteExecutionStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode set by [`SqliteExecutionStore::initialize`].
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// Number of pooled read connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl SqliteExecutionStoreConfig {
    /// Returns a config with defaults for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a field is out of range.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        validate_store_path(&self.path)?;
        if self.read_pool_size == 0 {
            return Err(SqliteStoreError::Invalid(
                "read_pool_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    4
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` execution store errors.
///
/// # Invariants
/// - Error messages never embed stored body content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows are inconsistent.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or stored value.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// A stored body could not be decoded.
    #[error("sqlite store codec error: {0}")]
    Codec(#[from] CodecError),
    /// The read deadline passed between statements.
    #[error("sqlite store deadline exceeded")]
    DeadlineExceeded,
}

impl From<DeadlineExceeded> for SqliteStoreError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => {
                Self::Invalid(format!("schema version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Codec(error) => Self::from(error),
            SqliteStoreError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Table names holding one execution kind.
#[derive(Debug, Clone, Copy)]
struct KindTables {
    /// Execution rows.
    executions: &'static str,
    /// Compressed execution bodies.
    compressed_executions: &'static str,
    /// Stage rows.
    stages: &'static str,
    /// Compressed stage bodies.
    compressed_stages: &'static str,
}

impl KindTables {
    /// Returns the tables for `kind`.
    const fn for_kind(kind: ExecutionKind) -> Self {
        match kind {
            ExecutionKind::Pipeline => Self {
                executions: "pipelines",
                compressed_executions: "pipelines_compressed_executions",
                stages: "pipeline_stages",
                compressed_stages: "pipeline_stages_compressed_executions",
            },
            ExecutionKind::Orchestration => Self {
                executions: "orchestrations",
                compressed_executions: "orchestrations_compressed_executions",
                stages: "orchestration_stages",
                compressed_stages: "orchestration_stages_compressed_executions",
            },
        }
    }

    /// Returns the execution row query.
    fn execution_query(self) -> String {
        format!(
            "SELECT e.application, e.status, e.build_time, e.start_time, e.end_time, e.canceled, \
             e.updated_at, e.body, c.compressed_body, c.compression_type, c.updated_at FROM {} e \
             LEFT JOIN {} c ON c.id = e.id WHERE e.id = ?1",
            self.executions, self.compressed_executions
        )
    }

    /// Returns the stage rows query, in insertion order.
    fn stages_query(self) -> String {
        format!(
            "SELECT s.id, s.status, s.updated_at, s.body, c.compressed_body, c.compression_type, \
             c.updated_at FROM {} s LEFT JOIN {} c ON c.id = s.id WHERE s.execution_id = ?1 \
             ORDER BY s.rowid",
            self.stages, self.compressed_stages
        )
    }

    /// Returns the DDL creating this kind's tables.
    fn create_statements(self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {executions} (
                id TEXT PRIMARY KEY NOT NULL,
                application TEXT NOT NULL,
                status TEXT NOT NULL,
                build_time INTEGER,
                start_time INTEGER,
                end_time INTEGER,
                canceled INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL,
                body TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS {compressed_executions} (
                id TEXT PRIMARY KEY NOT NULL,
                compressed_body BLOB NOT NULL,
                compression_type TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {stages} (
                id TEXT PRIMARY KEY NOT NULL,
                execution_id TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                body TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_{stages}_execution_id ON {stages} (execution_id);
            CREATE TABLE IF NOT EXISTS {compressed_stages} (
                id TEXT PRIMARY KEY NOT NULL,
                compressed_body BLOB NOT NULL,
                compression_type TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
            executions = self.executions,
            compressed_executions = self.compressed_executions,
            stages = self.stages,
            compressed_stages = self.compressed_stages,
        )
    }
}

/// Compressed-body columns from a `LEFT JOIN`; all `None` when absent.
#[derive(Debug)]
struct CompressedColumns {
    /// Compressed bytes.
    bytes: Option<Vec<u8>>,
    /// Compression type label.
    compression_type: Option<String>,
    /// Compressed row `updated_at`.
    updated_at: Option<i64>,
}

/// Body and version columns shared by execution and stage rows.
#[derive(Debug)]
struct StoredBody {
    /// Raw body column.
    raw: String,
    /// Entity row `updated_at`.
    updated_at: i64,
    /// Joined compressed-body columns.
    compressed: CompressedColumns,
}

/// Execution row columns.
#[derive(Debug)]
struct ExecutionRow {
    /// Owning application.
    application: String,
    /// Status label.
    status: String,
    /// Build time.
    build_time: Option<i64>,
    /// Start time.
    start_time: Option<i64>,
    /// End time.
    end_time: Option<i64>,
    /// Cancellation flag.
    canceled: bool,
    /// Body and version columns.
    body: StoredBody,
}

/// Stage row columns.
#[derive(Debug)]
struct StageRow {
    /// Stage id.
    id: String,
    /// Status label.
    status: String,
    /// Body and version columns.
    body: StoredBody,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed execution store.
///
/// # Invariants
/// - Each connection is used by one read at a time.
/// - Aggregates are read inside one transaction on a single connection.
/// - Connections are read-only; the store never writes.
#[derive(Clone)]
pub struct SqliteExecutionStore {
    /// Store configuration.
    config: SqliteExecutionStoreConfig,
    /// Read connection pool.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
    /// Body source and freshness instant selection.
    policy: BodySourcePolicy,
    /// Body decoder.
    codec: Arc<dyn BodyCodec>,
}

impl SqliteExecutionStore {
    /// Creates the database and its tables when missing.
    ///
    /// Applies the configured journal mode. Existing databases must carry
    /// the supported schema version.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be created or
    /// carries an unsupported schema version.
    pub fn initialize(config: &SqliteExecutionStoreConfig) -> Result<(), SqliteStoreError> {
        config.validate()?;
        ensure_parent_dir(&config.path)?;
        let mut connection = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .execute_batch(&format!(
                "PRAGMA journal_mode = {};",
                config.journal_mode.pragma_value()
            ))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        initialize_schema(&mut connection)?;
        info!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            "sqlite execution schema initialized"
        );
        Ok(())
    }

    /// Opens a store decoding bodies with [`JsonBodyCodec`].
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database does not exist, cannot
    /// be opened, or its schema is missing or unsupported.
    pub fn open(
        config: SqliteExecutionStoreConfig,
        policy: BodySourcePolicy,
    ) -> Result<Self, SqliteStoreError> {
        Self::new(config, policy, Arc::new(JsonBodyCodec::new()))
    }

    /// Opens a store with an explicit body codec.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database does not exist, cannot
    /// be opened, or its schema is missing or unsupported.
    pub fn new(
        config: SqliteExecutionStoreConfig,
        policy: BodySourcePolicy,
        codec: Arc<dyn BodyCodec>,
    ) -> Result<Self, SqliteStoreError> {
        config.validate()?;
        if !config.path.is_file() {
            return Err(SqliteStoreError::Io(format!(
                "store path does not exist: {}",
                config.path.display()
            )));
        }
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            let connection = open_read_connection(&config)?;
            check_schema_version(&connection)?;
            read_connections.push(Mutex::new(connection));
        }
        info!(
            path = %config.path.display(),
            read_pool_size = config.read_pool_size,
            compression_enabled = policy.state().is_enabled(),
            "sqlite execution store opened"
        );
        Ok(Self {
            config,
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
            policy,
            codec,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteExecutionStoreConfig {
        &self.config
    }

    /// Returns the body source policy applied to every row.
    #[must_use]
    pub const fn policy(&self) -> BodySourcePolicy {
        self.policy
    }

    /// Loads one aggregate through a pooled connection.
    fn load(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Execution>, SqliteStoreError> {
        let mut guard = self
            .read_connection()
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite read mutex poisoned".to_string()))?;
        let tables = KindTables::for_kind(kind);

        ctx.ensure_active()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let row = tx
            .query_row(&tables.execution_query(), params![id.as_str()], |row| {
                Ok(ExecutionRow {
                    application: row.get(0)?,
                    status: row.get(1)?,
                    build_time: row.get(2)?,
                    start_time: row.get(3)?,
                    end_time: row.get(4)?,
                    canceled: row.get::<_, i64>(5)? != 0,
                    body: StoredBody {
                        updated_at: row.get(6)?,
                        raw: row.get(7)?,
                        compressed: CompressedColumns {
                            bytes: row.get(8)?,
                            compression_type: row.get(9)?,
                            updated_at: row.get(10)?,
                        },
                    },
                })
            })
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some(row) = row else {
            return Ok(None);
        };

        ctx.ensure_active()?;
        let stage_rows = {
            let mut statement = tx
                .prepare(&tables.stages_query())
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            let rows = statement
                .query_map(params![id.as_str()], |row| {
                    Ok(StageRow {
                        id: row.get(0)?,
                        status: row.get(1)?,
                        body: StoredBody {
                            updated_at: row.get(2)?,
                            raw: row.get(3)?,
                            compressed: CompressedColumns {
                                bytes: row.get(4)?,
                                compression_type: row.get(5)?,
                                updated_at: row.get(6)?,
                            },
                        },
                    })
                })
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?
        };
        tx.finish().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(guard);

        let mut stages = Vec::with_capacity(stage_rows.len());
        for stage_row in stage_rows {
            stages.push(self.build_stage(id, stage_row)?);
        }
        self.build_execution(kind, id, row, stages).map(Some)
    }

    /// Builds a stage from its stored row.
    fn build_stage(
        &self,
        execution_id: &ExecutionId,
        row: StageRow,
    ) -> Result<StageExecution, SqliteStoreError> {
        let (updated_at, body) = self.decode_body(&row.body)?;
        let name = body_name(&body).unwrap_or_else(|| row.id.clone());
        Ok(StageExecution {
            id: StageId::new(row.id),
            execution_id: execution_id.clone(),
            name,
            status: parse_status(&row.status)?,
            updated_at,
            body,
        })
    }

    /// Builds an execution from its stored row and stages.
    fn build_execution(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        row: ExecutionRow,
        stages: Vec<StageExecution>,
    ) -> Result<Execution, SqliteStoreError> {
        let (updated_at, body) = self.decode_body(&row.body)?;
        Ok(Execution {
            id: id.clone(),
            kind,
            application: row.application,
            name: body_name(&body),
            build_time: row.build_time.map(Timestamp::from_unix_millis),
            start_time: row.start_time.map(Timestamp::from_unix_millis),
            end_time: row.end_time.map(Timestamp::from_unix_millis),
            canceled: row.canceled,
            status: parse_status(&row.status)?,
            updated_at,
            body,
            stages,
        })
    }

    /// Selects the body source and returns the effective `updated_at` and body.
    fn decode_body(&self, stored: &StoredBody) -> Result<(Timestamp, Value), SqliteStoreError> {
        let compressed = match &stored.compressed {
            CompressedColumns {
                bytes: Some(bytes),
                compression_type: Some(compression_type),
                updated_at: Some(updated_at),
            } => Some((bytes.as_slice(), compression_type.as_str(), *updated_at)),
            CompressedColumns {
                bytes: None,
                compression_type: None,
                updated_at: None,
            } => None,
            _ => {
                return Err(SqliteStoreError::Corrupt(
                    "partial compressed body row".to_string(),
                ));
            }
        };
        let version = RowVersion {
            updated_at: Timestamp::from_unix_millis(stored.updated_at),
            compressed_updated_at: compressed
                .map(|(_, _, updated_at)| Timestamp::from_unix_millis(updated_at)),
            raw_body_empty: stored.raw.is_empty(),
        };
        let payload = BodyPayload {
            raw: &stored.raw,
            compressed: match self.policy.select(&version) {
                BodySource::Compressed => compressed.map(|(bytes, compression_type, _)| {
                    CompressedBody {
                        bytes,
                        compression_type,
                    }
                }),
                BodySource::Raw => None,
            },
        };
        let body = self.codec.decode(&payload, self.policy.state().is_enabled())?;
        Ok((self.policy.effective_updated_at(&version), body))
    }

    /// Returns the next read connection using round-robin selection.
    fn read_connection(&self) -> &Mutex<Connection> {
        let len = self.read_connections.len();
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % len;
        &self.read_connections[index]
    }
}

impl ExecutionStore for SqliteExecutionStore {
    fn load_aggregate(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError> {
        let result = self.load(kind, id, ctx);
        if let Err(err) = &result {
            debug!(
                path = %self.config.path.display(),
                kind = %kind,
                id = %id,
                error = %err,
                "sqlite aggregate load failed"
            );
        }
        result.map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Helpers
// ============================================================================

/// Parses a stored status label.
fn parse_status(label: &str) -> Result<ExecutionStatus, SqliteStoreError> {
    ExecutionStatus::from_str(label).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Returns the `name` field of a body, when it is a string.
fn body_name(body: &Value) -> Option<String> {
    body.get("name").and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens a read-only connection to an existing database.
fn open_read_connection(
    config: &SqliteExecutionStoreConfig,
) -> Result<Connection, SqliteStoreError> {
    let connection = Connection::open_with_flags(
        &config.path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Creates execution tables or validates the existing schema version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            for kind in [ExecutionKind::Pipeline, ExecutionKind::Orchestration] {
                tx.execute_batch(&KindTables::for_kind(kind).create_statements())
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Verifies an opened database carries the supported schema version.
fn check_schema_version(connection: &Connection) -> Result<(), SqliteStoreError> {
    let version: Option<i64> = connection
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        Some(value) if value == SCHEMA_VERSION => Ok(()),
        Some(value) => {
            Err(SqliteStoreError::VersionMismatch(format!("unsupported schema version: {value}")))
        }
        None => Err(SqliteStoreError::Invalid("store schema is not initialized".to_string())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
