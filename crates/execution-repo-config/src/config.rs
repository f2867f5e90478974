// crates/execution-repo-config/src/config.rs
// ============================================================================
// Module: Execution Repository Configuration
// Description: Configuration loading and validation for the read path.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: execution-repo-core, execution-repo-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `EXECUTION_REPO_CONFIG`, then
//! `execution-repo.toml` in the working directory. Missing or invalid
//! configuration fails closed. Both stores are opened read-only and must
//! already hold an initialized schema.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use execution_repo_core::BodySourcePolicy;
use execution_repo_core::CompressionState;
use execution_repo_core::ReplicaRetryPolicy;
use execution_repo_core::RouterConfig;
use execution_repo_sqlite::SqliteExecutionStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "execution-repo.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "EXECUTION_REPO_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum replica checks per read.
pub(crate) const MAX_REPLICA_ATTEMPTS: u32 = 10;
/// Maximum initial backoff between replica checks in milliseconds.
pub(crate) const MAX_REPLICA_BACKOFF_MS: u64 = 10_000;
/// Default initial backoff between replica checks in milliseconds.
pub(crate) const DEFAULT_REPLICA_BACKOFF_MS: u64 = 100;
/// Maximum stage check workers.
pub(crate) const MAX_STAGE_CHECK_PARALLELISM: usize = 64;
/// Default log filter directive.
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Execution repository configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionRepositoryConfig {
    /// Authoritative store.
    pub primary: SqliteExecutionStoreConfig,
    /// Asynchronously replicated store.
    #[serde(default)]
    pub replica: Option<SqliteExecutionStoreConfig>,
    /// Compressed body handling.
    #[serde(default)]
    pub compression: CompressionConfig,
    /// Replica check tuning.
    #[serde(default)]
    pub read_replica: ReadReplicaConfig,
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ExecutionRepositoryConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("primary store: {err}")))?;
        if let Some(replica) = &self.replica {
            replica
                .validate()
                .map_err(|err| ConfigError::Invalid(format!("replica store: {err}")))?;
            if replica.path == self.primary.path {
                return Err(ConfigError::Invalid(
                    "replica path must differ from primary path".to_string(),
                ));
            }
        }
        self.read_replica.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Returns the body source policy shared by both stores.
    #[must_use]
    pub const fn body_source_policy(&self) -> BodySourcePolicy {
        self.compression.body_source_policy()
    }

    /// Returns the consistency router configuration.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        self.read_replica.router_config()
    }
}

/// Compressed body configuration.
///
/// Only the read side lives here; the algorithm used for new bodies belongs
/// to the writer, so unknown keys such as `compression_type` are rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompressionConfig {
    /// Reads compressed bodies when present.
    #[serde(default)]
    pub enabled: bool,
}

impl CompressionConfig {
    /// Returns the body source policy for this configuration.
    #[must_use]
    pub const fn body_source_policy(&self) -> BodySourcePolicy {
        BodySourcePolicy::new(CompressionState::from_enabled(self.enabled))
    }
}

/// Replica check configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReadReplicaConfig {
    /// Replica checks per consistent read; one disables retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second check, doubled for each later check.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Concurrent stage freshness checks.
    #[serde(default = "default_stage_check_parallelism")]
    pub stage_check_parallelism: usize,
}

impl Default for ReadReplicaConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            stage_check_parallelism: default_stage_check_parallelism(),
        }
    }
}

impl ReadReplicaConfig {
    /// Validates replica check limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_REPLICA_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "read_replica.max_attempts must be between 1 and {MAX_REPLICA_ATTEMPTS}"
            )));
        }
        if self.backoff_ms > MAX_REPLICA_BACKOFF_MS {
            return Err(ConfigError::Invalid(format!(
                "read_replica.backoff_ms must be at most {MAX_REPLICA_BACKOFF_MS}"
            )));
        }
        if self.stage_check_parallelism == 0
            || self.stage_check_parallelism > MAX_STAGE_CHECK_PARALLELISM
        {
            return Err(ConfigError::Invalid(format!(
                "read_replica.stage_check_parallelism must be between 1 and \
                 {MAX_STAGE_CHECK_PARALLELISM}"
            )));
        }
        Ok(())
    }

    /// Returns the router configuration for these settings.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            retry: ReplicaRetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.backoff_ms),
                ..ReplicaRetryPolicy::single_attempt()
            },
            stage_check_parallelism: self.stage_check_parallelism,
        }
    }
}

/// Returns the default replica check count.
const fn default_max_attempts() -> u32 {
    1
}

/// Returns the default replica backoff.
const fn default_backoff_ms() -> u64 {
    DEFAULT_REPLICA_BACKOFF_MS
}

/// Returns the default stage check parallelism.
const fn default_stage_check_parallelism() -> usize {
    1
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Returns the default log filter.
fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
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

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
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

// ============================================================================
// SECTION: Tests
// ============================================================================
