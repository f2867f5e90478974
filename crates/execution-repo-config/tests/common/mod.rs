// crates/execution-repo-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for execution-repo-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use execution_repo_config::ConfigError;
use execution_repo_config::ExecutionRepositoryConfig;

/// Result type for tests that report failures as messages.
pub type TestResult = Result<(), String>;

/// Smallest valid configuration: a primary store and defaults elsewhere.
pub const MINIMAL_TOML: &str = "[primary]\npath = \"primary.db\"\n";

/// Parses a TOML string into an `ExecutionRepositoryConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<ExecutionRepositoryConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<ExecutionRepositoryConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}

/// Checks that `result` failed with a message containing `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
