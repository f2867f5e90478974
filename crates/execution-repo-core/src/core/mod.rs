// crates/execution-repo-core/src/core/mod.rs
// ============================================================================
// Module: Execution Repository Core Types
// Description: Canonical execution and stage records.
// Purpose: Provide stable, serializable types shared by stores and the router.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types describe executions, their stages, and the identifiers and
//! instants used to compare replica copies against expected writes.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod execution;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use execution::Execution;
pub use execution::ExecutionKind;
pub use execution::ExecutionStatus;
pub use execution::StageExecution;
pub use execution::UnknownExecutionStatus;
pub use identifiers::ExecutionId;
pub use identifiers::StageId;
pub use time::Timestamp;
