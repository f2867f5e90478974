// crates/execution-repo-core/src/core/execution.rs
// ============================================================================
// Module: Execution Records
// Description: Execution aggregates and their stage sub-records.
// Purpose: Carry a fully assembled aggregate from whichever store served it.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An [`Execution`] is the aggregate returned by every read: the execution row,
//! its decoded body, and all of its [`StageExecution`] rows. Aggregates are
//! built fresh for each read and always come from exactly one store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::StageId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Execution Kind
// ============================================================================

/// Kind of execution, which selects the tables an execution lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionKind {
    /// Pipeline execution.
    Pipeline,
    /// Ad-hoc orchestration execution.
    Orchestration,
}

impl ExecutionKind {
    /// Returns the stable label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pipeline => "PIPELINE",
            Self::Orchestration => "ORCHESTRATION",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Execution Status
// ============================================================================

/// Lifecycle status shared by executions and stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Not yet started.
    NotStarted,
    /// Currently running.
    Running,
    /// Paused by an operator.
    Paused,
    /// Suspended while waiting on an external event.
    Suspended,
    /// Completed successfully.
    Succeeded,
    /// Failed, but downstream work continues.
    FailedContinue,
    /// Failed terminally.
    Terminal,
    /// Canceled before completion.
    Canceled,
    /// Redirected to another branch.
    Redirect,
    /// Stopped without failing.
    Stopped,
    /// Skipped.
    Skipped,
    /// Waiting in a concurrency buffer.
    Buffered,
}

impl ExecutionStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::NotStarted,
        Self::Running,
        Self::Paused,
        Self::Suspended,
        Self::Succeeded,
        Self::FailedContinue,
        Self::Terminal,
        Self::Canceled,
        Self::Redirect,
        Self::Stopped,
        Self::Skipped,
        Self::Buffered,
    ];

    /// Returns the stable label stored in status columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Suspended => "SUSPENDED",
            Self::Succeeded => "SUCCEEDED",
            Self::FailedContinue => "FAILED_CONTINUE",
            Self::Terminal => "TERMINAL",
            Self::Canceled => "CANCELED",
            Self::Redirect => "REDIRECT",
            Self::Stopped => "STOPPED",
            Self::Skipped => "SKIPPED",
            Self::Buffered => "BUFFERED",
        }
    }

    /// Returns true when no further transitions are expected.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::FailedContinue
                | Self::Terminal
                | Self::Canceled
                | Self::Stopped
                | Self::Skipped
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status label that matches no known [`ExecutionStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown execution status: {0}")]
pub struct UnknownExecutionStatus(pub String);

impl FromStr for ExecutionStatus {
    type Err = UnknownExecutionStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownExecutionStatus(value.to_string()))
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// One step of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageExecution {
    /// Stage identifier.
    pub id: StageId,
    /// Owning execution.
    pub execution_id: ExecutionId,
    /// Display name.
    pub name: String,
    /// Stage status.
    pub status: ExecutionStatus,
    /// Last write instant as recorded by the serving store.
    pub updated_at: Timestamp,
    /// Decoded stage body.
    pub body: Value,
}

/// Execution aggregate: the execution row plus every stage row.
///
/// # Invariants
/// - All fields, including every stage, were read from the same store.
/// - `stages` preserves the order the serving store returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution identifier.
    pub id: ExecutionId,
    /// Execution kind.
    pub kind: ExecutionKind,
    /// Owning application.
    pub application: String,
    /// Display name, when the body carries one.
    pub name: Option<String>,
    /// Instant the execution was built.
    pub build_time: Option<Timestamp>,
    /// Instant the execution started.
    pub start_time: Option<Timestamp>,
    /// Instant the execution ended.
    pub end_time: Option<Timestamp>,
    /// Whether the execution was canceled.
    pub canceled: bool,
    /// Execution status.
    pub status: ExecutionStatus,
    /// Last write instant as recorded by the serving store.
    pub updated_at: Timestamp,
    /// Decoded execution body.
    pub body: Value,
    /// Stage records.
    pub stages: Vec<StageExecution>,
}

impl Execution {
    /// Returns the stage with the given identifier.
    #[must_use]
    pub fn stage(&self, id: &StageId) -> Option<&StageExecution> {
        self.stages.iter().find(|stage| &stage.id == id)
    }
}
