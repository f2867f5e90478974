// crates/execution-repo-core/src/interfaces/mod.rs
// ============================================================================
// Module: Execution Repository Interfaces
// Description: Backend-agnostic interfaces for stores, the lag oracle, and codecs.
// Purpose: Define the contract surfaces consumed by the consistency router.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces keep the router independent of any particular SQL backend,
//! replication telemetry source, or body encoding. Every store and oracle call
//! receives the caller's [`ReadContext`] so an abandoned read stops issuing
//! downstream work once its deadline has passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;

use crate::core::Execution;
use crate::core::ExecutionId;
use crate::core::ExecutionKind;
use crate::core::StageId;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Read Context
// ============================================================================

/// Error returned once a read's deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read deadline exceeded")]
pub struct DeadlineExceeded;

/// Per-read context propagated into every downstream call.
///
/// # Invariants
/// - A context without a deadline never expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadContext {
    /// Instant after which downstream work should stop.
    deadline: Option<Instant>,
}

impl ReadContext {
    /// Returns a context without a deadline.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            deadline: None,
        }
    }

    /// Returns a context that expires at `deadline`.
    #[must_use]
    pub const fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Returns a context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline, or `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails once the deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineExceeded`] when the deadline is in the past.
    pub fn ensure_active(&self) -> Result<(), DeadlineExceeded> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Execution Store
// ============================================================================

/// Execution store errors.
///
/// # Invariants
/// - Messages never embed decoded body content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("execution store io error: {0}")]
    Io(String),
    /// Database engine error.
    #[error("execution store db error: {0}")]
    Db(String),
    /// Stored data is corrupted.
    #[error("execution store corruption: {0}")]
    Corrupt(String),
    /// Stored data is invalid.
    #[error("execution store invalid data: {0}")]
    Invalid(String),
    /// A stored body could not be decoded.
    #[error("execution store codec error: {0}")]
    Codec(String),
    /// The read deadline passed before the store answered.
    #[error("execution store deadline exceeded")]
    DeadlineExceeded,
}

impl From<DeadlineExceeded> for StoreError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

impl From<CodecError> for StoreError {
    fn from(error: CodecError) -> Self {
        Self::Codec(error.to_string())
    }
}

/// Read access to one physical execution store.
///
/// Implementations are pure data access: they pick body sources and
/// `updated_at` values per entity but make no freshness decisions.
pub trait ExecutionStore: Send + Sync {
    /// Loads an execution and all of its stages.
    ///
    /// Returns `Ok(None)` when the store has no execution with this id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read or a row cannot
    /// be decoded.
    fn load_aggregate(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError>;
}

// ============================================================================
// SECTION: Replication Lag Oracle
// ============================================================================

/// Replication lag oracle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The oracle backend could not be reached.
    #[error("replication lag oracle unavailable: {0}")]
    Unavailable(String),
    /// The oracle returned unusable data.
    #[error("replication lag oracle invalid data: {0}")]
    Invalid(String),
    /// The read deadline passed before the oracle answered.
    #[error("replication lag oracle deadline exceeded")]
    DeadlineExceeded,
}

impl From<DeadlineExceeded> for OracleError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}

/// Source of the instants a replica copy must have reached to be fresh.
///
/// Query methods return `Ok(None)` when the oracle holds no bookkeeping for
/// the id. That is distinct from an error and from a stale copy.
pub trait ReplicationLagOracle: Send + Sync {
    /// Returns the instant the execution row must have reached.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the oracle cannot answer.
    fn expected_pipeline_update(
        &self,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError>;

    /// Returns the instant the stage row must have reached.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the oracle cannot answer.
    fn expected_stage_update(
        &self,
        id: &StageId,
        ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError>;

    /// Returns the number of stages the execution is expected to have.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the oracle cannot answer.
    fn expected_stage_count(
        &self,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<usize>, OracleError>;

    /// Records bookkeeping for an aggregate read from the primary store.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the bookkeeping cannot be stored.
    fn record_execution(&self, _execution: &Execution) -> Result<(), OracleError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Body Codec
// ============================================================================

/// Body codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Compression type label is not supported.
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(String),
    /// Body bytes could not be compressed.
    #[error("body compression failed: {0}")]
    Compress(String),
    /// Compressed bytes could not be decompressed.
    #[error("body decompression failed: {0}")]
    Decompress(String),
    /// Decompressed body exceeded the size limit.
    #[error("body exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Bytes seen before decoding stopped.
        actual_bytes: usize,
    },
    /// Body text is not valid JSON.
    #[error("body parse failed: {0}")]
    Parse(String),
    /// Neither a raw nor a compressed body is present.
    #[error("body is empty")]
    Empty,
}

/// Compressed copy of a body, as stored in a compressed-body table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedBody<'a> {
    /// Compressed bytes.
    pub bytes: &'a [u8],
    /// Compression type label stored next to the bytes.
    pub compression_type: &'a str,
}

/// Stored body columns for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPayload<'a> {
    /// Raw body column; empty when the body lives in the compressed table.
    pub raw: &'a str,
    /// Compressed body, when one was selected.
    pub compressed: Option<CompressedBody<'a>>,
}

/// Decodes stored bodies into JSON documents.
pub trait BodyCodec: Send + Sync {
    /// Decodes a stored body.
    ///
    /// The compressed body is used only when `compression_enabled` is set and
    /// one is present; otherwise the raw body is parsed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the body cannot be decoded.
    fn decode(
        &self,
        payload: &BodyPayload<'_>,
        compression_enabled: bool,
    ) -> Result<Value, CodecError>;
}
