// crates/execution-repo-core/src/lib.rs
// ============================================================================
// Module: Execution Repository Core Library
// Description: Public API surface for the execution repository read path.
// Purpose: Expose domain types, collaborator interfaces, and the consistency router.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The execution repository core decides, per read, whether an asynchronously
//! replicated store holds a fresh enough copy of a pipeline execution and its
//! stages, or whether the read must be served by the primary store. Stores,
//! the replication lag oracle, body decoding, and metrics are reached through
//! explicit interfaces so backends and tests can supply their own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BodyCodec;
pub use interfaces::BodyPayload;
pub use interfaces::CodecError;
pub use interfaces::CompressedBody;
pub use interfaces::DeadlineExceeded;
pub use interfaces::ExecutionStore;
pub use interfaces::OracleError;
pub use interfaces::ReadContext;
pub use interfaces::ReplicationLagOracle;
pub use interfaces::StoreError;
pub use runtime::BodySource;
pub use runtime::BodySourcePolicy;
pub use runtime::CompressionState;
pub use runtime::ConsistencyRouter;
pub use runtime::CounterSample;
pub use runtime::DataAccessCause;
pub use runtime::DataAccessFailure;
pub use runtime::InMemoryExecutionStore;
pub use runtime::InMemoryReplicationLagOracle;
pub use runtime::InMemoryRetrieveMetrics;
pub use runtime::MetricsSnapshot;
pub use runtime::NoopRetrieveMetrics;
pub use runtime::ReadOperation;
pub use runtime::ReadReplicaRequirement;
pub use runtime::ReplicaRetryPolicy;
pub use runtime::ResultCode;
pub use runtime::RetrieveError;
pub use runtime::RetrieveMetrics;
pub use runtime::RetrieveOutcome;
pub use runtime::RouterConfig;
pub use runtime::RowVersion;
pub use runtime::is_fresh;
