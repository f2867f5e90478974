// crates/execution-repo-core/src/runtime/mod.rs
// ============================================================================
// Module: Execution Repository Runtime
// Description: Freshness rules, read routing, metrics, and in-memory fakes.
// Purpose: Decide which store serves each read and account for the decision.
// Dependencies: crate::{core, interfaces}, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the consistency router, the freshness rule it
//! applies to every entity, the body-source policy shared by store adapters,
//! and the metrics contract. In-memory stores and oracles live here so tests
//! and local tooling can drive the router without a database.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod freshness;
pub mod metrics;
pub mod oracle;
pub mod router;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use freshness::BodySource;
pub use freshness::BodySourcePolicy;
pub use freshness::CompressionState;
pub use freshness::RowVersion;
pub use freshness::is_fresh;
pub use metrics::CounterSample;
pub use metrics::InMemoryRetrieveMetrics;
pub use metrics::MetricsSnapshot;
pub use metrics::NoopRetrieveMetrics;
pub use metrics::ResultCode;
pub use metrics::RetrieveMetrics;
pub use oracle::InMemoryReplicationLagOracle;
pub use router::ConsistencyRouter;
pub use router::DataAccessCause;
pub use router::DataAccessFailure;
pub use router::ReadOperation;
pub use router::ReadReplicaRequirement;
pub use router::ReplicaRetryPolicy;
pub use router::RetrieveError;
pub use router::RetrieveOutcome;
pub use router::RouterConfig;
pub use store::InMemoryExecutionStore;
