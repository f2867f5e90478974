// crates/execution-repo-core/src/runtime/router.rs
// ============================================================================
// Module: Consistency Router
// Description: Bounded-staleness read routing across replica and primary stores.
// Purpose: Serve each read from the replica only when every entity is fresh.
// Dependencies: crate::{core, interfaces, runtime}, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`ConsistencyRouter`] is the single read entry point. Reads that tolerate
//! eventual consistency go straight to the replica. Consistent reads load the
//! whole aggregate from the replica, compare the execution and every stage
//! against the replication lag oracle, and return the replica copy only when
//! all of them pass. Any stale, missing, or unknown entity sends the whole
//! read to the primary; aggregates are never assembled from both stores.
//!
//! Store and oracle failures are not masked by a primary read. They are
//! counted with [`ResultCode::Failure`] and returned to the caller with the
//! original cause attached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Execution;
use crate::core::ExecutionId;
use crate::core::ExecutionKind;
use crate::core::ExecutionStatus;
use crate::core::StageExecution;
use crate::interfaces::DeadlineExceeded;
use crate::interfaces::ExecutionStore;
use crate::interfaces::OracleError;
use crate::interfaces::ReadContext;
use crate::interfaces::ReplicationLagOracle;
use crate::interfaces::StoreError;
use crate::runtime::freshness::is_fresh;
use crate::runtime::metrics::ResultCode;
use crate::runtime::metrics::RetrieveMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default delay before the second replica check.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);
/// Default growth factor between replica checks.
const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;
/// Upper bound on any single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Freshness the caller requires from the replica copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadReplicaRequirement {
    /// Any replica copy is acceptable; no checks or metrics.
    None,
    /// The replica copy must exist.
    Present,
    /// The replica copy and every stage must be at least as new as expected.
    UpToDate,
}

impl ReadReplicaRequirement {
    /// Maps the boolean consistency flag onto a requirement.
    #[must_use]
    pub const fn from_consistency(require_consistency: bool) -> Self {
        if require_consistency { Self::UpToDate } else { Self::None }
    }

    /// Returns a stable label for the requirement.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Present => "PRESENT",
            Self::UpToDate => "UP_TO_DATE",
        }
    }
}

impl fmt::Display for ReadReplicaRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded retry of the replica check before falling back to the primary.
///
/// # Invariants
/// - `max_attempts` of zero behaves as one.
/// - Only [`ResultCode::is_retryable`] outcomes are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaRetryPolicy {
    /// Maximum replica checks per read.
    pub max_attempts: u32,
    /// Delay before the second check.
    pub initial_backoff: Duration,
    /// Growth factor applied to each later delay.
    pub backoff_multiplier: u32,
}

impl Default for ReplicaRetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl ReplicaRetryPolicy {
    /// Returns a policy that checks the replica exactly once.
    #[must_use]
    pub const fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Returns the delay after `attempt` (1-based) failed.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.backoff_multiplier.max(1).saturating_pow(exponent);
        self.initial_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Returns `max_attempts`, treating zero as one.
    #[must_use]
    pub const fn effective_max_attempts(&self) -> u32 {
        if self.max_attempts == 0 { 1 } else { self.max_attempts }
    }
}

/// Configuration for the consistency router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Replica check retry policy.
    pub retry: ReplicaRetryPolicy,
    /// Worker count for stage checks; one checks stages sequentially.
    pub stage_check_parallelism: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retry: ReplicaRetryPolicy::single_attempt(),
            stage_check_parallelism: 1,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Downstream call that failed during a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOperation {
    /// Loading the aggregate from the replica.
    ReplicaLoad,
    /// Loading the aggregate from the primary.
    PrimaryLoad,
    /// Querying the oracle for the execution.
    OracleLookup,
    /// Querying the oracle for a stage.
    StageCheck,
}

impl ReadOperation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReplicaLoad => "replica_load",
            Self::PrimaryLoad => "primary_load",
            Self::OracleLookup => "oracle_lookup",
            Self::StageCheck => "stage_check",
        }
    }
}

impl fmt::Display for ReadOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Original cause of a data-access failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataAccessCause {
    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An oracle call failed.
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// The read deadline passed between downstream calls.
    #[error(transparent)]
    Deadline(#[from] DeadlineExceeded),
}

/// Failed downstream call with its cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAccessFailure {
    /// Call that failed.
    pub operation: ReadOperation,
    /// Original cause.
    pub cause: DataAccessCause,
}

impl DataAccessFailure {
    /// Creates a failure record.
    #[must_use]
    pub fn new(operation: ReadOperation, cause: impl Into<DataAccessCause>) -> Self {
        Self {
            operation,
            cause: cause.into(),
        }
    }
}

/// Errors returned to callers of the router.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// Neither store holds the execution.
    #[error("no {kind} execution found for id {id} (read replica requirement {requirement})")]
    NotFound {
        /// Requested kind.
        kind: ExecutionKind,
        /// Requested id.
        id: ExecutionId,
        /// Requested freshness.
        requirement: ReadReplicaRequirement,
    },
    /// A store or oracle call failed.
    #[error("execution repository data access failed during {operation}: {source}")]
    DataAccess {
        /// Call that failed.
        operation: ReadOperation,
        /// Result code the failure was counted under.
        result_code: ResultCode,
        /// Original cause.
        #[source]
        source: DataAccessCause,
    },
}

impl RetrieveError {
    /// Returns true for [`RetrieveError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of routing one read, before conversion into a caller result.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrieveOutcome {
    /// Replica copy passed every check.
    Fresh {
        /// Replica-sourced aggregate.
        execution: Execution,
        /// Replica checks made, including the passing one.
        num_attempts: u32,
    },
    /// Replica copy was unusable; primary copy served instead.
    StaleFallback {
        /// Primary-sourced aggregate.
        execution: Execution,
        /// Why the replica copy was rejected.
        reason: ResultCode,
    },
    /// Served without a freshness decision.
    Unverified(Execution),
    /// Neither store holds the execution.
    NotFound,
    /// A store or oracle call failed.
    Error(DataAccessFailure),
}

impl RetrieveOutcome {
    /// Returns the aggregate, when one was served.
    #[must_use]
    pub const fn execution(&self) -> Option<&Execution> {
        match self {
            Self::Fresh {
                execution,
                ..
            }
            | Self::StaleFallback {
                execution,
                ..
            }
            | Self::Unverified(execution) => Some(execution),
            Self::NotFound | Self::Error(_) => None,
        }
    }

    /// Returns the result code the outcome is classified under.
    #[must_use]
    pub const fn result_code(&self) -> Option<ResultCode> {
        match self {
            Self::Fresh {
                ..
            } => Some(ResultCode::Success),
            Self::StaleFallback {
                reason,
                ..
            } => Some(*reason),
            Self::Unverified(_) => None,
            Self::NotFound => Some(ResultCode::NotFound),
            Self::Error(_) => Some(ResultCode::Failure),
        }
    }

    /// Converts the outcome into the caller-facing result.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::NotFound`] or [`RetrieveError::DataAccess`]
    /// for the matching outcomes.
    pub fn into_result(
        self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
    ) -> Result<Execution, RetrieveError> {
        match self {
            Self::Fresh {
                execution,
                ..
            }
            | Self::StaleFallback {
                execution,
                ..
            }
            | Self::Unverified(execution) => Ok(execution),
            Self::NotFound => Err(RetrieveError::NotFound {
                kind,
                id: id.clone(),
                requirement,
            }),
            Self::Error(failure) => Err(RetrieveError::DataAccess {
                operation: failure.operation,
                result_code: ResultCode::Failure,
                source: failure.cause,
            }),
        }
    }
}

/// Outcome of one replica check.
#[derive(Debug)]
enum ReplicaVerdict {
    /// Every check passed.
    Fresh(Execution),
    /// The replica copy cannot be used.
    Unusable(ResultCode),
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Consistency router over a primary store, an optional replica, and an
/// optional replication lag oracle.
///
/// # Invariants
/// - Returned aggregates come entirely from one store.
/// - The router never writes to either store.
/// - Consistent reads increment the total-attempts counter exactly once.
pub struct ConsistencyRouter<P, R, O, M> {
    /// Authoritative store.
    primary: P,
    /// Asynchronously replicated store.
    replica: Option<R>,
    /// Replication lag oracle.
    oracle: Option<O>,
    /// Metrics sink.
    metrics: M,
    /// Router configuration.
    config: RouterConfig,
}

impl<P, R, O, M> ConsistencyRouter<P, R, O, M>
where
    P: ExecutionStore,
    R: ExecutionStore,
    O: ReplicationLagOracle,
    M: RetrieveMetrics,
{
    /// Creates a router.
    ///
    /// Without both a replica and an oracle, consistent reads go straight to
    /// the primary.
    pub fn new(
        primary: P,
        replica: Option<R>,
        oracle: Option<O>,
        metrics: M,
        config: RouterConfig,
    ) -> Self {
        info!(
            replica_configured = replica.is_some(),
            oracle_configured = oracle.is_some(),
            max_attempts = config.retry.effective_max_attempts(),
            stage_check_parallelism = config.stage_check_parallelism,
            "consistency router created"
        );
        Self {
            primary,
            replica,
            oracle,
            metrics,
            config,
        }
    }

    /// Returns the router configuration.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns the metrics sink.
    #[must_use]
    pub const fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Returns true when consistent reads are checked against the replica.
    #[must_use]
    pub const fn strict_consistency_enforced(&self) -> bool {
        self.replica.is_some() && self.oracle.is_some()
    }

    /// Reads an execution, optionally requiring an up-to-date copy.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError::NotFound`] when neither store holds the
    /// execution and [`RetrieveError::DataAccess`] when a store or oracle
    /// call fails.
    pub fn retrieve(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        require_consistency: bool,
    ) -> Result<Execution, RetrieveError> {
        self.retrieve_with(
            kind,
            id,
            ReadReplicaRequirement::from_consistency(require_consistency),
            &ReadContext::unbounded(),
        )
    }

    /// Reads an execution under an explicit requirement and context.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError`] as for [`ConsistencyRouter::retrieve`].
    pub fn retrieve_with(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
        ctx: &ReadContext,
    ) -> Result<Execution, RetrieveError> {
        self.resolve(kind, id, requirement, ctx).into_result(kind, id, requirement)
    }

    /// Reads only the status of an execution.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError`] as for [`ConsistencyRouter::retrieve`].
    pub fn retrieve_status(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
        ctx: &ReadContext,
    ) -> Result<ExecutionStatus, RetrieveError> {
        Ok(self.retrieve_with(kind, id, requirement, ctx)?.status)
    }

    /// Reads the owning application of an execution.
    ///
    /// The application never changes after creation, so any replica copy is
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`RetrieveError`] as for [`ConsistencyRouter::retrieve`].
    pub fn retrieve_application(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<String, RetrieveError> {
        Ok(self.retrieve_with(kind, id, ReadReplicaRequirement::Present, ctx)?.application)
    }

    /// Routes one read and returns the classified outcome.
    pub fn resolve(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
        ctx: &ReadContext,
    ) -> RetrieveOutcome {
        match (requirement, &self.replica, &self.oracle) {
            (ReadReplicaRequirement::None, Some(replica), _) => {
                Self::load_unverified(replica, ReadOperation::ReplicaLoad, kind, id, ctx)
            }
            (_, None, _) | (_, _, None) => {
                Self::load_unverified(&self.primary, ReadOperation::PrimaryLoad, kind, id, ctx)
            }
            (_, Some(replica), Some(oracle)) => {
                self.resolve_consistent(kind, id, requirement, replica, oracle, ctx)
            }
        }
    }

    /// Loads an aggregate from one store without any freshness decision.
    fn load_unverified<S: ExecutionStore>(
        store: &S,
        operation: ReadOperation,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> RetrieveOutcome {
        match store.load_aggregate(kind, id, ctx) {
            Ok(Some(execution)) => RetrieveOutcome::Unverified(execution),
            Ok(None) => {
                debug!(kind = %kind, id = %id, operation = %operation, "execution not found");
                RetrieveOutcome::NotFound
            }
            Err(err) => {
                error!(
                    kind = %kind,
                    id = %id,
                    operation = %operation,
                    error = %err,
                    "execution read failed"
                );
                RetrieveOutcome::Error(DataAccessFailure::new(operation, err))
            }
        }
    }

    /// Runs the replica checks and falls back to the primary when needed.
    fn resolve_consistent(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
        replica: &R,
        oracle: &O,
        ctx: &ReadContext,
    ) -> RetrieveOutcome {
        self.metrics.record_total_attempt();
        let max_attempts = self.config.retry.effective_max_attempts();
        let mut attempt = 1_u32;
        let reason = loop {
            match self.check_replica(kind, id, requirement, replica, oracle, ctx) {
                Ok(ReplicaVerdict::Fresh(execution)) => {
                    self.metrics.record_succeeded(attempt);
                    debug!(
                        kind = %kind,
                        id = %id,
                        num_attempts = attempt,
                        "served consistent read from replica"
                    );
                    return RetrieveOutcome::Fresh {
                        execution,
                        num_attempts: attempt,
                    };
                }
                Ok(ReplicaVerdict::Unusable(reason)) => {
                    if attempt < max_attempts
                        && reason.is_retryable()
                        && self.wait_before_retry(attempt, ctx)
                    {
                        attempt += 1;
                        continue;
                    }
                    break reason;
                }
                Err(failure) => return self.fail(kind, id, failure),
            }
        };
        self.fall_back(kind, id, reason, oracle, ctx)
    }

    /// Checks the replica copy of one aggregate.
    fn check_replica(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        requirement: ReadReplicaRequirement,
        replica: &R,
        oracle: &O,
        ctx: &ReadContext,
    ) -> Result<ReplicaVerdict, DataAccessFailure> {
        let loaded = replica
            .load_aggregate(kind, id, ctx)
            .map_err(|err| DataAccessFailure::new(ReadOperation::ReplicaLoad, err))?;
        let Some(execution) = loaded else {
            return Ok(ReplicaVerdict::Unusable(ResultCode::NotFound));
        };
        if requirement != ReadReplicaRequirement::UpToDate {
            return Ok(ReplicaVerdict::Fresh(execution));
        }

        let expected = oracle
            .expected_pipeline_update(id, ctx)
            .map_err(|err| DataAccessFailure::new(ReadOperation::OracleLookup, err))?;
        let Some(expected) = expected else {
            return Ok(ReplicaVerdict::Unusable(ResultCode::MissingFromReplicationLagRepository));
        };
        if !is_fresh(expected, execution.updated_at) {
            return Ok(ReplicaVerdict::Unusable(ResultCode::InvalidVersion));
        }

        let expected_count = oracle
            .expected_stage_count(id, ctx)
            .map_err(|err| DataAccessFailure::new(ReadOperation::OracleLookup, err))?;
        let Some(expected_count) = expected_count else {
            return Ok(ReplicaVerdict::Unusable(ResultCode::MissingFromReplicationLagRepository));
        };
        if expected_count > 0 {
            if execution.stages.len() != expected_count {
                return Ok(ReplicaVerdict::Unusable(ResultCode::InvalidVersion));
            }
            if let Some(reason) = self.check_stages(&execution.stages, oracle, ctx)? {
                return Ok(ReplicaVerdict::Unusable(reason));
            }
        }
        Ok(ReplicaVerdict::Fresh(execution))
    }

    /// Checks every stage and returns the first rejection in stage order.
    fn check_stages(
        &self,
        stages: &[StageExecution],
        oracle: &O,
        ctx: &ReadContext,
    ) -> Result<Option<ResultCode>, DataAccessFailure> {
        let parallelism = self.config.stage_check_parallelism;
        if parallelism <= 1 || stages.len() < 2 {
            return first_rejected_stage(stages, oracle, ctx);
        }
        let chunk_size = stages.len().div_ceil(parallelism);
        let chunk_results: Vec<Result<Option<ResultCode>, DataAccessFailure>> =
            thread::scope(|scope| {
                let workers: Vec<_> = stages
                    .chunks(chunk_size)
                    .map(|chunk| scope.spawn(move || first_rejected_stage(chunk, oracle, ctx)))
                    .collect();
                workers
                    .into_iter()
                    .map(|worker| {
                        worker.join().unwrap_or_else(|_| {
                            Err(DataAccessFailure::new(
                                ReadOperation::StageCheck,
                                OracleError::Unavailable("stage check worker panicked".to_string()),
                            ))
                        })
                    })
                    .collect()
            });
        for result in chunk_results {
            if let Some(reason) = result? {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    /// Sleeps before the next replica check unless the deadline would pass.
    ///
    /// Returns false when the caller should fall back immediately.
    fn wait_before_retry(&self, attempt: u32, ctx: &ReadContext) -> bool {
        let delay = self.config.retry.delay_after(attempt);
        if let Some(remaining) = ctx.remaining()
            && remaining <= delay
        {
            return false;
        }
        thread::sleep(delay);
        true
    }

    /// Serves the read from the primary after the replica copy was rejected.
    fn fall_back(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        reason: ResultCode,
        oracle: &O,
        ctx: &ReadContext,
    ) -> RetrieveOutcome {
        match self.primary.load_aggregate(kind, id, ctx) {
            Ok(Some(execution)) => {
                self.metrics.record_failed(reason);
                debug!(
                    kind = %kind,
                    id = %id,
                    result_code = %reason,
                    "replica copy rejected; served from primary"
                );
                if reason == ResultCode::MissingFromReplicationLagRepository
                    && let Err(err) = oracle.record_execution(&execution)
                {
                    warn!(
                        kind = %kind,
                        id = %id,
                        error = %err,
                        "failed to repopulate replication lag bookkeeping"
                    );
                }
                RetrieveOutcome::StaleFallback {
                    execution,
                    reason,
                }
            }
            Ok(None) => {
                if reason != ResultCode::NotFound {
                    self.metrics.record_failed(reason);
                }
                debug!(kind = %kind, id = %id, result_code = %reason, "execution not found");
                RetrieveOutcome::NotFound
            }
            Err(err) => {
                self.fail(kind, id, DataAccessFailure::new(ReadOperation::PrimaryLoad, err))
            }
        }
    }

    /// Counts and logs an infrastructure failure.
    fn fail(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        failure: DataAccessFailure,
    ) -> RetrieveOutcome {
        self.metrics.record_failed(ResultCode::Failure);
        error!(
            kind = %kind,
            id = %id,
            operation = %failure.operation,
            error = %failure.cause,
            "consistent execution read failed"
        );
        RetrieveOutcome::Error(failure)
    }
}

// ============================================================================
// SECTION: Stage Checks
// ============================================================================

/// Returns the rejection for the first stage that fails its check.
fn first_rejected_stage<O: ReplicationLagOracle>(
    stages: &[StageExecution],
    oracle: &O,
    ctx: &ReadContext,
) -> Result<Option<ResultCode>, DataAccessFailure> {
    for stage in stages {
        let expected = oracle
            .expected_stage_update(&stage.id, ctx)
            .map_err(|err| DataAccessFailure::new(ReadOperation::StageCheck, err))?;
        match expected {
            None => return Ok(Some(ResultCode::MissingFromReplicationLagRepository)),
            Some(expected) if !is_fresh(expected, stage.updated_at) => {
                return Ok(Some(ResultCode::InvalidVersion));
            }
            Some(_) => {}
        }
    }
    Ok(None)
}
