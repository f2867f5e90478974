// crates/execution-repo-core/tests/common/mod.rs
// =============================================================================
// Module: Router Test Helpers
// Description: Aggregate builders, fixtures, and fault-injecting collaborators.
// Purpose: Reduce duplication across consistency router test suites.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only helpers may panic on setup failure."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use execution_repo_core::ConsistencyRouter;
use execution_repo_core::Execution;
use execution_repo_core::ExecutionId;
use execution_repo_core::ExecutionKind;
use execution_repo_core::ExecutionStatus;
use execution_repo_core::ExecutionStore;
use execution_repo_core::InMemoryExecutionStore;
use execution_repo_core::InMemoryReplicationLagOracle;
use execution_repo_core::InMemoryRetrieveMetrics;
use execution_repo_core::OracleError;
use execution_repo_core::ReadContext;
use execution_repo_core::ReplicationLagOracle;
use execution_repo_core::RouterConfig;
use execution_repo_core::StageExecution;
use execution_repo_core::StageId;
use execution_repo_core::StoreError;
use execution_repo_core::Timestamp;
use serde_json::json;

/// Pipeline id used by most scenarios.
pub const PIPELINE_ID: &str = "01HZX3J6Q4PIPELINE";
/// Name carried by replica copies.
pub const REPLICA_NAME: &str = "replica-pipeline";
/// Name carried by primary copies.
pub const PRIMARY_NAME: &str = "primary-pipeline";

/// Router type used with in-memory collaborators.
pub type MemoryRouter = ConsistencyRouter<
    InMemoryExecutionStore,
    InMemoryExecutionStore,
    InMemoryReplicationLagOracle,
    InMemoryRetrieveMetrics,
>;

/// Returns the pipeline id used by most scenarios.
pub fn pipeline_id() -> ExecutionId {
    ExecutionId::new(PIPELINE_ID)
}

/// Builds a stage whose body records which store it was written to.
pub fn stage(execution_id: &str, stage_id: &str, updated_at: i64, source: &str) -> StageExecution {
    StageExecution {
        id: StageId::new(stage_id),
        execution_id: ExecutionId::new(execution_id),
        name: format!("stage {stage_id}"),
        status: ExecutionStatus::Running,
        updated_at: Timestamp::from_unix_millis(updated_at),
        body: json!({ "refId": stage_id, "source": source }),
    }
}

/// Builds a pipeline aggregate.
pub fn pipeline(
    id: &str,
    name: &str,
    updated_at: i64,
    stages: Vec<StageExecution>,
) -> Execution {
    Execution {
        id: ExecutionId::new(id),
        kind: ExecutionKind::Pipeline,
        application: "deployer".to_string(),
        name: Some(name.to_string()),
        build_time: Some(Timestamp::from_unix_millis(1_000)),
        start_time: Some(Timestamp::from_unix_millis(1_500)),
        end_time: None,
        canceled: false,
        status: ExecutionStatus::Running,
        updated_at: Timestamp::from_unix_millis(updated_at),
        body: json!({ "name": name }),
        stages,
    }
}

/// In-memory primary, replica, oracle, and metrics.
#[derive(Debug, Default, Clone)]
pub struct Fixture {
    /// Primary store.
    pub primary: InMemoryExecutionStore,
    /// Replica store.
    pub replica: InMemoryExecutionStore,
    /// Replication lag oracle.
    pub oracle: InMemoryReplicationLagOracle,
    /// Metrics sink.
    pub metrics: InMemoryRetrieveMetrics,
}

impl Fixture {
    /// Creates an empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the scenario pipeline: primary at 10000, replica at `replica_at`.
    pub fn seed_pipeline(&self, replica_at: i64) {
        self.primary.insert(pipeline(PIPELINE_ID, PRIMARY_NAME, 10_000, Vec::new())).unwrap();
        self.replica.insert(pipeline(PIPELINE_ID, REPLICA_NAME, replica_at, Vec::new())).unwrap();
    }

    /// Seeds a pipeline with one stage per replica `updated_at` value.
    pub fn seed_pipeline_with_stages(&self, replica_stage_updates: &[i64]) {
        let stage_ids: Vec<String> =
            (0 .. replica_stage_updates.len()).map(|index| format!("stage-{index}")).collect();
        let primary_stages = stage_ids
            .iter()
            .map(|stage_id| stage(PIPELINE_ID, stage_id, 10_000, "primary"))
            .collect();
        let replica_stages = stage_ids
            .iter()
            .zip(replica_stage_updates)
            .map(|(stage_id, updated_at)| stage(PIPELINE_ID, stage_id, *updated_at, "replica"))
            .collect();
        self.primary.insert(pipeline(PIPELINE_ID, PRIMARY_NAME, 10_000, primary_stages)).unwrap();
        self.replica.insert(pipeline(PIPELINE_ID, REPLICA_NAME, 5_000, replica_stages)).unwrap();
    }

    /// Sets the oracle's expected execution update and stage count.
    pub fn expect_pipeline(&self, expected: i64, stage_count: usize) {
        self.oracle
            .put_pipeline_update(pipeline_id(), Timestamp::from_unix_millis(expected))
            .unwrap();
        self.oracle.put_stage_count(pipeline_id(), stage_count).unwrap();
    }

    /// Sets the oracle's expected update for one stage.
    pub fn expect_stage(&self, stage_id: &str, expected: i64) {
        self.oracle
            .put_stage_update(StageId::new(stage_id), Timestamp::from_unix_millis(expected))
            .unwrap();
    }

    /// Builds a router over this fixture.
    pub fn router(&self, config: RouterConfig) -> MemoryRouter {
        ConsistencyRouter::new(
            self.primary.clone(),
            Some(self.replica.clone()),
            Some(self.oracle.clone()),
            self.metrics.clone(),
            config,
        )
    }

    /// Returns (total attempts, succeeded, failed) counter totals.
    pub fn counters(&self) -> (u64, u64, u64) {
        (
            self.metrics.total_attempts(),
            self.metrics.succeeded_total(),
            self.metrics.failed_total(),
        )
    }
}

/// Store whose every read fails with a driver error.
#[derive(Debug, Clone)]
pub struct FailingStore {
    /// Error returned from every read.
    pub error: StoreError,
    /// Number of reads attempted.
    pub loads: Arc<AtomicUsize>,
}

impl FailingStore {
    /// Creates a store failing with `error`.
    pub fn new(error: StoreError) -> Self {
        Self {
            error,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ExecutionStore for FailingStore {
    fn load_aggregate(
        &self,
        _kind: ExecutionKind,
        _id: &ExecutionId,
        _ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Store that counts reads and delegates to an in-memory store.
#[derive(Debug, Clone, Default)]
pub struct CountingStore {
    /// Backing store.
    pub inner: InMemoryExecutionStore,
    /// Number of reads served.
    pub loads: Arc<AtomicUsize>,
}

impl CountingStore {
    /// Returns the number of reads served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ExecutionStore for CountingStore {
    fn load_aggregate(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_aggregate(kind, id, ctx)
    }
}

/// Store that returns scripted answers in order, repeating the last one.
#[derive(Debug, Clone, Default)]
pub struct ScriptedStore {
    /// Remaining answers.
    answers: Arc<Mutex<VecDeque<Option<Execution>>>>,
}

impl ScriptedStore {
    /// Creates a store answering with `answers` in order.
    pub fn new(answers: Vec<Option<Execution>>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into())),
        }
    }
}

impl ExecutionStore for ScriptedStore {
    fn load_aggregate(
        &self,
        _kind: ExecutionKind,
        _id: &ExecutionId,
        _ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError> {
        let mut answers = self.answers.lock().unwrap();
        if answers.len() > 1 {
            Ok(answers.pop_front().flatten())
        } else {
            Ok(answers.front().cloned().flatten())
        }
    }
}

/// Oracle whose every query fails.
#[derive(Debug, Clone)]
pub struct FailingOracle;

impl ReplicationLagOracle for FailingOracle {
    fn expected_pipeline_update(
        &self,
        _id: &ExecutionId,
        _ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError> {
        Err(OracleError::Unavailable("lag table unreachable".to_string()))
    }

    fn expected_stage_update(
        &self,
        _id: &StageId,
        _ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError> {
        Err(OracleError::Unavailable("lag table unreachable".to_string()))
    }

    fn expected_stage_count(
        &self,
        _id: &ExecutionId,
        _ctx: &ReadContext,
    ) -> Result<Option<usize>, OracleError> {
        Err(OracleError::Unavailable("lag table unreachable".to_string()))
    }
}

/// Returns the `source` marker recorded in a stage body.
pub fn stage_source(stage: &StageExecution) -> &str {
    stage.body.get("source").and_then(|value| value.as_str()).unwrap_or("unknown")
}
