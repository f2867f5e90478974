// crates/execution-repo-core/src/runtime/oracle.rs
// ============================================================================
// Module: In-Memory Replication Lag Oracle
// Description: Scriptable oracle backed by write-time bookkeeping maps.
// Purpose: Drive the router deterministically in tests and local tooling.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryReplicationLagOracle`] answers from maps that callers populate
//! directly or through [`ReplicationLagOracle::record_execution`]. Unknown
//! ids answer `None`, which the router treats as missing bookkeeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Execution;
use crate::core::ExecutionId;
use crate::core::StageId;
use crate::core::Timestamp;
use crate::interfaces::OracleError;
use crate::interfaces::ReadContext;
use crate::interfaces::ReplicationLagOracle;

// ============================================================================
// SECTION: Oracle
// ============================================================================

/// Bookkeeping maps shared by clones of the oracle.
#[derive(Debug, Default)]
struct OracleState {
    /// Expected execution updates.
    pipeline_updates: BTreeMap<ExecutionId, Timestamp>,
    /// Expected stage updates.
    stage_updates: BTreeMap<StageId, Timestamp>,
    /// Expected stage counts.
    stage_counts: BTreeMap<ExecutionId, usize>,
}

/// In-memory replication lag oracle.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReplicationLagOracle {
    /// Shared bookkeeping.
    state: Arc<Mutex<OracleState>>,
}

impl InMemoryReplicationLagOracle {
    /// Creates an oracle with no bookkeeping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected execution update.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] when the state mutex is poisoned.
    pub fn put_pipeline_update(
        &self,
        id: ExecutionId,
        expected: Timestamp,
    ) -> Result<(), OracleError> {
        self.with_state(|state| {
            state.pipeline_updates.insert(id, expected);
        })
    }

    /// Sets the expected stage update.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] when the state mutex is poisoned.
    pub fn put_stage_update(&self, id: StageId, expected: Timestamp) -> Result<(), OracleError> {
        self.with_state(|state| {
            state.stage_updates.insert(id, expected);
        })
    }

    /// Sets the expected stage count.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] when the state mutex is poisoned.
    pub fn put_stage_count(&self, id: ExecutionId, count: usize) -> Result<(), OracleError> {
        self.with_state(|state| {
            state.stage_counts.insert(id, count);
        })
    }

    /// Drops all bookkeeping for an execution and its stages.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Unavailable`] when the state mutex is poisoned.
    pub fn forget(&self, id: &ExecutionId, stages: &[StageId]) -> Result<(), OracleError> {
        self.with_state(|state| {
            state.pipeline_updates.remove(id);
            state.stage_counts.remove(id);
            for stage in stages {
                state.stage_updates.remove(stage);
            }
        })
    }

    /// Runs `apply` against the locked state.
    fn with_state<T>(&self, apply: impl FnOnce(&mut OracleState) -> T) -> Result<T, OracleError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| OracleError::Unavailable("oracle mutex poisoned".to_string()))?;
        Ok(apply(&mut guard))
    }
}

impl ReplicationLagOracle for InMemoryReplicationLagOracle {
    fn expected_pipeline_update(
        &self,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError> {
        ctx.ensure_active()?;
        self.with_state(|state| state.pipeline_updates.get(id).copied())
    }

    fn expected_stage_update(
        &self,
        id: &StageId,
        ctx: &ReadContext,
    ) -> Result<Option<Timestamp>, OracleError> {
        ctx.ensure_active()?;
        self.with_state(|state| state.stage_updates.get(id).copied())
    }

    fn expected_stage_count(
        &self,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<usize>, OracleError> {
        ctx.ensure_active()?;
        self.with_state(|state| state.stage_counts.get(id).copied())
    }

    fn record_execution(&self, execution: &Execution) -> Result<(), OracleError> {
        self.with_state(|state| {
            state.pipeline_updates.insert(execution.id.clone(), execution.updated_at);
            state.stage_counts.insert(execution.id.clone(), execution.stages.len());
            for stage in &execution.stages {
                state.stage_updates.insert(stage.id.clone(), stage.updated_at);
            }
        })
    }
}
