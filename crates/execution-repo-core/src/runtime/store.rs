// crates/execution-repo-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Execution Store
// Description: Simple in-memory execution store for tests and local tooling.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`ExecutionStore`].
//! Aggregates are stored with their effective `updated_at` values already
//! resolved, so no body-source policy applies. It is not intended for
//! production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::Execution;
use crate::core::ExecutionId;
use crate::core::ExecutionKind;
use crate::interfaces::ExecutionStore;
use crate::interfaces::ReadContext;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory execution store for tests and local tooling.
///
/// Clones share the same underlying map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryExecutionStore {
    /// Aggregates keyed by kind and id.
    executions: Arc<Mutex<BTreeMap<(ExecutionKind, ExecutionId), Execution>>>,
}

impl InMemoryExecutionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the store mutex is poisoned.
    pub fn insert(&self, execution: Execution) -> Result<(), StoreError> {
        let key = (execution.kind, execution.id.clone());
        self.executions
            .lock()
            .map_err(|_| StoreError::Io("execution store mutex poisoned".to_string()))?
            .insert(key, execution);
        Ok(())
    }

    /// Removes an aggregate, returning it when present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the store mutex is poisoned.
    pub fn remove(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
    ) -> Result<Option<Execution>, StoreError> {
        let mut guard = self
            .executions
            .lock()
            .map_err(|_| StoreError::Io("execution store mutex poisoned".to_string()))?;
        Ok(guard.remove(&(kind, id.clone())))
    }

    /// Returns the number of stored aggregates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.lock().map_or(0, |guard| guard.len())
    }

    /// Returns true when no aggregates are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn load_aggregate(
        &self,
        kind: ExecutionKind,
        id: &ExecutionId,
        ctx: &ReadContext,
    ) -> Result<Option<Execution>, StoreError> {
        ctx.ensure_active()?;
        let guard = self
            .executions
            .lock()
            .map_err(|_| StoreError::Io("execution store mutex poisoned".to_string()))?;
        Ok(guard.get(&(kind, id.clone())).cloned())
    }
}
