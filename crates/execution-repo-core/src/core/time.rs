// crates/execution-repo-core/src/core/time.rs
// ============================================================================
// Module: Execution Time Model
// Description: Write instants recorded on execution and stage rows.
// Purpose: Give freshness comparisons a single totally ordered instant type.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Stores record `updated_at` as unix epoch milliseconds. The router never
//! reads wall-clock time to decide freshness; it only compares instants
//! supplied by stores and the replication lag oracle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Instant of a write, in unix epoch milliseconds.
///
/// # Invariants
/// - Ordering follows the millisecond value; equal values compare equal.
/// - No validation is performed; negative values are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Unix epoch.
    pub const EPOCH: Self = Self(0);

    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
