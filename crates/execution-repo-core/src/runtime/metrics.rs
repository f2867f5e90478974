// crates/execution-repo-core/src/runtime/metrics.rs
// ============================================================================
// Module: Retrieve Metrics
// Description: Counter contract for consistent reads and an in-memory sink.
// Purpose: Distinguish fresh reads, stale fallbacks, infrastructure failures, and misses.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Consistent reads emit three counters whose names and tag keys are a
//! stable contract for dashboards and alerts. [`RetrieveMetrics`] is the sink
//! the router writes to; deployments adapt it to their metrics backend.
//! [`InMemoryRetrieveMetrics`] keeps lock-free atomic counters for tests and
//! local tooling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Counter incremented when a consistent read is served by the replica.
pub const RETRIEVE_SUCCEEDED: &str = "executionRepository.sql.readPool.retrieveSucceeded";
/// Counter incremented when a consistent read could not be served by the replica.
pub const RETRIEVE_FAILED: &str = "executionRepository.sql.readPool.retrieveFailed";
/// Counter incremented once per consistent read.
pub const RETRIEVE_TOTAL_ATTEMPTS: &str = "executionRepository.sql.readPool.retrieveTotalAttempts";
/// Tag key carrying the number of replica checks on [`RETRIEVE_SUCCEEDED`].
pub const NUM_ATTEMPTS_TAG: &str = "numAttempts";
/// Tag key carrying the [`ResultCode`] on [`RETRIEVE_FAILED`].
pub const RESULT_CODE_TAG: &str = "result_code";

/// Number of [`ResultCode`] variants.
const RESULT_CODE_COUNT: usize = 5;

/// Result classification of a replica check.
///
/// # Invariants
/// - Labels are stable for telemetry tagging.
/// - [`ResultCode::Failure`] is the only infrastructure code; all others
///   describe data state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// Replica copy was fresh.
    Success,
    /// Replica had no copy.
    NotFound,
    /// Replica copy was older than expected.
    InvalidVersion,
    /// Oracle had no bookkeeping for the execution or one of its stages.
    MissingFromReplicationLagRepository,
    /// A store or oracle call failed.
    Failure,
}

impl ResultCode {
    /// Every result code, in label order.
    pub const ALL: [Self; RESULT_CODE_COUNT] = [
        Self::Success,
        Self::NotFound,
        Self::InvalidVersion,
        Self::MissingFromReplicationLagRepository,
        Self::Failure,
    ];

    /// Returns the stable tag value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::InvalidVersion => "invalid_version",
            Self::MissingFromReplicationLagRepository => "missing_from_replication_lag_repository",
            Self::Failure => "failure",
        }
    }

    /// Returns true when another replica check may succeed after a wait.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NotFound | Self::InvalidVersion)
    }

    /// Position of this code in [`ResultCode::ALL`].
    const fn index(self) -> usize {
        match self {
            Self::Success => 0,
            Self::NotFound => 1,
            Self::InvalidVersion => 2,
            Self::MissingFromReplicationLagRepository => 3,
            Self::Failure => 4,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Counter sink for consistent reads.
pub trait RetrieveMetrics: Send + Sync {
    /// Increments [`RETRIEVE_TOTAL_ATTEMPTS`].
    fn record_total_attempt(&self);

    /// Increments [`RETRIEVE_SUCCEEDED`] tagged with `num_attempts`.
    fn record_succeeded(&self, num_attempts: u32);

    /// Increments [`RETRIEVE_FAILED`] tagged with `result_code`.
    fn record_failed(&self, result_code: ResultCode);
}

/// No-op metrics sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRetrieveMetrics;

impl RetrieveMetrics for NoopRetrieveMetrics {
    fn record_total_attempt(&self) {}

    fn record_succeeded(&self, _num_attempts: u32) {}

    fn record_failed(&self, _result_code: ResultCode) {}
}

// ============================================================================
// SECTION: In-Memory Sink
// ============================================================================

/// Number of distinct `numAttempts` tag values tracked; larger values share
/// the last slot.
pub const MAX_TRACKED_ATTEMPTS: usize = 16;

/// Atomic counter storage shared by clones of [`InMemoryRetrieveMetrics`].
#[derive(Debug)]
struct RetrieveCounters {
    /// Total consistent reads.
    total_attempts: AtomicU64,
    /// Successes indexed by `numAttempts - 1`.
    succeeded: [AtomicU64; MAX_TRACKED_ATTEMPTS],
    /// Failures indexed by [`ResultCode::index`].
    failed: [AtomicU64; RESULT_CODE_COUNT],
}

impl Default for RetrieveCounters {
    fn default() -> Self {
        Self {
            total_attempts: AtomicU64::new(0),
            succeeded: [const { AtomicU64::new(0) }; MAX_TRACKED_ATTEMPTS],
            failed: [const { AtomicU64::new(0) }; ResultCode::ALL.len()],
        }
    }
}

/// In-memory metrics sink backed by atomic counters.
///
/// Clones share the same counters.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRetrieveMetrics {
    /// Shared counters.
    counters: Arc<RetrieveCounters>,
}

impl InMemoryRetrieveMetrics {
    /// Creates a sink with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the [`RETRIEVE_TOTAL_ATTEMPTS`] count.
    #[must_use]
    pub fn total_attempts(&self) -> u64 {
        self.counters.total_attempts.load(Ordering::Relaxed)
    }

    /// Returns the [`RETRIEVE_SUCCEEDED`] count for one `numAttempts` value.
    #[must_use]
    pub fn succeeded(&self, num_attempts: u32) -> u64 {
        if num_attempts == 0 {
            return 0;
        }
        self.counters.succeeded[attempt_slot(num_attempts)].load(Ordering::Relaxed)
    }

    /// Returns the [`RETRIEVE_SUCCEEDED`] count across all tag values.
    #[must_use]
    pub fn succeeded_total(&self) -> u64 {
        sum(&self.counters.succeeded)
    }

    /// Returns the [`RETRIEVE_FAILED`] count for one result code.
    #[must_use]
    pub fn failed(&self, result_code: ResultCode) -> u64 {
        self.counters.failed[result_code.index()].load(Ordering::Relaxed)
    }

    /// Returns the [`RETRIEVE_FAILED`] count across all tag values.
    #[must_use]
    pub fn failed_total(&self) -> u64 {
        sum(&self.counters.failed)
    }

    /// Returns every non-zero counter as a tagged sample.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut samples = Vec::new();
        let total = self.total_attempts();
        if total > 0 {
            samples.push(CounterSample {
                name: RETRIEVE_TOTAL_ATTEMPTS,
                tags: BTreeMap::new(),
                count: total,
            });
        }
        for (slot, counter) in self.counters.succeeded.iter().enumerate() {
            let count = counter.load(Ordering::Relaxed);
            if count > 0 {
                samples.push(CounterSample {
                    name: RETRIEVE_SUCCEEDED,
                    tags: BTreeMap::from([(NUM_ATTEMPTS_TAG.to_string(), (slot + 1).to_string())]),
                    count,
                });
            }
        }
        for code in ResultCode::ALL {
            let count = self.failed(code);
            if count > 0 {
                samples.push(CounterSample {
                    name: RETRIEVE_FAILED,
                    tags: BTreeMap::from([(
                        RESULT_CODE_TAG.to_string(),
                        code.as_str().to_string(),
                    )]),
                    count,
                });
            }
        }
        MetricsSnapshot {
            samples,
        }
    }
}

impl RetrieveMetrics for InMemoryRetrieveMetrics {
    fn record_total_attempt(&self) {
        self.counters.total_attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_succeeded(&self, num_attempts: u32) {
        self.counters.succeeded[attempt_slot(num_attempts)].fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self, result_code: ResultCode) {
        self.counters.failed[result_code.index()].fetch_add(1, Ordering::Relaxed);
    }
}

/// One counter value with its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    /// Counter name.
    pub name: &'static str,
    /// Tag key/value pairs.
    pub tags: BTreeMap<String, String>,
    /// Current count.
    pub count: u64,
}

/// Point-in-time view of every non-zero counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Counter samples.
    pub samples: Vec<CounterSample>,
}

impl MetricsSnapshot {
    /// Returns the count for a counter name and exact tag set.
    #[must_use]
    pub fn count(&self, name: &str, tags: &[(&str, &str)]) -> u64 {
        self.samples
            .iter()
            .filter(|sample| sample.name == name && sample.tags.len() == tags.len())
            .filter(|sample| {
                tags.iter().all(|(key, value)| {
                    sample.tags.get(*key).is_some_and(|stored| stored.as_str() == *value)
                })
            })
            .map(|sample| sample.count)
            .sum()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a `numAttempts` value onto its counter slot.
fn attempt_slot(num_attempts: u32) -> usize {
    let attempts = usize::try_from(num_attempts).unwrap_or(MAX_TRACKED_ATTEMPTS);
    attempts.clamp(1, MAX_TRACKED_ATTEMPTS) - 1
}

/// Sums a counter array.
fn sum(counters: &[AtomicU64]) -> u64 {
    counters.iter().fold(0_u64, |acc, counter| acc.saturating_add(counter.load(Ordering::Relaxed)))
}
