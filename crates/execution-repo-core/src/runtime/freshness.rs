// crates/execution-repo-core/src/runtime/freshness.rs
// ============================================================================
// Module: Freshness Rules
// Description: Per-entity freshness comparison and body-source selection.
// Purpose: Keep pipeline- and stage-level checks on identical logic.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! A stored entity is fresh when its effective `updated_at` is at or after
//! the instant the oracle expects. Which `updated_at` is effective depends on
//! where the body was read from: a row whose body lives in the compressed
//! table is only as fresh as the older of its two copies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::Timestamp;

// ============================================================================
// SECTION: Freshness Rule
// ============================================================================

/// Returns true when `actual` satisfies the `expected` instant.
///
/// Equality counts as fresh.
#[must_use]
pub fn is_fresh(expected: Timestamp, actual: Timestamp) -> bool {
    expected <= actual
}

// ============================================================================
// SECTION: Body Source Policy
// ============================================================================

/// Whether compressed bodies are read at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionState {
    /// Only raw body columns are read.
    #[default]
    Disabled,
    /// Compressed-body tables are consulted when the raw body is empty.
    Enabled,
}

impl CompressionState {
    /// Builds the state from a boolean flag.
    #[must_use]
    pub const fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }

    /// Returns true when compressed bodies are read.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Physical location a body was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    /// Raw body column on the entity row.
    Raw,
    /// Compressed-body table row.
    Compressed,
}

/// Version columns read for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowVersion {
    /// `updated_at` of the entity row.
    pub updated_at: Timestamp,
    /// `updated_at` of the compressed-body row, when one exists.
    pub compressed_updated_at: Option<Timestamp>,
    /// Whether the raw body column is empty.
    pub raw_body_empty: bool,
}

/// Selects the body source and effective `updated_at` for stored rows.
///
/// # Invariants
/// - Selection depends only on the compression state and the row itself.
/// - When the compressed source is selected, the effective `updated_at` is
///   the older of the row and compressed-row instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BodySourcePolicy {
    /// Compression state applied to every row.
    state: CompressionState,
}

impl BodySourcePolicy {
    /// Creates a policy for the given compression state.
    #[must_use]
    pub const fn new(state: CompressionState) -> Self {
        Self {
            state,
        }
    }

    /// Returns the compression state this policy applies.
    #[must_use]
    pub const fn state(&self) -> CompressionState {
        self.state
    }

    /// Returns where the row's body should be read from.
    #[must_use]
    pub const fn select(&self, row: &RowVersion) -> BodySource {
        if self.state.is_enabled() && row.raw_body_empty && row.compressed_updated_at.is_some() {
            BodySource::Compressed
        } else {
            BodySource::Raw
        }
    }

    /// Returns the `updated_at` freshness is judged against.
    #[must_use]
    pub fn effective_updated_at(&self, row: &RowVersion) -> Timestamp {
        match (self.select(row), row.compressed_updated_at) {
            (BodySource::Compressed, Some(compressed)) => row.updated_at.min(compressed),
            _ => row.updated_at,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
