// crates/execution-repo-config/src/lib.rs
// ============================================================================
// Module: Execution Repository Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for execution-repo.toml semantics.
// Dependencies: execution-repo-core, execution-repo-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `execution-repo-config` defines the configuration model for the execution
//! repository read path: the primary and replica stores, compressed body
//! handling, replica check tuning, and logging. Loading is strict and fails
//! closed on oversized, non-UTF-8, or inconsistent input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
