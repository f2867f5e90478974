// crates/execution-repo-sqlite/src/lib.rs
// ============================================================================
// Module: Execution Repository SQLite Library
// Description: SQLite-backed execution stores and body codec.
// Purpose: Serve primary and replica reads for the consistency router.
// Dependencies: execution-repo-core, flate2, rusqlite, zstd
// ============================================================================

//! ## Overview
//! One [`SqliteExecutionStore`] wraps one physical database. The primary and
//! the replica are two read-only instances with different configurations.
//! Stored bodies are JSON, either inline in the entity row or compressed in
//! a side table, and are decoded by [`JsonBodyCodec`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::CompressionType;
pub use codec::DEFAULT_COMPRESSION_LEVEL;
pub use codec::JsonBodyCodec;
pub use codec::MAX_BODY_BYTES;
pub use codec::compress_body;
pub use store::SqliteExecutionStore;
pub use store::SqliteExecutionStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
