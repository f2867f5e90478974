// crates/execution-repo-sqlite/src/codec.rs
// ============================================================================
// Module: Body Codec
// Description: Raw and compressed JSON body decoding.
// Purpose: Turn stored body columns into JSON documents with bounded memory.
// Dependencies: execution-repo-core, flate2, serde, serde_json, zstd
// ============================================================================

//! ## Overview
//! Bodies are stored either as JSON text in the entity row or as compressed
//! bytes in a side table together with a compression type label (`ZSTD`,
//! `ZLIB` or `GZIP`). Decoding is fail-closed: unknown labels, corrupt
//! streams, and bodies above [`MAX_BODY_BYTES`] are errors rather than
//! partial documents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::io::Write;

use execution_repo_core::BodyCodec;
use execution_repo_core::BodyPayload;
use execution_repo_core::CodecError;
use execution_repo_core::CompressedBody;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::read::ZlibDecoder;
use flate2::write::GzEncoder;
use flate2::write::ZlibEncoder;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use zstd::stream::read::Decoder;
use zstd::stream::write::Encoder;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum decoded body size accepted by the codec.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Compression level used when none is configured.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

// ============================================================================
// SECTION: Compression Type
// ============================================================================

/// Compression algorithm recorded next to a compressed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    /// Zstandard frames.
    #[default]
    #[serde(alias = "ZSTD")]
    Zstd,
    /// Zlib-wrapped deflate streams.
    #[serde(alias = "ZLIB")]
    Zlib,
    /// Gzip members.
    #[serde(alias = "GZIP")]
    Gzip,
}

impl CompressionType {
    /// Returns the label stored in `compression_type` columns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zstd => "ZSTD",
            Self::Zlib => "ZLIB",
            Self::Gzip => "GZIP",
        }
    }

    /// Parses a stored compression type label.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedCompression`] for unknown labels.
    pub fn from_label(label: &str) -> Result<Self, CodecError> {
        [Self::Zstd, Self::Zlib, Self::Gzip]
            .into_iter()
            .find(|candidate| label.eq_ignore_ascii_case(candidate.as_str()))
            .ok_or_else(|| CodecError::UnsupportedCompression(label.to_string()))
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// JSON body codec for raw and compressed bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyCodec;

impl JsonBodyCodec {
    /// Creates a codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BodyCodec for JsonBodyCodec {
    fn decode(
        &self,
        payload: &BodyPayload<'_>,
        compression_enabled: bool,
    ) -> Result<Value, CodecError> {
        if compression_enabled && let Some(compressed) = payload.compressed {
            let bytes = decompress(&compressed)?;
            return serde_json::from_slice(&bytes).map_err(|err| CodecError::Parse(err.to_string()));
        }
        if payload.raw.is_empty() {
            return Err(CodecError::Empty);
        }
        if payload.raw.len() > MAX_BODY_BYTES {
            return Err(CodecError::TooLarge {
                max_bytes: MAX_BODY_BYTES,
                actual_bytes: payload.raw.len(),
            });
        }
        serde_json::from_str(payload.raw).map_err(|err| CodecError::Parse(err.to_string()))
    }
}

/// Decompresses a body, stopping one byte past the size limit.
fn decompress(compressed: &CompressedBody<'_>) -> Result<Vec<u8>, CodecError> {
    let bytes = compressed.bytes;
    match CompressionType::from_label(compressed.compression_type)? {
        CompressionType::Zstd => {
            let decoder =
                Decoder::new(bytes).map_err(|err| CodecError::Decompress(err.to_string()))?;
            read_bounded(decoder)
        }
        CompressionType::Zlib => read_bounded(ZlibDecoder::new(bytes)),
        CompressionType::Gzip => read_bounded(GzDecoder::new(bytes)),
    }
}

/// Reads a decoder to the end, failing once output exceeds [`MAX_BODY_BYTES`].
fn read_bounded(decoder: impl Read) -> Result<Vec<u8>, CodecError> {
    let limit = u64::try_from(MAX_BODY_BYTES).unwrap_or(u64::MAX).saturating_add(1);
    let mut bytes = Vec::new();
    decoder
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| CodecError::Decompress(err.to_string()))?;
    if bytes.len() > MAX_BODY_BYTES {
        return Err(CodecError::TooLarge {
            max_bytes: MAX_BODY_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Compresses a JSON body for storage in a compressed-body table.
///
/// `level` is passed to zstd as is; zlib and gzip clamp it to `0..=9`.
///
/// # Errors
///
/// Returns [`CodecError::Compress`] when the encoder fails.
pub fn compress_body(
    text: &str,
    compression_type: CompressionType,
    level: i32,
) -> Result<Vec<u8>, CodecError> {
    let compress_error = |err: std::io::Error| CodecError::Compress(err.to_string());
    match compression_type {
        CompressionType::Zstd => {
            let mut encoder = Encoder::new(Vec::new(), level).map_err(compress_error)?;
            encoder.write_all(text.as_bytes()).map_err(compress_error)?;
            encoder.finish().map_err(compress_error)
        }
        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), deflate_level(level));
            encoder.write_all(text.as_bytes()).map_err(compress_error)?;
            encoder.finish().map_err(compress_error)
        }
        CompressionType::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), deflate_level(level));
            encoder.write_all(text.as_bytes()).map_err(compress_error)?;
            encoder.finish().map_err(compress_error)
        }
    }
}

/// Maps a compression level onto the deflate range.
fn deflate_level(level: i32) -> Compression {
    Compression::new(u32::try_from(level.clamp(0, 9)).unwrap_or(6))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
