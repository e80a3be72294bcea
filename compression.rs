//! Zlib compression applied to packed payloads before encryption.
//!
//! Compression runs at the best level so the most file fits into a carrier.
//! The stream format is zlib (deflate with a 2-byte header and Adler-32
//! trailer), which makes truncation and header corruption detectable.

use crate::error::StegoError;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Minimum output buffer growth while inflating
const INFLATE_CHUNK: usize = 4 * 1024;

/// Compresses `data` with zlib at the maximum level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, StegoError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::best());
    encoder
        .write_all(data)
        .map_err(|e| StegoError::compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| StegoError::compression(e.to_string()))
}

/// Inflates a zlib stream produced by [`compress`].
///
/// Fails unless the whole stream, trailer included, is present and valid.
pub fn decompress(compressed: &[u8]) -> Result<Vec<u8>, StegoError> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(3).max(INFLATE_CHUNK));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(INFLATE_CHUNK));
        }

        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| StegoError::decompression(format!("data may be corrupted: {}", e)))?;

        if status == Status::StreamEnd {
            return Ok(out);
        }

        let input_exhausted = inflater.total_in() as usize == compressed.len();
        let output_has_room = out.len() < out.capacity();
        let stalled = inflater.total_in() as usize == consumed && out.len() == produced;
        if (input_exhausted && output_has_room) || (stalled && output_has_room) {
            return Err(StegoError::decompression("data may be corrupted: stream is truncated"));
        }
    }
}

/// Compressed size divided by input size. Only used for capacity pre-checks.
pub fn estimate_ratio(data: &[u8]) -> Result<f64, StegoError> {
    if data.is_empty() {
        return Ok(1.0);
    }
    let compressed = compress(data)?;
    Ok(compressed.len() as f64 / data.len() as f64)
}
