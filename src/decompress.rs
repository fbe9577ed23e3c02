//! Brotli decompression of the table data and metadata streams

use brotli::{BrotliDecompressStream, BrotliResult, BrotliState, HeapAlloc, HuffmanCode};
use log::trace;
use thiserror::Error;

/// Real fonts compress by a factor of around 20 at most; anything past this suggests a forged
/// uncompressed size.
pub const MAX_PLAUSIBLE_COMPRESSION_RATIO: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrotliError {
    #[error("Empty compressed stream")]
    EmptyStream,
    #[error("Declared uncompressed size is zero")]
    EmptyOutput,
    #[error("Implausible compression ratio: {uncompressed} bytes from {compressed}")]
    ImplausibleRatio { compressed: usize, uncompressed: usize },
    #[error("Corrupt Brotli stream")]
    Corrupt,
    #[error("Brotli stream ends before its last meta-block")]
    Truncated,
    /// `actual` stops counting one byte past `expected`.
    #[error("Decompressed to {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("{0} bytes left over after the end of the Brotli stream")]
    TrailingData(usize),
}

/// Decompresses `compressed`, which must decode to exactly `expected_size` bytes and contain
/// nothing after the end of the Brotli stream.
pub fn decompress(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>, BrotliError> {
    if compressed.is_empty() {
        return Err(BrotliError::EmptyStream);
    }
    if expected_size == 0 {
        return Err(BrotliError::EmptyOutput);
    }
    if expected_size / compressed.len() > MAX_PLAUSIBLE_COMPRESSION_RATIO {
        return Err(BrotliError::ImplausibleRatio {
            compressed: compressed.len(),
            uncompressed: expected_size,
        });
    }

    let mut state = BrotliState::new(
        HeapAlloc::<u8>::default(),
        HeapAlloc::<u32>::default(),
        HeapAlloc::<HuffmanCode>::default(),
    );
    // one byte of slack so that overlong output shows up as a size mismatch
    let mut output = vec![0u8; expected_size + 1];
    let mut available_in = compressed.len();
    let mut input_offset = 0;
    let mut available_out = output.len();
    let mut output_offset = 0;
    let mut total_out = 0;
    let result = BrotliDecompressStream(
        &mut available_in,
        &mut input_offset,
        compressed,
        &mut available_out,
        &mut output_offset,
        &mut output,
        &mut total_out,
        &mut state,
    );
    match result {
        BrotliResult::ResultSuccess | BrotliResult::NeedsMoreOutput => {}
        BrotliResult::NeedsMoreInput => return Err(BrotliError::Truncated),
        BrotliResult::ResultFailure => return Err(BrotliError::Corrupt),
    }
    if output_offset != expected_size {
        return Err(BrotliError::SizeMismatch {
            expected: expected_size,
            actual: output_offset,
        });
    }
    // the whole input was offered at once, so whatever is left follows the end of the stream
    if available_in != 0 {
        return Err(BrotliError::TrailingData(available_in));
    }
    output.truncate(expected_size);
    trace!(
        "decompressed {} bytes into {}",
        compressed.len(),
        output.len()
    );
    Ok(output)
}
