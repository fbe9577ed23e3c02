use std::collections::HashMap;
use std::num::Wrapping;

use bytes::BufMut;
use four_cc::FourCC;
use thiserror::Error;

use crate::magic_numbers::CHECKSUM_MINUEND;

/// Sum of the data read as big-endian `u32`s, wrapping on overflow. A trailing partial word is
/// zero-padded.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    let words = data.chunks_exact(4);
    let mut tail = [0u8; 4];
    tail[..words.remainder().len()].copy_from_slice(words.remainder());
    words
        .map(|word| u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
        .chain(std::iter::once(u32::from_be_bytes(tail)))
        .map(Wrapping)
        .sum::<Wrapping<u32>>()
        .0
}

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("`head` table too short to hold checkSumAdjustment")]
    Truncated,
}

/// Offset of `checksumAdjustment` within the `head` table.
pub const CHECKSUM_ADJUSTMENT_OFFSET: usize = 8;

/// Overwrites `head.checkSumAdjustment`.
pub fn set_checksum_adjustment(head_table: &mut [u8], value: u32) -> Result<(), ChecksumError> {
    let mut field = head_table
        .get_mut(CHECKSUM_ADJUSTMENT_OFFSET..CHECKSUM_ADJUSTMENT_OFFSET + 4)
        .ok_or(ChecksumError::Truncated)?;
    field.put_u32(value);
    Ok(())
}

/// Calculates the value for the `checksum_adjustment` field in the `head` table from the checksum
/// of the whole font (computed with the adjustment field zeroed).
pub fn checksum_adjustment(font_checksum: u32) -> u32 {
    CHECKSUM_MINUEND.wrapping_sub(font_checksum)
}

/// Where a table ended up in the output, and its checksum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableMetadata {
    pub checksum: u32,
    pub dst_offset: u32,
    pub dst_length: u32,
}

/// Tables already written to the output, keyed by tag and offset in the decompressed data.
///
/// Fonts in a collection may share tables; the offset is part of the key because a shared
/// zero-length `loca` and a distinct one can otherwise not be told apart.
#[derive(Debug, Default)]
pub struct ChecksumTable {
    written: HashMap<([u8; 4], u32), TableMetadata>,
}

impl ChecksumTable {
    pub fn get(&self, tag: FourCC, src_offset: u32) -> Option<TableMetadata> {
        self.written.get(&(tag.0, src_offset)).copied()
    }

    pub fn insert(&mut self, tag: FourCC, src_offset: u32, metadata: TableMetadata) {
        self.written.insert((tag.0, src_offset), metadata);
    }
}
