//! The WOFF2 header

use four_cc::FourCC;
use thiserror::Error;

use crate::buffer_util::{BoundedReader, BufExt, RoundUp4, SafeBuf, TruncatedError};
use crate::magic_numbers::WOFF2_SIGNATURE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Woff2HeaderError {
    #[error("Truncated header")]
    Truncated,
    #[error("Invalid magic word")]
    InvalidMagicWord,
    #[error("Declared length {declared} does not match actual length {actual}")]
    LengthMismatch { declared: u32, actual: usize },
    #[error("No tables in font")]
    NoTables,
    #[error("Metadata block lies outside the file")]
    MetadataOutOfBounds,
    #[error("Private data block lies outside the file")]
    PrivateDataOutOfBounds,
    #[error("Compressed data lies outside the file")]
    CompressedDataOutOfBounds,
    #[error("Excess padding")]
    ExcessPadding,
    #[error("Overlapping streams")]
    OverlappingStreams,
}

impl From<TruncatedError> for Woff2HeaderError {
    fn from(_: TruncatedError) -> Self {
        Woff2HeaderError::Truncated
    }
}

/// Offset of `totalSfntSize` within the header.
pub const TOTAL_SFNT_SIZE_OFFSET: usize = 16;

pub struct Woff2Header {
    pub signature: FourCC,
    pub flavor: FourCC,
    pub length: u32,
    pub num_tables: u16,
    pub total_sfnt_size: u32,
    pub total_compressed_size: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub meta_offset: u32,
    pub meta_length: u32,
    pub meta_orig_length: u32,
    pub private_offset: u32,
    pub private_length: u32,
}

impl Woff2Header {
    pub fn from_buf(buffer: &mut BoundedReader<'_>) -> Result<Self, Woff2HeaderError> {
        let signature = buffer.try_get_four_cc()?;
        let flavor = buffer.try_get_four_cc()?;
        let length = buffer.try_get_u32()?;
        let num_tables = buffer.try_get_u16()?;
        // reserved, not checked
        buffer.skip(2)?;
        Ok(Self {
            signature,
            flavor,
            length,
            num_tables,
            total_sfnt_size: buffer.try_get_u32()?,
            total_compressed_size: buffer.try_get_u32()?,
            major_version: buffer.try_get_u16()?,
            minor_version: buffer.try_get_u16()?,
            meta_offset: buffer.try_get_u32()?,
            meta_length: buffer.try_get_u32()?,
            meta_orig_length: buffer.try_get_u32()?,
            private_offset: buffer.try_get_u32()?,
            private_length: buffer.try_get_u32()?,
        })
    }

    /// Checks the fields that can be validated before the table directory is read.
    pub fn is_valid_header(&self, file_length: usize) -> Result<(), Woff2HeaderError> {
        if self.signature != WOFF2_SIGNATURE {
            return Err(Woff2HeaderError::InvalidMagicWord);
        }
        if self.length as usize != file_length {
            return Err(Woff2HeaderError::LengthMismatch {
                declared: self.length,
                actual: file_length,
            });
        }
        if self.num_tables == 0 {
            return Err(Woff2HeaderError::NoTables);
        }
        if !block_fits(self.meta_offset, self.meta_length, file_length) {
            return Err(Woff2HeaderError::MetadataOutOfBounds);
        }
        if !block_fits(self.private_offset, self.private_length, file_length) {
            return Err(Woff2HeaderError::PrivateDataOutOfBounds);
        }
        Ok(())
    }

    /// Checks that the compressed data, metadata and private data follow each other in that
    /// order, each starting on a four byte boundary, and that nothing but padding follows them.
    pub fn check_layout(
        &self,
        compressed_offset: usize,
        file_length: usize,
    ) -> Result<(), Woff2HeaderError> {
        let compressed_end = compressed_offset as u64 + u64::from(self.total_compressed_size);
        if compressed_end > file_length as u64 {
            return Err(Woff2HeaderError::CompressedDataOutOfBounds);
        }
        let mut end = compressed_end.round_up_4();
        for (offset, length) in [
            (self.meta_offset, self.meta_length),
            (self.private_offset, self.private_length),
        ] {
            if offset == 0 {
                continue;
            }
            if u64::from(offset) != end {
                return Err(Woff2HeaderError::OverlappingStreams);
            }
            end = (u64::from(offset) + u64::from(length)).round_up_4();
        }
        if end != (file_length as u64).round_up_4() {
            return Err(Woff2HeaderError::ExcessPadding);
        }
        Ok(())
    }

    pub fn metadata_range(&self) -> Option<std::ops::Range<usize>> {
        block_range(self.meta_offset, self.meta_length)
    }

    pub fn private_data_range(&self) -> Option<std::ops::Range<usize>> {
        block_range(self.private_offset, self.private_length)
    }
}

fn block_fits(offset: u32, length: u32, file_length: usize) -> bool {
    let offset = offset as usize;
    offset == 0 || (offset < file_length && file_length - offset >= length as usize)
}

fn block_range(offset: u32, length: u32) -> Option<std::ops::Range<usize>> {
    (offset != 0).then(|| offset as usize..(offset as usize).saturating_add(length as usize))
}
