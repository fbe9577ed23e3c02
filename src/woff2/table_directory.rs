//! The WOFF2 table directory

use four_cc::FourCC;
use thiserror::Error;

use crate::{
    buffer_util::{Base128Error, BoundedReader, BufExt, SafeBuf, TruncatedError},
    magic_numbers::{GLYF_TAG, KNOWN_TABLE_TAGS, LOCA_TAG},
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableDirectoryError {
    #[error("table directory ends early")]
    Truncated,
    #[error(transparent)]
    Base128(#[from] Base128Error),
    #[error("transformed `loca` declares {0} bytes of table data")]
    TransformedLocaNotEmpty(u32),
    #[error("table data is longer than 4 GiB")]
    SourceOffsetOverflow,
}

impl From<TruncatedError> for TableDirectoryError {
    fn from(_: TruncatedError) -> Self {
        Self::Truncated
    }
}

/// Entries of the table directory, with their positions in the decompressed stream resolved.
pub struct Woff2TableDirectory {
    pub tables: Vec<TableDirectoryEntry>,
    /// Sum of all `src_length`s; the exact size the Brotli stream must inflate to
    pub uncompressed_length: u32,
}

impl Woff2TableDirectory {
    pub fn from_buf(
        buffer: &mut BoundedReader<'_>,
        num_tables: u16,
    ) -> Result<Self, TableDirectoryError> {
        let mut tables: Vec<TableDirectoryEntry> = Vec::with_capacity(usize::from(num_tables));
        let mut uncompressed_length = 0u32;
        for _ in 0..num_tables {
            let table = TableDirectoryEntry::read(buffer, uncompressed_length)?;
            uncompressed_length = uncompressed_length
                .checked_add(table.src_length)
                .ok_or(TableDirectoryError::SourceOffsetOverflow)?;
            tables.push(table);
        }
        Ok(Self {
            tables,
            uncompressed_length,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableDirectoryEntry {
    pub tag: FourCC,
    /// Whether the stored bytes are a transformed encoding of the table
    pub transformed: bool,
    /// Top two bits of the flags byte
    pub transform_version: u8,
    /// Length of the table once decoded
    pub dest_length: u32,
    /// Length of the stored bytes in the decompressed stream
    pub src_length: u32,
    pub src_offset: u32,
}

impl TableDirectoryEntry {
    /// Reads one entry whose stored bytes start at `src_offset` in the decompressed stream.
    fn read(buffer: &mut BoundedReader<'_>, src_offset: u32) -> Result<Self, TableDirectoryError> {
        let flags = buffer.try_get_u8()?;
        let tag = match flags & 0x3f {
            0x3f => buffer.try_get_four_cc()?,
            known => KNOWN_TABLE_TAGS[usize::from(known)],
        };
        let transform_version = flags >> 6;
        let dest_length = buffer.try_get_base_128()?;

        // version 3 is the null transform for glyf/loca, version 0 for everything else
        let transformed = match tag {
            GLYF_TAG | LOCA_TAG => transform_version == 0,
            _ => transform_version != 0,
        };
        let src_length = if transformed {
            let length = buffer.try_get_base_128()?;
            if tag == LOCA_TAG && length != 0 {
                return Err(TableDirectoryError::TransformedLocaNotEmpty(length));
            }
            length
        } else {
            dest_length
        };

        Ok(Self {
            tag,
            transformed,
            transform_version,
            dest_length,
            src_length,
            src_offset,
        })
    }

    /// Where the stored bytes sit in the decompressed stream
    pub fn get_source_range(&self) -> std::ops::Range<usize> {
        let start = self.src_offset as usize;
        start..start + self.src_length as usize
    }
}
