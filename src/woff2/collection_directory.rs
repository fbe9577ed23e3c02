//! The WOFF2 collection directory

use four_cc::FourCC;
use thiserror::Error;

use crate::buffer_util::{BoundedReader, BufExt, SafeBuf, TruncatedError};
use crate::magic_numbers::{GLYF_TAG, LOCA_TAG};
use crate::woff2::table_directory::TableDirectoryEntry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionHeaderError {
    #[error("unsupported collection version {0:#010x}")]
    InvalidCollectionVersion(u32),
    #[error("collection directory ends early")]
    Truncated,
    #[error("collection holds no fonts")]
    NoFonts,
    #[error("collection font has an empty table list")]
    NoTables,
    #[error("collection font refers to table {0}, which is not in the table directory")]
    InvalidTableIndex(u16),
    #[error("collection font lists only one of `glyf` and `loca`")]
    GlyfLocaMismatch,
}

impl From<TruncatedError> for CollectionHeaderError {
    fn from(_: TruncatedError) -> Self {
        Self::Truncated
    }
}

/// TTC header version. Version 2 adds the (always empty) digital signature fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CollectionHeaderVersion {
    V1 = 0x0001_0000,
    V2 = 0x0002_0000,
}

impl TryFrom<u32> for CollectionHeaderVersion {
    type Error = CollectionHeaderError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        [Self::V1, Self::V2]
            .into_iter()
            .find(|version| *version as u32 == value)
            .ok_or(CollectionHeaderError::InvalidCollectionVersion(value))
    }
}

pub struct CollectionHeader {
    pub version: CollectionHeaderVersion,
    pub fonts: Vec<CollectionFontEntry>,
}

impl CollectionHeader {
    /// Reads the collection directory that follows the table directory. Table indices are
    /// resolved against `tables` as they are read.
    pub fn from_buf(
        buf: &mut BoundedReader<'_>,
        tables: &[TableDirectoryEntry],
    ) -> Result<Self, CollectionHeaderError> {
        let version = CollectionHeaderVersion::try_from(buf.try_get_u32()?)?;
        let num_fonts = buf.try_get_255_u16()?;
        if num_fonts == 0 {
            return Err(CollectionHeaderError::NoFonts);
        }
        let mut fonts = Vec::with_capacity(usize::from(num_fonts));
        for _ in 0..num_fonts {
            fonts.push(CollectionFontEntry::from_buf(buf, tables)?);
        }
        Ok(Self { version, fonts })
    }
}

/// One font of a collection
#[derive(Clone, Debug)]
pub struct CollectionFontEntry {
    pub flavor: FourCC,
    /// Positions in the WOFF2 table directory, in the order the font lists them
    pub table_indices: Vec<u16>,
}

impl CollectionFontEntry {
    fn from_buf(
        buf: &mut BoundedReader<'_>,
        tables: &[TableDirectoryEntry],
    ) -> Result<Self, CollectionHeaderError> {
        let num_tables = buf.try_get_255_u16()?;
        if num_tables == 0 {
            return Err(CollectionHeaderError::NoTables);
        }
        let flavor = buf.try_get_four_cc()?;

        let mut table_indices = Vec::with_capacity(usize::from(num_tables));
        let mut glyf_count = 0;
        let mut loca_count = 0;
        for _ in 0..num_tables {
            let index = buf.try_get_255_u16()?;
            match tables.get(usize::from(index)).map(|table| table.tag) {
                None => return Err(CollectionHeaderError::InvalidTableIndex(index)),
                Some(GLYF_TAG) => glyf_count += 1,
                Some(LOCA_TAG) => loca_count += 1,
                Some(_) => {}
            }
            table_indices.push(index);
        }
        if (glyf_count == 0) != (loca_count == 0) {
            return Err(CollectionHeaderError::GlyfLocaMismatch);
        }

        Ok(Self {
            flavor,
            table_indices,
        })
    }
}
