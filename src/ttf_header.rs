//! Writing OpenType table directories and collection headers

use std::collections::HashMap;

use four_cc::FourCC;

use crate::checksum::calculate_checksum;
use crate::magic_numbers::TTF_COLLECTION_FLAVOR;
use crate::output::{OutputBuffer, OutputError};
use crate::woff2::{
    collection_directory::{CollectionFontEntry, CollectionHeaderVersion},
    table_directory::TableDirectoryEntry,
    Woff2File,
};

/// Size of a table record: tag, checksum, offset and length.
pub const TABLE_RECORD_SIZE: usize = 16;

/// Calculates the size of the OpenType table directory
pub fn calculate_header_size(num_tables: usize) -> usize {
    // sfnt_version:   4 bytes
    // num_tables:     2 bytes
    // search_range:   2 bytes
    // entry_selector: 2 bytes
    // range_shift:    2 bytes
    // table_records:  TABLE_RECORD_SIZE * num_tables
    12 + TABLE_RECORD_SIZE * num_tables
}

/// Calculates the size of the collection header (without the fonts' table directories).
pub fn calculate_collection_header_size(
    version: CollectionHeaderVersion,
    num_fonts: usize,
) -> usize {
    // tag, version, num_fonts, then an offset per font
    let size = 12 + 4 * num_fonts;
    match version {
        CollectionHeaderVersion::V1 => size,
        // dsig tag, length and offset
        CollectionHeaderVersion::V2 => size + 12,
    }
}

/// An OpenType offset table (the table directory without its records)
pub struct OffsetTable {
    sfnt_version: FourCC,
    num_tables: u16,
    search_range: u16,
    entry_selector: u16,
    range_shift: u16,
}

impl OffsetTable {
    pub fn new(sfnt_version: FourCC, num_tables: u16) -> Self {
        // floor(log2(num_tables))
        let entry_selector = 15u16.saturating_sub(num_tables.leading_zeros() as u16);
        // (2**entry_selector) * 16, truncated to 16 bits
        let search_range = ((1u32 << (entry_selector + 4)) & 0xFFFF) as u16;
        // num_tables * 16 - search_range
        let range_shift = (num_tables << 4).wrapping_sub(search_range);
        OffsetTable {
            sfnt_version,
            num_tables,
            search_range,
            entry_selector,
            range_shift,
        }
    }

    pub fn write_to_buf(&self, buffer: &mut OutputBuffer) -> Result<(), OutputError> {
        buffer.put_slice(&self.sfnt_version.0)?;
        buffer.put_u16(self.num_tables)?;
        buffer.put_u16(self.search_range)?;
        buffer.put_u16(self.entry_selector)?;
        buffer.put_u16(self.range_shift)?;
        Ok(())
    }
}

/// Per-font state gathered while writing the headers and reconstructing `glyf`, used by later
/// tables of the same font.
#[derive(Debug, Default)]
pub struct FontInfo {
    pub num_glyphs: u16,
    pub num_hmetrics: u16,
    pub x_mins: Vec<i16>,
    /// Output offset of each table's record in the table directory
    pub table_entry_by_tag: HashMap<[u8; 4], u32>,
}

/// A font of the output, with its table directory written but not yet filled in.
#[derive(Debug)]
pub struct OutputFont {
    /// Output offset of the font's table directory
    pub dst_offset: u32,
    /// Checksum of the table directory with zeroed placeholder records
    pub header_checksum: u32,
    /// Indices into the WOFF2 table directory, sorted by tag
    pub table_indices: Vec<u16>,
    pub info: FontInfo,
}

/// Converts an output position to the `u32` used in table records and collection headers.
pub fn output_offset(offset: usize) -> Result<u32, OutputError> {
    u32::try_from(offset).map_err(|_| OutputError::TooLarge(u32::MAX as usize))
}

/// Writes a font's offset table followed by a placeholder record (tag, then zeroed checksum,
/// offset and length) for each of its tables.
fn write_table_directory(
    font: CollectionFontEntry,
    tables: &[TableDirectoryEntry],
    out: &mut OutputBuffer,
) -> Result<OutputFont, OutputError> {
    let mut table_indices = font.table_indices;
    table_indices.sort_by_key(|&index| tables[index as usize].tag.0);

    let dst_offset = out.len();
    let num_tables = table_indices.len() as u16;
    OffsetTable::new(font.flavor, num_tables).write_to_buf(out)?;

    let mut info = FontInfo::default();
    for &index in &table_indices {
        let tag = tables[index as usize].tag;
        info.table_entry_by_tag
            .insert(tag.0, output_offset(out.len())?);
        out.put_slice(&tag.0)?;
        out.put_slice(&[0; 12])?;
    }

    Ok(OutputFont {
        dst_offset: output_offset(dst_offset)?,
        header_checksum: calculate_checksum(&out.as_slice()[dst_offset..]),
        table_indices,
        info,
    })
}

/// Writes the sfnt header, or the collection header followed by every font's table directory,
/// to the start of `out`.
pub fn write_headers(
    file: &Woff2File<'_>,
    out: &mut OutputBuffer,
) -> Result<Vec<OutputFont>, OutputError> {
    let fonts = file.fonts();
    if let Some(collection_header) = &file.collection_header {
        let version = collection_header.version;
        out.put_slice(&TTF_COLLECTION_FLAVOR.0)?;
        out.put_u32(version as u32)?;
        out.put_u32(fonts.len() as u32)?;
        let mut offset = calculate_collection_header_size(version, fonts.len());
        for font in &fonts {
            out.put_u32(output_offset(offset)?)?;
            offset += calculate_header_size(font.table_indices.len());
        }
        if version == CollectionHeaderVersion::V2 {
            // no digital signature
            out.put_u32(0)?;
            out.put_u32(0)?;
            out.put_u32(0)?;
        }
    }
    fonts
        .into_iter()
        .map(|font| write_table_directory(font, &file.tables, out))
        .collect()
}
