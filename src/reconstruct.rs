//! Copying and reconstructing each font's tables into the output

use four_cc::FourCC;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    buffer_util::{BoundedReader, SafeBuf},
    checksum::{
        calculate_checksum, checksum_adjustment, set_checksum_adjustment, ChecksumError,
        ChecksumTable, TableMetadata, CHECKSUM_ADJUSTMENT_OFFSET,
    },
    decode::DecodeError,
    glyf_decoder::reconstruct_glyf,
    hmtx_decoder::reconstruct_hmtx,
    magic_numbers::{GLYF_TAG, HEAD_TAG, HHEA_TAG, HMTX_TAG, LOCA_TAG},
    output::OutputBuffer,
    ttf_header::{output_offset, OutputFont},
    woff2::table_directory::TableDirectoryEntry,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteTablesError {
    #[error("glyf and loca tables must be present together and have the same transformation")]
    GlyfLocaMismatch,
    #[error("loca table not preceded by a reconstructed glyf table")]
    MissingGlyfTable,
    #[error("Table {0:?} reused by the first font")]
    ReusedInFirstFont(FourCC),
    #[error("Table {0:?} lies outside the decompressed data")]
    TableOutOfBounds(FourCC),
    #[error("No table record for {0:?}")]
    MissingTableRecord(FourCC),
    #[error("Truncated `head` table")]
    TruncatedHeadTable,
    #[error("Truncated `hhea` table")]
    TruncatedHheaTable,
    #[error("Unknown transformation of table {0:?}")]
    UnknownTransform(FourCC),
}

impl From<ChecksumError> for WriteTablesError {
    fn from(e: ChecksumError) -> WriteTablesError {
        match e {
            ChecksumError::Truncated => WriteTablesError::TruncatedHeadTable,
        }
    }
}

/// Offset of `numberOfHMetrics` within the `hhea` table.
const NUM_HMETRICS_OFFSET: usize = 34;

fn read_num_hmetrics(hhea_table: &[u8]) -> Result<u16, WriteTablesError> {
    let mut buffer = BoundedReader::from_slice(hhea_table);
    buffer
        .skip(NUM_HMETRICS_OFFSET)
        .and_then(|_| buffer.try_get_u16())
        .map_err(|_| WriteTablesError::TruncatedHheaTable)
}

/// Appends the table unchanged, clearing `checkSumAdjustment` if it is the `head` table.
fn copy_table(
    tag: FourCC,
    source: &[u8],
    out: &mut OutputBuffer,
) -> Result<TableMetadata, DecodeError> {
    let dst_offset = out.len();
    out.put_slice(source)?;
    let written = out.written_mut(dst_offset..dst_offset + source.len())?;
    if tag == HEAD_TAG {
        set_checksum_adjustment(written, 0).map_err(WriteTablesError::from)?;
    }
    Ok(TableMetadata {
        checksum: calculate_checksum(written),
        dst_offset: output_offset(dst_offset)?,
        dst_length: output_offset(source.len())?,
    })
}

fn find_table<'a>(
    font_tables: &[&'a TableDirectoryEntry],
    tag: FourCC,
) -> Option<&'a TableDirectoryEntry> {
    font_tables.iter().copied().find(|table| table.tag == tag)
}

/// Writes the tables of one font after its table directory, fills in the directory's records,
/// and sets `head.checkSumAdjustment`.
///
/// Tables already written for an earlier font of a collection are not written again; their
/// records point at the existing copy.
pub fn reconstruct_font(
    font_index: usize,
    font: &mut OutputFont,
    tables: &[TableDirectoryEntry],
    decompressed: &[u8],
    checksums: &mut ChecksumTable,
    out: &mut OutputBuffer,
) -> Result<(), DecodeError> {
    let font_tables: Vec<&TableDirectoryEntry> = font
        .table_indices
        .iter()
        .map(|&index| &tables[index as usize])
        .collect();

    let loca_table = find_table(&font_tables, LOCA_TAG);
    match (find_table(&font_tables, GLYF_TAG), loca_table) {
        (Some(glyf), Some(loca)) if glyf.transformed != loca.transformed => {
            return Err(WriteTablesError::GlyfLocaMismatch.into());
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(WriteTablesError::GlyfLocaMismatch.into());
        }
        _ => {}
    }

    let info = &mut font.info;
    let mut font_checksum = font.header_checksum;
    let mut loca_metadata = None;
    let mut head_metadata = None;

    for table in font_tables {
        let reused = checksums.get(table.tag, table.src_offset);
        if font_index == 0 && reused.is_some() {
            return Err(WriteTablesError::ReusedInFirstFont(table.tag).into());
        }
        let source = decompressed
            .get(table.get_source_range())
            .ok_or(WriteTablesError::TableOutOfBounds(table.tag))?;

        if table.tag == HHEA_TAG {
            info.num_hmetrics = read_num_hmetrics(source)?;
        }

        let metadata = match reused {
            Some(metadata) => {
                trace!("font {}: reusing {:?}", font_index, table.tag);
                metadata
            }
            None => {
                let metadata = if !table.transformed {
                    copy_table(table.tag, source, out)?
                } else if table.tag == GLYF_TAG {
                    let loca_length = loca_table
                        .ok_or(WriteTablesError::GlyfLocaMismatch)?
                        .dest_length;
                    let glyf_info = reconstruct_glyf(source, loca_length, out)?;
                    trace!(
                        "font {}: {} glyphs, loca index format {}",
                        font_index,
                        glyf_info.num_glyphs,
                        glyf_info.index_format
                    );
                    info.num_glyphs = glyf_info.num_glyphs;
                    info.x_mins = glyf_info.x_mins;
                    loca_metadata = Some(glyf_info.loca);
                    glyf_info.glyf
                } else if table.tag == LOCA_TAG {
                    loca_metadata
                        .take()
                        .ok_or(WriteTablesError::MissingGlyfTable)?
                } else if table.tag == HMTX_TAG && table.transform_version == 1 {
                    let hmtx =
                        reconstruct_hmtx(source, info.num_glyphs, info.num_hmetrics, &info.x_mins)?;
                    let dst_offset = out.len();
                    out.put_slice(&hmtx)?;
                    TableMetadata {
                        checksum: calculate_checksum(&hmtx),
                        dst_offset: output_offset(dst_offset)?,
                        dst_length: output_offset(hmtx.len())?,
                    }
                } else {
                    return Err(WriteTablesError::UnknownTransform(table.tag).into());
                };
                trace!(
                    "font {}: wrote {:?} at {} ({} bytes)",
                    font_index,
                    table.tag,
                    metadata.dst_offset,
                    metadata.dst_length
                );
                checksums.insert(table.tag, table.src_offset, metadata);
                metadata
            }
        };
        font_checksum = font_checksum.wrapping_add(metadata.checksum);

        let mut record = [0u8; 12];
        record[..4].copy_from_slice(&metadata.checksum.to_be_bytes());
        record[4..8].copy_from_slice(&metadata.dst_offset.to_be_bytes());
        record[8..].copy_from_slice(&metadata.dst_length.to_be_bytes());
        let record_offset = *info
            .table_entry_by_tag
            .get(&table.tag.0)
            .ok_or(WriteTablesError::MissingTableRecord(table.tag))?;
        // the tag is already in place
        out.write_at(record_offset as usize + 4, &record)?;
        font_checksum = font_checksum.wrapping_add(calculate_checksum(&record));

        out.pad_to_four()?;

        if table.tag == HEAD_TAG {
            head_metadata = Some(metadata);
        }
    }

    if let Some(head) = head_metadata {
        if (head.dst_length as usize) < CHECKSUM_ADJUSTMENT_OFFSET + 4 {
            return Err(WriteTablesError::TruncatedHeadTable.into());
        }
        out.write_at(
            head.dst_offset as usize + CHECKSUM_ADJUSTMENT_OFFSET,
            &checksum_adjustment(font_checksum).to_be_bytes(),
        )?;
    }
    debug!(
        "font {}: {} tables, table directory at {}",
        font_index,
        font.table_indices.len(),
        font.dst_offset
    );
    Ok(())
}
