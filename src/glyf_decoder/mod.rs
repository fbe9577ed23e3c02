//! Reconstruction of `glyf` and `loca` from the transformed `glyf` table
//!
//! <https://www.w3.org/TR/WOFF2/#glyf_table_format>

use bitvec::{order::Msb0, slice::BitSlice};
use bytes::BufMut;
use log::trace;
use thiserror::Error;

use crate::buffer_util::{BoundedReader, BufExt, SafeBuf, TruncatedError};
use crate::checksum::{calculate_checksum, TableMetadata};
use crate::output::{OutputBuffer, OutputError};

pub mod simple_glyph;
pub mod x_y_triplet;

use simple_glyph::{store_points, BoundingBox};
use x_y_triplet::decode_triplets;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GlyfDecoderError {
    #[error("Stream truncated")]
    Truncated,
    #[error("Substream extends past the end of the transformed glyf table")]
    SubstreamOutOfBounds,
    #[error("Composite glyph without bbox")]
    CompositeGlyphWithoutBbox,
    #[error("Empty glyph with bbox")]
    EmptyGlyphWithBbox,
    #[error("Invalid number of contours {0}")]
    InvalidContourCount(i16),
    #[error("Glyph has too many points")]
    TooManyPoints,
    #[error("Point coordinate overflow")]
    CoordinateOverflow,
    #[error("loca table is {actual} bytes, expected {expected}")]
    LocaLengthMismatch { expected: u64, actual: u32 },
    #[error("glyf offset does not fit the loca format")]
    OffsetOverflow,
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl From<TruncatedError> for GlyfDecoderError {
    fn from(_: TruncatedError) -> Self {
        GlyfDecoderError::Truncated
    }
}

const FLAG_ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
const FLAG_WE_HAVE_A_SCALE: u16 = 1 << 3;
const FLAG_MORE_COMPONENTS: u16 = 1 << 5;
const FLAG_WE_HAVE_AN_X_AND_Y_SCALE: u16 = 1 << 6;
const FLAG_WE_HAVE_A_TWO_BY_TWO: u16 = 1 << 7;
const FLAG_WE_HAVE_INSTRUCTIONS: u16 = 1 << 8;

/// Option flag indicating the overlap bitmap follows the instruction stream.
const OPTION_OVERLAP_SIMPLE_BITMAP: u16 = 1 << 0;

/// What the rest of the font needs to know about the reconstructed tables.
#[derive(Debug)]
pub struct GlyfInfo {
    pub num_glyphs: u16,
    pub index_format: u16,
    /// `xMin` of each glyph, 0 for empty glyphs
    pub x_mins: Vec<i16>,
    pub glyf: TableMetadata,
    pub loca: TableMetadata,
}

struct Woff2GlyfDecoder<'a> {
    num_glyphs: u16,
    index_format: u16,
    n_contour_stream: BoundedReader<'a>,
    n_points_stream: BoundedReader<'a>,
    flag_stream: BoundedReader<'a>,
    glyph_stream: BoundedReader<'a>,
    composite_stream: BoundedReader<'a>,
    bbox_bitmap: &'a BitSlice<u8, Msb0>,
    bbox_stream: BoundedReader<'a>,
    instruction_stream: BoundedReader<'a>,
    overlap_bitmap: Option<&'a BitSlice<u8, Msb0>>,
}

/// Size of a bitmap with one bit per glyph, padded to a multiple of four bytes.
fn bbox_bitmap_length(num_glyphs: u16) -> usize {
    ((num_glyphs as usize + 31) >> 5) << 2
}

fn substream<'a>(
    table: &mut BoundedReader<'a>,
    length: u32,
) -> Result<BoundedReader<'a>, GlyfDecoderError> {
    let slice = table
        .read_slice(length as usize)
        .map_err(|_| GlyfDecoderError::SubstreamOutOfBounds)?;
    Ok(BoundedReader::from_slice(slice))
}

impl<'a> Woff2GlyfDecoder<'a> {
    fn new(transformed_glyf_table: &'a [u8]) -> Result<Self, GlyfDecoderError> {
        let mut table = BoundedReader::from_slice(transformed_glyf_table);

        let _version = table.try_get_u16()?;
        let option_flags = table.try_get_u16()?;
        let num_glyphs = table.try_get_u16()?;
        let index_format = table.try_get_u16()?;
        let n_contour_stream_size = table.try_get_u32()?;
        let n_points_stream_size = table.try_get_u32()?;
        let flag_stream_size = table.try_get_u32()?;
        let glyph_stream_size = table.try_get_u32()?;
        let composite_stream_size = table.try_get_u32()?;
        let bbox_stream_size = table.try_get_u32()?;
        let instruction_stream_size = table.try_get_u32()?;

        let n_contour_stream = substream(&mut table, n_contour_stream_size)?;
        let n_points_stream = substream(&mut table, n_points_stream_size)?;
        let flag_stream = substream(&mut table, flag_stream_size)?;
        let glyph_stream = substream(&mut table, glyph_stream_size)?;
        let composite_stream = substream(&mut table, composite_stream_size)?;

        // the bbox stream starts with the bitmap of glyphs that have an explicit bbox
        let bbox_bitmap_and_stream = table
            .read_slice(bbox_stream_size as usize)
            .map_err(|_| GlyfDecoderError::SubstreamOutOfBounds)?;
        let bitmap_length = bbox_bitmap_length(num_glyphs);
        if bbox_bitmap_and_stream.len() < bitmap_length {
            return Err(GlyfDecoderError::SubstreamOutOfBounds);
        }
        let (bbox_bitmap, bbox_stream) = bbox_bitmap_and_stream.split_at(bitmap_length);

        let instruction_stream = substream(&mut table, instruction_stream_size)?;

        let overlap_bitmap = if option_flags & OPTION_OVERLAP_SIMPLE_BITMAP != 0 {
            let bitmap = table
                .read_slice((num_glyphs as usize + 7) >> 3)
                .map_err(|_| GlyfDecoderError::SubstreamOutOfBounds)?;
            Some(BitSlice::<_, Msb0>::from_slice(bitmap))
        } else {
            None
        };

        Ok(Self {
            num_glyphs,
            index_format,
            n_contour_stream,
            n_points_stream,
            flag_stream,
            glyph_stream,
            composite_stream,
            bbox_bitmap: BitSlice::<_, Msb0>::from_slice(bbox_bitmap),
            bbox_stream: BoundedReader::from_slice(bbox_stream),
            instruction_stream,
            overlap_bitmap,
        })
    }

    fn has_bbox(&self, glyph_index: u16) -> bool {
        self.bbox_bitmap[glyph_index as usize]
    }

    fn write_simple_glyph(
        &mut self,
        number_of_contours: i16,
        glyph_index: u16,
        out: &mut Vec<u8>,
    ) -> Result<(), GlyfDecoderError> {
        let mut end_points_of_contours = Vec::with_capacity(number_of_contours as usize * 2);
        let mut end_point = -1i32;
        for _ in 0..number_of_contours {
            let number_of_points = self.n_points_stream.try_get_255_u16()?;
            end_point += i32::from(number_of_points);
            if end_point >= 65536 {
                return Err(GlyfDecoderError::TooManyPoints);
            }
            end_points_of_contours.put_u16(end_point as u16);
        }
        let total_points = (end_point + 1) as usize;

        let flags = self.flag_stream.read_slice(total_points)?;
        let points = decode_triplets(flags, &mut self.glyph_stream)?;

        let instruction_length = self.glyph_stream.try_get_255_u16()?;
        let instructions = self
            .instruction_stream
            .read_slice(instruction_length as usize)?;

        let bbox = if self.has_bbox(glyph_index) {
            BoundingBox::from_buf(&mut self.bbox_stream)?
        } else {
            BoundingBox::of_points(&points)
        };

        let overlap_simple = match self.overlap_bitmap {
            Some(bitmap) => bitmap[glyph_index as usize],
            None => false,
        };

        out.put_i16(number_of_contours);
        bbox.write_to_buf(out);
        out.put_slice(&end_points_of_contours);
        out.put_u16(instruction_length);
        out.put_slice(instructions);
        store_points(&points, overlap_simple, out);

        Ok(())
    }

    fn write_composite_glyph(
        &mut self,
        glyph_index: u16,
        out: &mut Vec<u8>,
    ) -> Result<(), GlyfDecoderError> {
        if !self.has_bbox(glyph_index) {
            return Err(GlyfDecoderError::CompositeGlyphWithoutBbox);
        }
        out.put_i16(-1);
        BoundingBox::from_buf(&mut self.bbox_stream)?.write_to_buf(out);

        let mut have_instructions = false;
        loop {
            let flag_word = self.composite_stream.try_get_u16()?;
            let args = if flag_word & FLAG_ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
            let transform = if flag_word & FLAG_WE_HAVE_A_SCALE != 0 {
                2
            } else if flag_word & FLAG_WE_HAVE_AN_X_AND_Y_SCALE != 0 {
                4
            } else if flag_word & FLAG_WE_HAVE_A_TWO_BY_TWO != 0 {
                8
            } else {
                0
            };
            out.put_u16(flag_word);
            // component glyph index precedes the arguments
            self.composite_stream.try_copy_to_buf(out, 2 + args + transform)?;

            have_instructions |= flag_word & FLAG_WE_HAVE_INSTRUCTIONS != 0;
            if flag_word & FLAG_MORE_COMPONENTS == 0 {
                break;
            }
        }

        if have_instructions {
            let length = self.glyph_stream.try_get_255_u16()?;
            out.put_u16(length);
            self.instruction_stream
                .try_copy_to_buf(out, usize::from(length))?;
        }

        Ok(())
    }

    fn write_next_glyph(
        &mut self,
        glyph_index: u16,
        out: &mut Vec<u8>,
    ) -> Result<(), GlyfDecoderError> {
        let number_of_contours = self.n_contour_stream.try_get_i16()?;
        match number_of_contours {
            0 if self.has_bbox(glyph_index) => Err(GlyfDecoderError::EmptyGlyphWithBbox),
            0 => Ok(()),
            -1 => self.write_composite_glyph(glyph_index, out),
            num if num > 0 => self.write_simple_glyph(num, glyph_index, out),
            num => Err(GlyfDecoderError::InvalidContourCount(num)),
        }
    }

    fn loca_entry_size(&self) -> u64 {
        if self.index_format != 0 {
            4
        } else {
            2
        }
    }
}

fn table_offset(offset: usize) -> Result<u32, GlyfDecoderError> {
    u32::try_from(offset).map_err(|_| GlyfDecoderError::OffsetOverflow)
}

fn serialize_loca(loca_values: &[u32], index_format: u16) -> Result<Vec<u8>, GlyfDecoderError> {
    let mut loca = Vec::with_capacity(loca_values.len() * 4);
    for &value in loca_values {
        if index_format != 0 {
            loca.put_u32(value);
        } else {
            let value = u16::try_from(value >> 1).map_err(|_| GlyfDecoderError::OffsetOverflow)?;
            loca.put_u16(value);
        }
    }
    Ok(loca)
}

/// Rebuilds the `glyf` table from its transformed form, followed by the matching `loca` table,
/// writing both to `out` and returning where they were written.
///
/// `loca_length` is the `loca` length declared in the table directory, which must agree with
/// the glyph count and index format.
pub fn reconstruct_glyf(
    transformed_glyf_table: &[u8],
    loca_length: u32,
    out: &mut OutputBuffer,
) -> Result<GlyfInfo, GlyfDecoderError> {
    let mut decoder = Woff2GlyfDecoder::new(transformed_glyf_table)?;
    let num_glyphs = decoder.num_glyphs;
    let expected_loca_length = (u64::from(num_glyphs) + 1) * decoder.loca_entry_size();
    if u64::from(loca_length) != expected_loca_length {
        return Err(GlyfDecoderError::LocaLengthMismatch {
            expected: expected_loca_length,
            actual: loca_length,
        });
    }

    let glyf_start = out.len();
    let mut loca_values = Vec::with_capacity(num_glyphs as usize + 1);
    let mut x_mins = Vec::with_capacity(num_glyphs as usize);
    let mut glyph = Vec::new();
    for glyph_index in 0..num_glyphs {
        loca_values.push(table_offset(out.len() - glyf_start)?);
        glyph.clear();
        decoder.write_next_glyph(glyph_index, &mut glyph)?;
        x_mins.push(match glyph.get(2..4) {
            Some(&[hi, lo]) => i16::from_be_bytes([hi, lo]),
            _ => 0,
        });
        out.put_slice(&glyph)?;
        out.pad_to_four()?;
    }
    let glyf_length = table_offset(out.len() - glyf_start)?;
    loca_values.push(glyf_length);

    let glyf = TableMetadata {
        checksum: calculate_checksum(&out.as_slice()[glyf_start..]),
        dst_offset: table_offset(glyf_start)?,
        dst_length: glyf_length,
    };

    let loca_table = serialize_loca(&loca_values, decoder.index_format)?;
    let loca_start = out.len();
    out.put_slice(&loca_table)?;
    let loca = TableMetadata {
        checksum: calculate_checksum(&loca_table),
        dst_offset: table_offset(loca_start)?,
        dst_length: table_offset(loca_table.len())?,
    };
    trace!(
        "reconstructed {} glyphs: glyf {} bytes, loca {} bytes",
        num_glyphs,
        glyf.dst_length,
        loca.dst_length
    );

    Ok(GlyfInfo {
        num_glyphs,
        index_format: decoder.index_format,
        x_mins,
        glyf,
        loca,
    })
}
