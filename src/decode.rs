//! Interface for decoding WOFF2 files

use std::string::FromUtf8Error;

use log::debug;
use thiserror::Error;

use crate::{
    buffer_util::{Base128Error, BoundedReader, SafeBuf, TruncatedError},
    checksum::ChecksumTable,
    decompress::{decompress, BrotliError, MAX_PLAUSIBLE_COMPRESSION_RATIO},
    glyf_decoder::GlyfDecoderError,
    hmtx_decoder::HmtxDecoderError,
    magic_numbers::WOFF2_SIGNATURE,
    output::{OutputBuffer, OutputError},
    reconstruct::{reconstruct_font, WriteTablesError},
    ttf_header::write_headers,
    woff2::{
        collection_directory::CollectionHeaderError,
        header::{Woff2HeaderError, TOTAL_SFNT_SIZE_OFFSET},
        table_directory::TableDirectoryError,
        Woff2File,
    },
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Not a WOFF2 file")]
    IncorrectSignature,
    #[error("Invalid WOFF2 header: {0}")]
    Header(Woff2HeaderError),
    #[error("Invalid base 128 number: {0}")]
    Base128(Base128Error),
    #[error("Invalid table directory: {0}")]
    TableDirectory(TableDirectoryError),
    #[error("Invalid collection directory: {0}")]
    CollectionHeader(#[from] CollectionHeaderError),
    #[error("Brotli decoding failed: {0}")]
    Brotli(#[from] BrotliError),
    #[error("Failed to reconstruct glyf table: {0}")]
    Glyf(GlyfDecoderError),
    #[error("Failed to reconstruct hmtx table: {0}")]
    Hmtx(#[from] HmtxDecoderError),
    #[error("Failed to reconstruct tables: {0}")]
    TableReconstruction(#[from] WriteTablesError),
    #[error("Padding overflow")]
    PaddingOverflow,
    #[error("Read past the end of the buffer")]
    BufferRead,
    #[error("Output error: {0}")]
    Output(OutputError),
    #[error("Extended metadata is not valid UTF-8")]
    Metadata(#[from] FromUtf8Error),
}

impl From<TruncatedError> for DecodeError {
    fn from(_: TruncatedError) -> Self {
        DecodeError::BufferRead
    }
}

impl From<Woff2HeaderError> for DecodeError {
    fn from(e: Woff2HeaderError) -> Self {
        match e {
            Woff2HeaderError::InvalidMagicWord => DecodeError::IncorrectSignature,
            _ => DecodeError::Header(e),
        }
    }
}

impl From<TableDirectoryError> for DecodeError {
    fn from(e: TableDirectoryError) -> Self {
        match e {
            TableDirectoryError::Base128(e) => DecodeError::Base128(e),
            _ => DecodeError::TableDirectory(e),
        }
    }
}

impl From<OutputError> for DecodeError {
    fn from(e: OutputError) -> Self {
        match e {
            OutputError::PaddingOverflow => DecodeError::PaddingOverflow,
            _ => DecodeError::Output(e),
        }
    }
}

impl From<GlyfDecoderError> for DecodeError {
    fn from(e: GlyfDecoderError) -> Self {
        match e {
            GlyfDecoderError::Output(e) => e.into(),
            _ => DecodeError::Glyf(e),
        }
    }
}

/// Default limit on the size of the decoded font.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 30 * 1024 * 1024;

/// Settings for [`convert_woff2_to_ttf_with_options`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Decoding fails rather than produce a font larger than this
    pub max_output_size: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
        }
    }
}

/// Returns whether the data starts with the WOFF2 signature.
pub fn is_woff2(data: &[u8]) -> bool {
    data.get(..4) == Some(&WOFF2_SIGNATURE.0[..])
}

/// Reads the `totalSfntSize` header field.
///
/// The value is only a hint for sizing buffers; the decoded font may differ in size.
pub fn compute_final_size(data: &[u8]) -> Result<u32, DecodeError> {
    let mut buffer = BoundedReader::new(data, TOTAL_SFNT_SIZE_OFFSET, 4)?;
    Ok(buffer.try_get_u32()?)
}

/// Converts a WOFF2 font in `data` into a TTF format font (or font collection).
pub fn convert_woff2_to_ttf(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    convert_woff2_to_ttf_with_options(data, &DecodeOptions::default())
}

/// Converts a WOFF2 font in `data` into a TTF format font (or font collection).
pub fn convert_woff2_to_ttf_with_options(
    data: &[u8],
    options: &DecodeOptions,
) -> Result<Vec<u8>, DecodeError> {
    let file = Woff2File::parse(data)?;

    // `totalSfntSize` is not trusted beyond what a plausible compression ratio allows
    let capacity = (file.header.total_sfnt_size as usize)
        .min(data.len().saturating_mul(MAX_PLAUSIBLE_COMPRESSION_RATIO));
    let mut out = OutputBuffer::new(capacity, options.max_output_size);
    let mut fonts = write_headers(&file, &mut out)?;

    let decompressed = decompress(file.compressed_data, file.uncompressed_length as usize)?;
    debug!(
        "decompressed {} bytes of table data for {} fonts",
        decompressed.len(),
        fonts.len()
    );

    let mut checksums = ChecksumTable::default();
    for (font_index, font) in fonts.iter_mut().enumerate() {
        reconstruct_font(
            font_index,
            font,
            &file.tables,
            &decompressed,
            &mut checksums,
            &mut out,
        )?;
    }
    debug!("decoded {} byte font", out.len());
    Ok(out.into_inner())
}

/// Returns the decompressed extended metadata XML, if the file has any.
pub fn extended_metadata(data: &[u8]) -> Result<Option<String>, DecodeError> {
    let file = Woff2File::parse(data)?;
    let Some(range) = file.header.metadata_range() else {
        return Ok(None);
    };
    let compressed = data
        .get(range)
        .ok_or(Woff2HeaderError::MetadataOutOfBounds)?;
    let metadata = decompress(compressed, file.header.meta_orig_length as usize)?;
    Ok(Some(String::from_utf8(metadata)?))
}

/// Returns the private data block, if the file has one.
pub fn private_data(data: &[u8]) -> Result<Option<&[u8]>, DecodeError> {
    let file = Woff2File::parse(data)?;
    match file.header.private_data_range() {
        Some(range) => Ok(Some(
            data.get(range)
                .ok_or(Woff2HeaderError::PrivateDataOutOfBounds)?,
        )),
        None => Ok(None),
    }
}
