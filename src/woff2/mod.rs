//! Types representing WOFF2 headers, table directories, and collection directories.

use log::debug;

use crate::buffer_util::BoundedReader;
use crate::decode::DecodeError;
use crate::magic_numbers::TTF_COLLECTION_FLAVOR;

pub mod collection_directory;
pub mod header;
pub mod table_directory;

use collection_directory::{CollectionFontEntry, CollectionHeader};
use header::Woff2Header;
use table_directory::{TableDirectoryEntry, Woff2TableDirectory};

/// Everything in a WOFF2 file up to and including the location of the compressed table data.
pub struct Woff2File<'a> {
    pub header: Woff2Header,
    pub tables: Vec<TableDirectoryEntry>,
    /// Size of the table data once decompressed
    pub uncompressed_length: u32,
    pub collection_header: Option<CollectionHeader>,
    pub compressed_data: &'a [u8],
}

impl<'a> Woff2File<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, DecodeError> {
        let mut buffer = BoundedReader::from_slice(data);
        let header = Woff2Header::from_buf(&mut buffer)?;
        header.is_valid_header(data.len())?;

        let table_directory = Woff2TableDirectory::from_buf(&mut buffer, header.num_tables)?;
        let collection_header = if header.flavor == TTF_COLLECTION_FLAVOR {
            Some(CollectionHeader::from_buf(
                &mut buffer,
                &table_directory.tables,
            )?)
        } else {
            None
        };

        let compressed_offset = buffer.position();
        header.check_layout(compressed_offset, data.len())?;
        let compressed_data =
            buffer.read_slice(header.total_compressed_size as usize)?;

        debug!(
            "woff2 {}.{}: flavor {:?}, {} tables, {} fonts, {} compressed bytes at {}",
            header.major_version,
            header.minor_version,
            header.flavor,
            table_directory.tables.len(),
            collection_header.as_ref().map_or(1, |c| c.fonts.len()),
            compressed_data.len(),
            compressed_offset
        );

        Ok(Woff2File {
            header,
            tables: table_directory.tables,
            uncompressed_length: table_directory.uncompressed_length,
            collection_header,
            compressed_data,
        })
    }

    /// The fonts in the file; a single font uses every table in directory order.
    pub fn fonts(&self) -> Vec<CollectionFontEntry> {
        match &self.collection_header {
            Some(collection_header) => collection_header.fonts.clone(),
            None => vec![CollectionFontEntry {
                flavor: self.header.flavor,
                table_indices: (0..self.header.num_tables).collect(),
            }],
        }
    }
}
