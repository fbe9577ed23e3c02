//! Builders for synthetic WOFF2 files and helpers for inspecting decoded output.

use std::io::Write;

use bytes::BufMut;
use four_cc::FourCC;

use crate::glyf_decoder::x_y_triplet::Point;
use crate::magic_numbers::{
    GLYF_TAG, KNOWN_TABLE_TAGS, LOCA_TAG, TTF_COLLECTION_FLAVOR, WOFF2_SIGNATURE,
};

const TTF_TRUE_TYPE_FLAVOR: FourCC = FourCC([0, 1, 0, 0]);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut writer = brotli::CompressorWriter::new(&mut out, 4096, 11, 22);
        writer.write_all(data).unwrap();
    }
    out
}

pub fn put_base_128(buffer: &mut Vec<u8>, value: u32) {
    let num_bytes = (1..5).find(|&n| value >> (7 * n) == 0).unwrap_or(5);
    for i in (0..num_bytes).rev() {
        let byte = ((value >> (7 * i)) & 0x7F) as u8;
        buffer.put_u8(if i != 0 { byte | 0x80 } else { byte });
    }
}

pub fn put_255_u16(buffer: &mut Vec<u8>, value: u16) {
    match value {
        0..=252 => buffer.put_u8(value as u8),
        253..=505 => {
            buffer.put_u8(255);
            buffer.put_u8((value - 253) as u8);
        }
        506..=761 => {
            buffer.put_u8(254);
            buffer.put_u8((value - 506) as u8);
        }
        _ => {
            buffer.put_u8(253);
            buffer.put_u16(value);
        }
    }
}

fn pad_to_four(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.put_u8(0);
    }
}

/// A table as it appears in the WOFF2 table directory and the compressed stream.
pub struct TestTable {
    tag: FourCC,
    transform_version: u8,
    dest_length: u32,
    payload: Vec<u8>,
}

impl TestTable {
    /// An untransformed table.
    pub fn plain(tag: [u8; 4], data: Vec<u8>) -> Self {
        let tag = FourCC(tag);
        let transform_version = if tag == GLYF_TAG || tag == LOCA_TAG { 3 } else { 0 };
        TestTable {
            tag,
            transform_version,
            dest_length: data.len() as u32,
            payload: data,
        }
    }

    pub fn transformed(tag: [u8; 4], transform_version: u8, dest_length: u32, payload: Vec<u8>) -> Self {
        TestTable {
            tag: FourCC(tag),
            transform_version,
            dest_length,
            payload,
        }
    }

    fn is_transformed(&self) -> bool {
        if self.tag == GLYF_TAG || self.tag == LOCA_TAG {
            self.transform_version == 0
        } else {
            self.transform_version != 0
        }
    }

    fn write_entry(&self, buffer: &mut Vec<u8>) {
        let version = self.transform_version << 6;
        match KNOWN_TABLE_TAGS.iter().position(|&tag| tag == self.tag) {
            Some(index) => buffer.put_u8(version | index as u8),
            None => {
                buffer.put_u8(version | 0x3F);
                buffer.put_slice(&self.tag.0);
            }
        }
        put_base_128(buffer, self.dest_length);
        if self.is_transformed() {
            put_base_128(buffer, self.payload.len() as u32);
        }
    }
}

/// Assembles a WOFF2 file from tables, compressing their data with Brotli.
pub struct Woff2Builder {
    tables: Vec<TestTable>,
    collection: Option<(u32, Vec<Vec<u16>>)>,
    table_data: Option<Vec<u8>>,
    total_sfnt_size: Option<u32>,
    metadata: Option<String>,
    private_data: Option<Vec<u8>>,
}

impl Woff2Builder {
    pub fn new() -> Self {
        Woff2Builder {
            tables: Vec::new(),
            collection: None,
            table_data: None,
            total_sfnt_size: None,
            metadata: None,
            private_data: None,
        }
    }

    pub fn table(mut self, table: TestTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Makes the file a collection; each font lists indices into the table directory.
    pub fn collection(mut self, fonts: Vec<Vec<u16>>) -> Self {
        self.collection = Some((0x0001_0000, fonts));
        self
    }

    pub fn collection_version(mut self, version: u32) -> Self {
        if let Some((collection_version, _)) = &mut self.collection {
            *collection_version = version;
        }
        self
    }

    /// Compresses `data` instead of the tables' payloads.
    pub fn table_data(mut self, data: Vec<u8>) -> Self {
        self.table_data = Some(data);
        self
    }

    pub fn total_sfnt_size(mut self, size: u32) -> Self {
        self.total_sfnt_size = Some(size);
        self
    }

    pub fn metadata(mut self, xml: &str) -> Self {
        self.metadata = Some(xml.to_owned());
        self
    }

    pub fn private_data(mut self, data: Vec<u8>) -> Self {
        self.private_data = Some(data);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut directory = Vec::new();
        for table in &self.tables {
            table.write_entry(&mut directory);
        }
        if let Some((version, fonts)) = &self.collection {
            directory.put_u32(*version);
            put_255_u16(&mut directory, fonts.len() as u16);
            for indices in fonts {
                put_255_u16(&mut directory, indices.len() as u16);
                directory.put_slice(&TTF_TRUE_TYPE_FLAVOR.0);
                for &index in indices {
                    put_255_u16(&mut directory, index);
                }
            }
        }

        let stream = self.table_data.unwrap_or_else(|| {
            self.tables
                .iter()
                .flat_map(|table| table.payload.iter().copied())
                .collect()
        });
        let compressed = compress(&stream);
        let flavor = if self.collection.is_some() {
            TTF_COLLECTION_FLAVOR
        } else {
            TTF_TRUE_TYPE_FLAVOR
        };
        let total_sfnt_size = self.total_sfnt_size.unwrap_or_else(|| {
            12 + 16 * self.tables.len() as u32
                + self
                    .tables
                    .iter()
                    .map(|table| (table.dest_length + 3) & !3)
                    .sum::<u32>()
        });

        let mut body = directory;
        body.put_slice(&compressed);
        let mut meta = (0, 0, 0);
        if let Some(xml) = &self.metadata {
            pad_to_four(&mut body);
            let compressed = compress(xml.as_bytes());
            meta = (48 + body.len() as u32, compressed.len() as u32, xml.len() as u32);
            body.put_slice(&compressed);
        }
        let mut private = (0, 0);
        if let Some(data) = &self.private_data {
            pad_to_four(&mut body);
            private = (48 + body.len() as u32, data.len() as u32);
            body.put_slice(data);
        }

        let mut font = Vec::with_capacity(48 + body.len());
        font.put_slice(&WOFF2_SIGNATURE.0);
        font.put_slice(&flavor.0);
        font.put_u32(48 + body.len() as u32);
        font.put_u16(self.tables.len() as u16);
        font.put_u16(0);
        font.put_u32(total_sfnt_size);
        font.put_u32(compressed.len() as u32);
        font.put_u16(1);
        font.put_u16(0);
        font.put_u32(meta.0);
        font.put_u32(meta.1);
        font.put_u32(meta.2);
        font.put_u32(private.0);
        font.put_u32(private.1);
        font.put_slice(&body);
        font
    }
}

/// A `head` table with `unitsPerEm` 1000 and short `loca` offsets.
pub fn head_table() -> Vec<u8> {
    let mut head = Vec::with_capacity(54);
    head.put_u32(0x0001_0000);
    head.put_u32(0x0001_0000);
    // checkSumAdjustment
    head.put_u32(0x1234_5678);
    head.put_u32(0x5F0F_3CF5);
    head.put_u16(0x000B);
    head.put_u16(1000);
    head.put_u64(0);
    head.put_u64(0);
    for bound in [0i16, -200, 1000, 800] {
        head.put_i16(bound);
    }
    head.put_u16(0);
    head.put_u16(8);
    head.put_i16(2);
    // indexToLocFormat, glyphDataFormat
    head.put_i16(0);
    head.put_i16(0);
    head
}

pub fn hhea_table(num_hmetrics: u16) -> Vec<u8> {
    let mut hhea = Vec::with_capacity(36);
    hhea.put_u32(0x0001_0000);
    hhea.put_i16(800);
    hhea.put_i16(-200);
    hhea.put_i16(0);
    hhea.put_u16(1000);
    hhea.put_slice(&[0; 22]);
    hhea.put_u16(num_hmetrics);
    hhea
}

pub fn maxp_table(num_glyphs: u16) -> Vec<u8> {
    let mut maxp = Vec::with_capacity(6);
    maxp.put_u32(0x0000_5000);
    maxp.put_u16(num_glyphs);
    maxp
}

/// Packs coordinate deltas the way a WOFF2 encoder does, returning the flag and glyph streams.
pub fn encode_triplets(points: &[Point]) -> (Vec<u8>, Vec<u8>) {
    let mut flags = Vec::with_capacity(points.len());
    let mut data = Vec::new();
    let (mut last_x, mut last_y) = (0, 0);
    for point in points {
        let (dx, dy) = (point.x - last_x, point.y - last_y);
        last_x = point.x;
        last_y = point.y;
        let (x, y) = (dx.unsigned_abs(), dy.unsigned_abs());
        let x_sign = u8::from(dx >= 0);
        let y_sign = u8::from(dy >= 0) << 1;
        let flag = if dx == 0 && y < 1280 {
            data.put_u8(y as u8);
            (((y >> 8) as u8) << 1) | u8::from(dy >= 0)
        } else if dy == 0 && x < 1280 {
            data.put_u8(x as u8);
            10 + ((((x >> 8) as u8) << 1) | x_sign)
        } else if (1..=64).contains(&x) && (1..=64).contains(&y) {
            let (x, y) = (x - 1, y - 1);
            data.put_u8((((x & 0x0F) << 4) | (y & 0x0F)) as u8);
            20 + ((x & 0x30) as u8 | (((y >> 4) as u8) << 2) | x_sign | y_sign)
        } else if (1..=768).contains(&x) && (1..=768).contains(&y) {
            let (x, y) = (x - 1, y - 1);
            data.put_u8(x as u8);
            data.put_u8(y as u8);
            84 + (12 * (x >> 8) as u8 + 4 * (y >> 8) as u8 + x_sign + y_sign)
        } else if x < 4096 && y < 4096 {
            data.put_u8((x >> 4) as u8);
            data.put_u8((((x & 0x0F) << 4) | (y >> 8)) as u8);
            data.put_u8(y as u8);
            120 + x_sign + y_sign
        } else {
            data.put_u16(x as u16);
            data.put_u16(y as u16);
            124 + x_sign + y_sign
        };
        flags.put_u8(if point.on_curve { flag } else { flag | 0x80 });
    }
    (flags, data)
}

/// Reads the flags and coordinates of a TrueType simple glyph.
pub fn decode_points(data: &[u8], end_points: &[u16]) -> Vec<Point> {
    let num_points = end_points.last().map_or(0, |&end| end as usize + 1);
    let mut position = 0;
    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = data[position];
        position += 1;
        flags.push(flag);
        if flag & 0x08 != 0 {
            let repeat = data[position];
            position += 1;
            flags.extend(std::iter::repeat(flag).take(repeat as usize));
        }
    }

    let mut read_coordinates = |short_flag: u8, same_flag: u8| {
        let mut value = 0i32;
        let mut values = Vec::with_capacity(num_points);
        for &flag in &flags {
            if flag & short_flag != 0 {
                let magnitude = i32::from(data[position]);
                position += 1;
                value += if flag & same_flag != 0 { magnitude } else { -magnitude };
            } else if flag & same_flag == 0 {
                value += i32::from(i16::from_be_bytes([data[position], data[position + 1]]));
                position += 2;
            }
            values.push(value);
        }
        values
    };
    let xs = read_coordinates(0x02, 0x10);
    let ys = read_coordinates(0x04, 0x20);

    flags
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(&flag, (x, y))| Point {
            x,
            y,
            on_curve: flag & 0x01 != 0,
        })
        .collect()
}

/// A simple glyph read back from `glyf`.
pub struct ParsedGlyph {
    pub bbox: [i16; 4],
    pub instructions: Vec<u8>,
    pub contours: Vec<Vec<Point>>,
    pub overlap_simple: bool,
}

pub fn parse_simple_glyph(data: &[u8]) -> ParsedGlyph {
    let read_u16 = |offset: usize| u16::from_be_bytes([data[offset], data[offset + 1]]);
    let num_contours = read_u16(0) as usize;
    let bbox = [1, 2, 3, 4].map(|i| read_u16(2 * i) as i16);
    let end_points: Vec<u16> = (0..num_contours).map(|i| read_u16(10 + 2 * i)).collect();
    let instructions_offset = 10 + 2 * num_contours;
    let instruction_length = read_u16(instructions_offset) as usize;
    let instructions = data[instructions_offset + 2..][..instruction_length].to_vec();
    let points_data = &data[instructions_offset + 2 + instruction_length..];
    let points = decode_points(points_data, &end_points);

    let mut start = 0;
    let contours = end_points
        .iter()
        .map(|&end| {
            let contour = points[start..=end as usize].to_vec();
            start = end as usize + 1;
            contour
        })
        .collect();
    ParsedGlyph {
        bbox,
        instructions,
        contours,
        overlap_simple: points_data[0] & 0x40 != 0,
    }
}

pub enum TestGlyph {
    Empty,
    Simple {
        contours: Vec<Vec<Point>>,
        instructions: Vec<u8>,
        /// Written to the bbox stream instead of being computed from the points
        bbox: Option<[i16; 4]>,
        overlap: bool,
    },
    Composite {
        /// Component records, starting with the first flag word
        components: Vec<u8>,
        bbox: [i16; 4],
        instructions: Option<Vec<u8>>,
    },
}

/// Builds a transformed `glyf` table.
pub struct TransformedGlyf {
    pub glyphs: Vec<TestGlyph>,
    pub index_format: u16,
    /// Leave every bbox bit clear, even for composite glyphs
    pub clear_bbox_bits: bool,
    /// Set every bbox bit without adding bboxes to the stream
    pub force_bbox_bits: bool,
}

impl TransformedGlyf {
    pub fn new(glyphs: Vec<TestGlyph>) -> Self {
        TransformedGlyf {
            glyphs,
            index_format: 0,
            clear_bbox_bits: false,
            force_bbox_bits: false,
        }
    }

    pub fn loca_length(&self) -> u32 {
        let entry_size = if self.index_format == 0 { 2 } else { 4 };
        (self.glyphs.len() as u32 + 1) * entry_size
    }

    pub fn build(&self) -> Vec<u8> {
        let num_glyphs = self.glyphs.len();
        let mut n_contours = Vec::new();
        let mut n_points = Vec::new();
        let mut flags = Vec::new();
        let mut glyph_stream = Vec::new();
        let mut composites = Vec::new();
        let mut bbox_bitmap = vec![0u8; ((num_glyphs + 31) >> 5) << 2];
        let mut bboxes = Vec::new();
        let mut instruction_stream = Vec::new();
        let mut overlap_bitmap = vec![0u8; (num_glyphs + 7) >> 3];
        let mut has_overlap = false;

        let mut set_bbox = |index: usize, bbox: [i16; 4], bboxes: &mut Vec<u8>| {
            bbox_bitmap[index >> 3] |= 0x80 >> (index & 7);
            for value in bbox {
                bboxes.put_i16(value);
            }
        };

        for (index, glyph) in self.glyphs.iter().enumerate() {
            match glyph {
                TestGlyph::Empty => n_contours.put_i16(0),
                TestGlyph::Simple {
                    contours,
                    instructions,
                    bbox,
                    overlap,
                } => {
                    n_contours.put_i16(contours.len() as i16);
                    for contour in contours {
                        put_255_u16(&mut n_points, contour.len() as u16);
                    }
                    let points: Vec<Point> = contours.concat();
                    let (glyph_flags, data) = encode_triplets(&points);
                    flags.extend_from_slice(&glyph_flags);
                    glyph_stream.extend_from_slice(&data);
                    put_255_u16(&mut glyph_stream, instructions.len() as u16);
                    instruction_stream.extend_from_slice(instructions);
                    if let Some(bbox) = bbox {
                        set_bbox(index, *bbox, &mut bboxes);
                    }
                    if *overlap {
                        overlap_bitmap[index >> 3] |= 0x80 >> (index & 7);
                        has_overlap = true;
                    }
                }
                TestGlyph::Composite {
                    components,
                    bbox,
                    instructions,
                } => {
                    n_contours.put_i16(-1);
                    composites.extend_from_slice(components);
                    set_bbox(index, *bbox, &mut bboxes);
                    if let Some(instructions) = instructions {
                        put_255_u16(&mut glyph_stream, instructions.len() as u16);
                        instruction_stream.extend_from_slice(instructions);
                    }
                }
            }
        }
        if self.clear_bbox_bits {
            bbox_bitmap.fill(0);
        }
        if self.force_bbox_bits {
            bbox_bitmap.fill(0xFF);
        }
        let bbox_stream = [bbox_bitmap, bboxes].concat();

        let mut table = Vec::new();
        table.put_u16(0);
        table.put_u16(u16::from(has_overlap));
        table.put_u16(num_glyphs as u16);
        table.put_u16(self.index_format);
        let streams = [
            &n_contours,
            &n_points,
            &flags,
            &glyph_stream,
            &composites,
            &bbox_stream,
            &instruction_stream,
        ];
        for stream in streams {
            table.put_u32(stream.len() as u32);
        }
        for stream in streams {
            table.put_slice(stream);
        }
        if has_overlap {
            table.put_slice(&overlap_bitmap);
        }
        table
    }
}

/// Builds a transformed `hmtx` table; `flags` decides which of the bearings are read back.
pub struct TransformedHmtx {
    pub flags: u8,
    pub advance_widths: Vec<u16>,
    pub proportional_lsbs: Vec<i16>,
    pub monospace_lsbs: Vec<i16>,
}

impl TransformedHmtx {
    /// Every glyph has its own advance width and its bearing is its `xMin`.
    pub fn proportional(advance_widths: Vec<u16>) -> Self {
        TransformedHmtx {
            flags: 0x01,
            advance_widths,
            proportional_lsbs: Vec::new(),
            monospace_lsbs: Vec::new(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut table = vec![self.flags];
        for &advance_width in &self.advance_widths {
            table.put_u16(advance_width);
        }
        for &lsb in self.proportional_lsbs.iter().chain(&self.monospace_lsbs) {
            table.put_i16(lsb);
        }
        table
    }
}

/// A TrueType WOFF2 font with transformed `glyf` and `loca`; `hmtx` is transformed when given
/// and zeroed otherwise.
pub fn glyph_font(glyphs: Vec<TestGlyph>, hmtx: Option<TransformedHmtx>) -> Vec<u8> {
    let num_glyphs = glyphs.len() as u16;
    let glyf = TransformedGlyf::new(glyphs);
    let glyf_data = glyf.build();
    let (num_hmetrics, hmtx_table) = match hmtx {
        Some(hmtx) => {
            let num_hmetrics = hmtx.advance_widths.len() as u16;
            let dest_length = 2 * u32::from(num_glyphs) + 2 * u32::from(num_hmetrics);
            (
                num_hmetrics,
                TestTable::transformed(*b"hmtx", 1, dest_length, hmtx.build()),
            )
        }
        None => (
            num_glyphs,
            TestTable::plain(*b"hmtx", vec![0; 4 * num_glyphs as usize]),
        ),
    };
    Woff2Builder::new()
        .table(TestTable::plain(*b"head", head_table()))
        .table(TestTable::plain(*b"hhea", hhea_table(num_hmetrics)))
        .table(TestTable::plain(*b"maxp", maxp_table(num_glyphs)))
        .table(TestTable::transformed(
            *b"glyf",
            0,
            glyf_data.len() as u32,
            glyf_data,
        ))
        .table(TestTable::transformed(
            *b"loca",
            0,
            glyf.loca_length(),
            Vec::new(),
        ))
        .table(hmtx_table)
        .build()
}
