use four_cc::FourCC;

pub const WOFF2_SIGNATURE: FourCC = FourCC(*b"wOF2");
pub const TTF_COLLECTION_FLAVOR: FourCC = FourCC(*b"ttcf");

pub const GLYF_TAG: FourCC = FourCC(*b"glyf");
pub const LOCA_TAG: FourCC = FourCC(*b"loca");
pub const HEAD_TAG: FourCC = FourCC(*b"head");
pub const HHEA_TAG: FourCC = FourCC(*b"hhea");
pub const HMTX_TAG: FourCC = FourCC(*b"hmtx");

/// Value the whole-font checksum must come to once `head.checkSumAdjustment` is set.
pub const CHECKSUM_MINUEND: u32 = 0xB1B0AFBA;

/// Tags addressable by the low six bits of a table directory flag byte.
///
/// <https://www.w3.org/TR/WOFF2/#table_dir_format>
pub const KNOWN_TABLE_TAGS: [FourCC; 63] = [
    FourCC(*b"cmap"),
    FourCC(*b"head"),
    FourCC(*b"hhea"),
    FourCC(*b"hmtx"),
    FourCC(*b"maxp"),
    FourCC(*b"name"),
    FourCC(*b"OS/2"),
    FourCC(*b"post"),
    FourCC(*b"cvt "),
    FourCC(*b"fpgm"),
    FourCC(*b"glyf"),
    FourCC(*b"loca"),
    FourCC(*b"prep"),
    FourCC(*b"CFF "),
    FourCC(*b"VORG"),
    FourCC(*b"EBDT"),
    FourCC(*b"EBLC"),
    FourCC(*b"gasp"),
    FourCC(*b"hdmx"),
    FourCC(*b"kern"),
    FourCC(*b"LTSH"),
    FourCC(*b"PCLT"),
    FourCC(*b"VDMX"),
    FourCC(*b"vhea"),
    FourCC(*b"vmtx"),
    FourCC(*b"BASE"),
    FourCC(*b"GDEF"),
    FourCC(*b"GPOS"),
    FourCC(*b"GSUB"),
    FourCC(*b"EBSC"),
    FourCC(*b"JSTF"),
    FourCC(*b"MATH"),
    FourCC(*b"CBDT"),
    FourCC(*b"CBLC"),
    FourCC(*b"COLR"),
    FourCC(*b"CPAL"),
    FourCC(*b"SVG "),
    FourCC(*b"sbix"),
    FourCC(*b"acnt"),
    FourCC(*b"avar"),
    FourCC(*b"bdat"),
    FourCC(*b"bloc"),
    FourCC(*b"bsln"),
    FourCC(*b"cvar"),
    FourCC(*b"fdsc"),
    FourCC(*b"feat"),
    FourCC(*b"fmtx"),
    FourCC(*b"fvar"),
    FourCC(*b"gvar"),
    FourCC(*b"hsty"),
    FourCC(*b"just"),
    FourCC(*b"lcar"),
    FourCC(*b"mort"),
    FourCC(*b"morx"),
    FourCC(*b"opbd"),
    FourCC(*b"prop"),
    FourCC(*b"trak"),
    FourCC(*b"Zapf"),
    FourCC(*b"Silf"),
    FourCC(*b"Glat"),
    FourCC(*b"Gloc"),
    FourCC(*b"Feat"),
    FourCC(*b"Sill"),
];
