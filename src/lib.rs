#![doc = include_str!("../readme.md")]
pub mod decode;

mod buffer_util;
mod checksum;
mod decompress;
mod glyf_decoder;
mod hmtx_decoder;
mod magic_numbers;
mod output;
mod reconstruct;
mod ttf_header;
mod woff2;

#[cfg(test)]
mod test_resources;

pub use decode::{
    compute_final_size, convert_woff2_to_ttf, convert_woff2_to_ttf_with_options, is_woff2,
    DecodeError, DecodeOptions,
};
