use std::{io, path::PathBuf};

use clap::Parser;
use thiserror::Error;
use woff2_sfnt::decode::{
    compute_final_size, convert_woff2_to_ttf_with_options, is_woff2, DecodeError, DecodeOptions,
    DEFAULT_MAX_OUTPUT_SIZE,
};

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Woff(#[from] DecodeError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("{0} is not a WOFF2 file")]
    NotWoff2(String),
}

#[derive(Debug, Parser)]
struct Args {
    in_path: PathBuf,
    out_path: PathBuf,
    /// Fail rather than write a font larger than this many bytes
    #[clap(long, default_value_t = DEFAULT_MAX_OUTPUT_SIZE)]
    max_output_size: usize,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Args::parse();
    let input = std::fs::read(&args.in_path)?;
    if !is_woff2(&input) {
        return Err(Error::NotWoff2(args.in_path.display().to_string()));
    }
    log::info!("declared sfnt size: {} bytes", compute_final_size(&input)?);
    let options = DecodeOptions {
        max_output_size: args.max_output_size,
    };
    let ttf = convert_woff2_to_ttf_with_options(&input, &options)?;
    std::fs::write(args.out_path, ttf)?;
    Ok(())
}
