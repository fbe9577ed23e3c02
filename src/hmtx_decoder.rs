//! Reconstruction of the transformed `hmtx` table
//!
//! <https://www.w3.org/TR/WOFF2/#hmtx_table_format>

use bytes::BufMut;
use thiserror::Error;

use crate::buffer_util::{BoundedReader, SafeBuf, TruncatedError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum HmtxDecoderError {
    #[error("Transformed hmtx table truncated")]
    Truncated,
    #[error("Transformed hmtx table stores every left side bearing")]
    NothingTransformed,
    #[error("Reserved hmtx flag bits set: {0:#04x}")]
    ReservedFlags(u8),
    #[error("numberOfHMetrics {num_hmetrics} is not in 1..={num_glyphs}")]
    InvalidNumHMetrics { num_hmetrics: u16, num_glyphs: u16 },
    #[error("Expected xMin values for {expected} glyphs, found {actual}")]
    MissingXMins { expected: u16, actual: usize },
}

impl From<TruncatedError> for HmtxDecoderError {
    fn from(_: TruncatedError) -> Self {
        HmtxDecoderError::Truncated
    }
}

const FLAG_NO_PROPORTIONAL_LSBS: u8 = 1 << 0;
const FLAG_NO_MONOSPACE_LSBS: u8 = 1 << 1;
const FLAG_RESERVED: u8 = !(FLAG_NO_PROPORTIONAL_LSBS | FLAG_NO_MONOSPACE_LSBS);

/// Rebuilds `hmtx`, taking omitted left side bearings from the glyphs' `xMin`.
pub fn reconstruct_hmtx(
    transformed_hmtx_table: &[u8],
    num_glyphs: u16,
    num_hmetrics: u16,
    x_mins: &[i16],
) -> Result<Vec<u8>, HmtxDecoderError> {
    let mut buffer = BoundedReader::from_slice(transformed_hmtx_table);
    let flags = buffer.try_get_u8()?;
    let has_proportional_lsbs = flags & FLAG_NO_PROPORTIONAL_LSBS == 0;
    let has_monospace_lsbs = flags & FLAG_NO_MONOSPACE_LSBS == 0;
    if has_proportional_lsbs && has_monospace_lsbs {
        return Err(HmtxDecoderError::NothingTransformed);
    }
    if flags & FLAG_RESERVED != 0 {
        return Err(HmtxDecoderError::ReservedFlags(flags));
    }
    if num_hmetrics < 1 || num_hmetrics > num_glyphs {
        return Err(HmtxDecoderError::InvalidNumHMetrics {
            num_hmetrics,
            num_glyphs,
        });
    }
    if x_mins.len() != num_glyphs as usize {
        return Err(HmtxDecoderError::MissingXMins {
            expected: num_glyphs,
            actual: x_mins.len(),
        });
    }

    let advance_widths = (0..num_hmetrics)
        .map(|_| buffer.try_get_u16())
        .collect::<Result<Vec<_>, _>>()?;

    let mut lsbs = Vec::with_capacity(num_glyphs as usize);
    for (index, &x_min) in x_mins.iter().enumerate() {
        let explicit = if index < num_hmetrics as usize {
            has_proportional_lsbs
        } else {
            has_monospace_lsbs
        };
        lsbs.push(if explicit { buffer.try_get_i16()? } else { x_min });
    }

    let mut hmtx = Vec::with_capacity(2 * num_glyphs as usize + 2 * num_hmetrics as usize);
    for (index, &lsb) in lsbs.iter().enumerate() {
        if let Some(&advance_width) = advance_widths.get(index) {
            hmtx.put_u16(advance_width);
        }
        hmtx.put_i16(lsb);
    }
    Ok(hmtx)
}
