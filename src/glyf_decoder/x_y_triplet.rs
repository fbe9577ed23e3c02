//! Decoding of the packed point coordinates of the transformed `glyf` table
//!
//! <https://www.w3.org/TR/WOFF2/#triplet_decoding>

use crate::buffer_util::{BoundedReader, SafeBuf};

use super::GlyfDecoderError;

/// A point of a simple glyph outline, in absolute font units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub on_curve: bool,
}

/// The low bit of the flag byte gives the sign of the first coordinate; the second coordinate
/// uses the next bit.
fn with_sign(flag: u8, magnitude: i32) -> i32 {
    if flag & 1 != 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Reads the delta encoded by one flag byte from the glyph stream.
fn decode_delta(flag: u8, glyph_stream: &mut BoundedReader<'_>) -> Result<(i32, i32), GlyfDecoderError> {
    let mut next = || -> Result<i32, GlyfDecoderError> { Ok(i32::from(glyph_stream.try_get_u8()?)) };
    let delta = match flag {
        0..=9 => {
            let b0 = next()?;
            (0, with_sign(flag, (i32::from(flag & 14) << 7) + b0))
        }
        10..=19 => {
            let b0 = next()?;
            (with_sign(flag, (i32::from((flag - 10) & 14) << 7) + b0), 0)
        }
        20..=83 => {
            let b0 = i32::from(flag - 20);
            let b1 = next()?;
            (
                with_sign(flag, 1 + (b0 & 0x30) + (b1 >> 4)),
                with_sign(flag >> 1, 1 + ((b0 & 0x0c) << 2) + (b1 & 0x0f)),
            )
        }
        84..=119 => {
            let b0 = i32::from(flag - 84);
            let b1 = next()?;
            let b2 = next()?;
            (
                with_sign(flag, 1 + ((b0 / 12) << 8) + b1),
                with_sign(flag >> 1, 1 + (((b0 % 12) >> 2) << 8) + b2),
            )
        }
        120..=123 => {
            let b1 = next()?;
            let b2 = next()?;
            let b3 = next()?;
            (
                with_sign(flag, (b1 << 4) + (b2 >> 4)),
                with_sign(flag >> 1, ((b2 & 0x0f) << 8) + b3),
            )
        }
        _ => {
            let b1 = next()?;
            let b2 = next()?;
            let b3 = next()?;
            let b4 = next()?;
            (
                with_sign(flag, (b1 << 8) + b2),
                with_sign(flag >> 1, (b3 << 8) + b4),
            )
        }
    };
    Ok(delta)
}

/// Decodes one point per flag byte, reading the coordinate deltas from `glyph_stream` and
/// accumulating them into absolute positions.
pub fn decode_triplets(
    flags: &[u8],
    glyph_stream: &mut BoundedReader<'_>,
) -> Result<Vec<Point>, GlyfDecoderError> {
    let mut points = Vec::with_capacity(flags.len());
    let mut x = 0i32;
    let mut y = 0i32;
    for &flag in flags {
        let on_curve = flag >> 7 == 0;
        let (dx, dy) = decode_delta(flag & 0x7f, glyph_stream)?;
        x = x.checked_add(dx).ok_or(GlyfDecoderError::CoordinateOverflow)?;
        y = y.checked_add(dy).ok_or(GlyfDecoderError::CoordinateOverflow)?;
        points.push(Point { x, y, on_curve });
    }
    Ok(points)
}
