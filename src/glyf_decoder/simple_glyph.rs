//! Re-encoding of simple glyph outlines into the TrueType `glyf` format

use bytes::BufMut;

use crate::buffer_util::{BoundedReader, SafeBuf, TruncatedError};

use super::x_y_triplet::Point;

pub const ON_CURVE_POINT: u8 = 0x01;
pub const X_SHORT_VECTOR: u8 = 0x02;
pub const Y_SHORT_VECTOR: u8 = 0x04;
pub const REPEAT_FLAG: u8 = 0x08;
pub const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
pub const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;
pub const OVERLAP_SIMPLE: u8 = 0x40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl BoundingBox {
    /// The extent of the points, truncated to 16 bits as the glyph header stores it.
    pub fn of_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            x_min = x_min.min(point.x);
            y_min = y_min.min(point.y);
            x_max = x_max.max(point.x);
            y_max = y_max.max(point.y);
        }
        BoundingBox {
            x_min: x_min as i16,
            y_min: y_min as i16,
            x_max: x_max as i16,
            y_max: y_max as i16,
        }
    }

    pub fn from_buf(buffer: &mut BoundedReader<'_>) -> Result<Self, TruncatedError> {
        Ok(BoundingBox {
            x_min: buffer.try_get_i16()?,
            y_min: buffer.try_get_i16()?,
            x_max: buffer.try_get_i16()?,
            y_max: buffer.try_get_i16()?,
        })
    }

    pub fn write_to_buf(&self, buffer: &mut impl BufMut) {
        buffer.put_i16(self.x_min);
        buffer.put_i16(self.y_min);
        buffer.put_i16(self.x_max);
        buffer.put_i16(self.y_max);
    }
}

fn push_coordinate(delta: i32, short_flag: u8, same_flag: u8, flag: &mut u8, out: &mut Vec<u8>) {
    if delta == 0 {
        *flag |= same_flag;
    } else if delta > -256 && delta < 256 {
        *flag |= short_flag;
        if delta > 0 {
            *flag |= same_flag;
        }
        out.put_u8(delta.unsigned_abs() as u8);
    } else {
        out.put_i16(delta as i16);
    }
}

/// Writes the flags, x coordinates and y coordinates of a simple glyph, run-length compressing
/// repeated flags.
///
/// When `overlap_simple` is set the first point's flag carries `OVERLAP_SIMPLE`.
pub fn store_points(points: &[Point], overlap_simple: bool, dst: &mut Vec<u8>) {
    let mut flags = Vec::with_capacity(points.len());
    let mut x_coordinates = Vec::new();
    let mut y_coordinates = Vec::new();

    let mut last_flag = None;
    let mut repeat_count = 0u8;
    let mut last_x = 0i32;
    let mut last_y = 0i32;

    for (index, point) in points.iter().enumerate() {
        let mut flag = if point.on_curve { ON_CURVE_POINT } else { 0 };
        if overlap_simple && index == 0 {
            flag |= OVERLAP_SIMPLE;
        }
        push_coordinate(
            point.x.wrapping_sub(last_x),
            X_SHORT_VECTOR,
            X_IS_SAME_OR_POSITIVE,
            &mut flag,
            &mut x_coordinates,
        );
        push_coordinate(
            point.y.wrapping_sub(last_y),
            Y_SHORT_VECTOR,
            Y_IS_SAME_OR_POSITIVE,
            &mut flag,
            &mut y_coordinates,
        );

        match flags.last_mut() {
            Some(previous) if last_flag == Some(flag) && repeat_count != u8::MAX => {
                *previous |= REPEAT_FLAG;
                repeat_count += 1;
            }
            _ => {
                if repeat_count != 0 {
                    flags.put_u8(repeat_count);
                }
                flags.put_u8(flag);
                repeat_count = 0;
            }
        }
        last_flag = Some(flag);
        last_x = point.x;
        last_y = point.y;
    }
    if repeat_count != 0 {
        flags.put_u8(repeat_count);
    }

    dst.extend_from_slice(&flags);
    dst.extend_from_slice(&x_coordinates);
    dst.extend_from_slice(&y_coordinates);
}
