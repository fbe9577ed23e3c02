//! The growable buffer the SFNT is written into

use bytes::BufMut;
use thiserror::Error;

use crate::buffer_util::RoundUp4;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OutputError {
    #[error("Output would exceed the maximum size of {0} bytes")]
    TooLarge(usize),
    #[error("Write of {length} bytes at offset {offset} is outside the written output")]
    OutOfBounds { offset: usize, length: usize },
    #[error("Padding the output would overflow")]
    PaddingOverflow,
}

/// An append-only byte buffer that also allows overwriting bytes that were already written.
///
/// Placeholders (table records, `checkSumAdjustment`) are written first and patched later, so
/// overwrites are restricted to the range that has been written.
pub struct OutputBuffer {
    buffer: Vec<u8>,
    max_size: usize,
}

impl OutputBuffer {
    pub fn new(capacity: usize, max_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.min(max_size)),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    fn reserve_for(&self, length: usize) -> Result<(), OutputError> {
        match self.buffer.len().checked_add(length) {
            Some(end) if end <= self.max_size => Ok(()),
            _ => Err(OutputError::TooLarge(self.max_size)),
        }
    }

    pub fn put_slice(&mut self, data: &[u8]) -> Result<(), OutputError> {
        self.reserve_for(data.len())?;
        self.buffer.put_slice(data);
        Ok(())
    }

    pub fn put_u16(&mut self, value: u16) -> Result<(), OutputError> {
        self.put_slice(&value.to_be_bytes())
    }

    pub fn put_u32(&mut self, value: u32) -> Result<(), OutputError> {
        self.put_slice(&value.to_be_bytes())
    }

    /// Overwrites previously written bytes starting at `offset`.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<(), OutputError> {
        let out_of_bounds = OutputError::OutOfBounds {
            offset,
            length: data.len(),
        };
        let end = offset.checked_add(data.len()).ok_or(out_of_bounds.clone())?;
        self.buffer
            .get_mut(offset..end)
            .ok_or(out_of_bounds)?
            .copy_from_slice(data);
        Ok(())
    }

    /// Mutable access to previously written bytes.
    pub fn written_mut(&mut self, range: std::ops::Range<usize>) -> Result<&mut [u8], OutputError> {
        let out_of_bounds = OutputError::OutOfBounds {
            offset: range.start,
            length: range.len(),
        };
        self.buffer.get_mut(range).ok_or(out_of_bounds)
    }

    /// Zero-pads the output to a multiple of four bytes.
    pub fn pad_to_four(&mut self) -> Result<(), OutputError> {
        let len = self.buffer.len();
        let padded = len.round_up_4();
        if padded == len && len & 3 != 0 {
            return Err(OutputError::PaddingOverflow);
        }
        self.reserve_for(padded - len)?;
        self.buffer.resize(padded, 0);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}
