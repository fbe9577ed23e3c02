use bytes::{Buf, BufMut};
use four_cc::FourCC;
pub use safer_bytes::{error::Truncated as TruncatedError, SafeBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Base128Error {
    #[error("UIntBase128 value starts with a zero byte")]
    LeadingZero,
    #[error("UIntBase128 value longer than five bytes")]
    MoreThan5Bytes,
    #[error("UIntBase128 value cut off by end of data")]
    Truncated,
    #[error("UIntBase128 value does not fit in 32 bits")]
    Overflow,
}

impl From<TruncatedError> for Base128Error {
    fn from(_: TruncatedError) -> Self {
        Self::Truncated
    }
}

/// A read cursor confined to a sub-range of a byte slice.
///
/// Every read is checked against the end of the range, including reads whose end offset would
/// overflow `usize`. The cursor only moves when a read succeeds.
#[derive(Clone, Debug)]
pub struct BoundedReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BoundedReader<'a> {
    /// Creates a reader over `data[base_offset..base_offset + length]`.
    pub fn new(data: &'a [u8], base_offset: usize, length: usize) -> Result<Self, TruncatedError> {
        let end = base_offset.checked_add(length).ok_or(TruncatedError)?;
        let data = data.get(base_offset..end).ok_or(TruncatedError)?;
        Ok(Self { data, position: 0 })
    }

    pub fn from_slice(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the cursor from the start of the range.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The unread part of the range.
    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn end_of(&self, num_bytes: usize) -> Result<usize, TruncatedError> {
        self.position
            .checked_add(num_bytes)
            .filter(|&end| end <= self.data.len())
            .ok_or(TruncatedError)
    }

    pub fn skip(&mut self, num_bytes: usize) -> Result<(), TruncatedError> {
        self.position = self.end_of(num_bytes)?;
        Ok(())
    }

    /// Borrows the next `num_bytes` bytes and moves past them.
    pub fn read_slice(&mut self, num_bytes: usize) -> Result<&'a [u8], TruncatedError> {
        let end = self.end_of(num_bytes)?;
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }
}

impl Buf for BoundedReader<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn chunk(&self) -> &[u8] {
        self.remaining_slice()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "advanced past the end of a bounded reader"
        );
        self.position += cnt;
    }
}

/// WOFF2-specific reads on top of [`SafeBuf`].
pub trait BufExt {
    fn try_get_four_cc(&mut self) -> Result<FourCC, TruncatedError>;
    /// `UIntBase128`: up to five bytes, seven bits each, most significant first.
    fn try_get_base_128(&mut self) -> Result<u32, Base128Error>;
    /// `255UInt16`: one byte, or a marker byte followed by one or two more.
    fn try_get_255_u16(&mut self) -> Result<u16, TruncatedError>;
    /// Appends the next `num_bytes` bytes to `dest`, or fails without consuming anything.
    fn try_copy_to_buf<T: BufMut>(
        &mut self,
        dest: &mut T,
        num_bytes: usize,
    ) -> Result<(), TruncatedError>;
}

impl<B> BufExt for B
where
    B: Buf,
{
    fn try_get_four_cc(&mut self) -> Result<FourCC, TruncatedError> {
        if self.remaining() < 4 {
            return Err(TruncatedError);
        }
        let mut tag = [0; 4];
        self.copy_to_slice(&mut tag);
        Ok(FourCC(tag))
    }

    fn try_get_base_128(&mut self) -> Result<u32, Base128Error> {
        let mut value = 0u32;
        for index in 0..5 {
            let byte = self.try_get_u8()?;
            if index == 0 && byte == 0x80 {
                return Err(Base128Error::LeadingZero);
            }
            if value & 0xFE00_0000 != 0 {
                return Err(Base128Error::Overflow);
            }
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Base128Error::MoreThan5Bytes)
    }

    fn try_get_255_u16(&mut self) -> Result<u16, TruncatedError> {
        const LOWEST_U_CODE: u16 = 253;
        Ok(match self.try_get_u8()? {
            253 => self.try_get_u16()?,
            254 => u16::from(self.try_get_u8()?) + 2 * LOWEST_U_CODE,
            255 => u16::from(self.try_get_u8()?) + LOWEST_U_CODE,
            code => u16::from(code),
        })
    }

    fn try_copy_to_buf<T: BufMut>(
        &mut self,
        dest: &mut T,
        num_bytes: usize,
    ) -> Result<(), TruncatedError> {
        if self.remaining() < num_bytes {
            return Err(TruncatedError);
        }
        dest.put(Buf::take(&mut *self, num_bytes));
        Ok(())
    }
}

/// Rounding up to a multiple of four.
///
/// Values within 3 of the type's maximum are returned unchanged instead of overflowing.
pub trait RoundUp4: Sized {
    fn round_up_4(self) -> Self;
}

macro_rules! impl_round_up_4 {
    ($($ty:ty),*) => {
        $(
            impl RoundUp4 for $ty {
                fn round_up_4(self) -> Self {
                    match self.checked_add(3) {
                        Some(value) => value & !3,
                        None => self,
                    }
                }
            }
        )*
    };
}

impl_round_up_4!(u32, u64, usize);
