use std::mem::size_of;

use num_traits::PrimInt;
use zerocopy::byteorder::{NetworkEndian, U64};
use zerocopy::{FromBytes, IntoBytes};

use crate::darray::DArray;
use crate::types::WireError;

//------------ Wire ----------------------------------------------------------

/// The fixed on-disk form of a structure.
///
/// Header integers (sizes, level tables) are big-endian 64-bit; buffer
/// payloads are raw little-endian element bytes prefixed with their element
/// count. The format carries no type or bound tag: decoding is driven by
/// the target type, and a shape that disagrees with the declared size is
/// rejected with [`WireError::LengthMismatch`].
pub trait Wire: Sized {
    /// Append the serialized form to `out`.
    fn write_to(&self, out: &mut Vec<u8>);

    /// Decode from the front of `input`, advancing it past the consumed
    /// bytes.
    fn read_from(input: &mut &[u8]) -> Result<Self, WireError>;

    /// The serialized form as a fresh byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    /// Decode from exactly `bytes`; trailing bytes are an error.
    fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let mut input = bytes;
        let decoded = Self::read_from(&mut input)?;
        if !input.is_empty() {
            return Err(WireError::TrailingBytes);
        }
        Ok(decoded)
    }
}

//------------ Header helpers ------------------------------------------------

pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(U64::<NetworkEndian>::new(value).as_bytes());
}

pub(crate) fn take_u64(input: &mut &[u8]) -> Result<u64, WireError> {
    let (head, rest) =
        input.split_at_checked(8).ok_or(WireError::Truncated)?;
    let value = U64::<NetworkEndian>::read_from_bytes(head)
        .map_err(|_| WireError::Truncated)?;
    *input = rest;
    Ok(value.get())
}

pub(crate) fn write_level_table(level: &[usize], out: &mut Vec<u8>) {
    put_u64(out, level.len() as u64);
    for &entry in level {
        put_u64(out, entry as u64);
    }
}

pub(crate) fn read_level_table(
    input: &mut &[u8],
) -> Result<Box<[usize]>, WireError> {
    let levels = take_u64(input)? as usize;
    // A level table has one entry per tree height; anything larger than the
    // word size is garbage and not worth allocating for.
    if levels > 66 {
        return Err(WireError::LengthMismatch);
    }
    let mut level = Vec::with_capacity(levels);
    for _ in 0..levels {
        level.push(take_u64(input)? as usize);
    }
    Ok(level.into_boxed_slice())
}

//------------ Buffer payloads -----------------------------------------------

/// Element types that cross the wire as raw little-endian bytes.
pub(crate) trait WireWord: PrimInt {
    fn put(self, out: &mut Vec<u8>);
    fn take(input: &mut &[u8]) -> Result<Self, WireError>;
}

macro_rules! impl_wire_word {
    ($($t:ty),*) => {
        $(impl WireWord for $t {
            fn put(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn take(input: &mut &[u8]) -> Result<Self, WireError> {
                let (head, rest) = input
                    .split_at_checked(size_of::<$t>())
                    .ok_or(WireError::Truncated)?;
                *input = rest;
                Ok(<$t>::from_le_bytes(head.try_into().unwrap()))
            }
        })*
    };
}

impl_wire_word!(u8, u16, u64);

pub(crate) fn write_darray<T: WireWord>(arr: &DArray<T>, out: &mut Vec<u8>) {
    put_u64(out, arr.len() as u64);
    for &element in arr.iter() {
        element.put(out);
    }
}

pub(crate) fn read_darray<T: WireWord>(
    input: &mut &[u8],
) -> Result<DArray<T>, WireError> {
    let len = take_u64(input)? as usize;
    let byte_len =
        len.checked_mul(size_of::<T>()).ok_or(WireError::Truncated)?;
    if input.len() < byte_len {
        return Err(WireError::Truncated);
    }
    let mut arr = DArray::new(len);
    for i in 0..len {
        arr[i] = T::take(input)?;
    }
    Ok(arr)
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u64_big_endian() {
        let mut out = Vec::new();
        put_u64(&mut out, 0x0102_0304_0506_0708);
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);

        let mut input = &out[..];
        assert_eq!(take_u64(&mut input), Ok(0x0102_0304_0506_0708));
        assert!(input.is_empty());
    }

    #[test]
    fn test_take_u64_truncated() {
        let mut input = &[1u8, 2, 3][..];
        assert_eq!(take_u64(&mut input), Err(WireError::Truncated));
    }

    #[test]
    fn test_darray_roundtrip() {
        let mut arr = DArray::<u16>::new(3);
        arr.copy_from_slice(&[1, 0x1234, u16::MAX]);

        let mut out = Vec::new();
        write_darray(&arr, &mut out);
        assert_eq!(out.len(), 8 + 3 * 2);

        let mut input = &out[..];
        let back: DArray<u16> = read_darray(&mut input).unwrap();
        assert!(input.is_empty());
        assert_eq!(&*back, &*arr);
    }

    #[test]
    fn test_darray_truncated() {
        let mut out = Vec::new();
        put_u64(&mut out, 4);
        out.extend_from_slice(&[0u8; 3]);
        let mut input = &out[..];
        assert_eq!(
            read_darray::<u64>(&mut input).unwrap_err(),
            WireError::Truncated
        );
    }
}
