//! Canonical header synthesis and parsing.
//!
//! # Overview
//!
//! Every item on the wire begins with a header: a 3-bit major type followed
//! by an unsigned value in shortest form. Values below 24 live in the low
//! bits of the initial byte; larger values follow in a 1, 2, 4, or 8 byte
//! big-endian extension selected by additional information 24 through 27.
//!
//! Writers synthesize headers into a caller-provided 9-byte scratch buffer
//! so the sink sees a single write per header. Readers parse through an
//! 8-byte scratch and reject anything that is not shortest form, so a value
//! has exactly one accepted encoding.
//!
//! # Usage Example
//!
//! ```rust
//! use cborgen::{read_header_buf, write_major_type_header_buf, MajorType};
//!
//! let mut out = Vec::new();
//! let mut scratch = [0u8; 9];
//! write_major_type_header_buf(&mut scratch, &mut out, MajorType::Array, 3).unwrap();
//! assert_eq!(out, [0x83]);
//!
//! let mut scratch = [0u8; 8];
//! let (major, value) = read_header_buf(&mut out.as_slice(), &mut scratch).unwrap();
//! assert_eq!((major, value), (MajorType::Array, 3));
//! ```

use crate::Error;
use std::fmt;
use std::io::{Read, Write};

// ---------- Constants ----------

/// The single-byte encoding of null (major type 7, value 22).
pub const CBOR_NULL: [u8; 1] = [0xf6];

/// The single-byte encoding of false (major type 7, value 20).
pub const CBOR_FALSE: [u8; 1] = [0xf4];

/// The single-byte encoding of true (major type 7, value 21).
pub const CBOR_TRUE: [u8; 1] = [0xf5];

/// The mask for the additional-information bits of the initial byte.
const ADDITIONAL_MASK: u8 = 0x1f;

/// The bit offset of the major type within the initial byte.
const MAJOR_SHIFT: u32 = 5;

// ---------- Major types ----------

/// The 3-bit category prefix of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MajorType {
    UnsignedInt = 0,
    NegativeInt = 1,
    ByteString = 2,
    TextString = 3,
    Array = 4,
    Map = 5,
    Tag = 6,
    Other = 7,
}

impl MajorType {
    /// Decodes the three low bits of `value`.
    fn from_bits(value: u8) -> Self {
        match value & 0x07 {
            0 => Self::UnsignedInt,
            1 => Self::NegativeInt,
            2 => Self::ByteString,
            3 => Self::TextString,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsignedInt => "unsigned integer",
            Self::NegativeInt => "negative integer",
            Self::ByteString => "byte string",
            Self::TextString => "text string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Tag => "tag",
            Self::Other => "simple value",
        })
    }
}

// ---------- Writing ----------

/// Fills `scratch` with the shortest-form header for `major` and `value`,
/// returning the number of bytes used.
fn put_header(scratch: &mut [u8; 9], major: MajorType, value: u64) -> usize {
    let high = (major as u8) << MAJOR_SHIFT;
    if value < 24 {
        scratch[0] = high | value as u8;
        1
    } else if value <= u8::MAX as u64 {
        scratch[0] = high | 24;
        scratch[1] = value as u8;
        2
    } else if value <= u16::MAX as u64 {
        scratch[0] = high | 25;
        scratch[1..3].copy_from_slice(&(value as u16).to_be_bytes());
        3
    } else if value <= u32::MAX as u64 {
        scratch[0] = high | 26;
        scratch[1..5].copy_from_slice(&(value as u32).to_be_bytes());
        5
    } else {
        scratch[0] = high | 27;
        scratch[1..9].copy_from_slice(&value.to_be_bytes());
        9
    }
}

/// Writes the canonical header for `major` and `value`, synthesizing the
/// bytes in `scratch` so the sink sees a single write.
pub fn write_major_type_header_buf(
    scratch: &mut [u8; 9],
    w: &mut impl Write,
    major: MajorType,
    value: u64,
) -> Result<(), Error> {
    let len = put_header(scratch, major, value);
    w.write_all(&scratch[..len])?;
    Ok(())
}

/// Writes a bool as major type 7, value 20 or 21.
pub fn write_bool(w: &mut impl Write, value: bool) -> Result<(), Error> {
    w.write_all(if value { &CBOR_TRUE } else { &CBOR_FALSE })?;
    Ok(())
}

// ---------- Reading ----------

/// Reads one canonical header, returning the major type and its value.
///
/// Returns an error if:
/// - The additional information is 28 through 30 (reserved) or 31
///   (indefinite length)
/// - The value is not in shortest form
/// - The source ends mid-header
pub fn read_header_buf(
    r: &mut impl Read,
    scratch: &mut [u8; 8],
) -> Result<(MajorType, u64), Error> {
    r.read_exact(&mut scratch[..1])?;
    let initial = scratch[0];
    let major = MajorType::from_bits(initial >> MAJOR_SHIFT);

    let value = match initial & ADDITIONAL_MASK {
        low @ 0..=23 => low as u64,
        24 => {
            r.read_exact(&mut scratch[..1])?;
            let value = scratch[0] as u64;
            if value < 24 {
                return Err(Error::NotCanonical);
            }
            value
        }
        25 => {
            r.read_exact(&mut scratch[..2])?;
            let value = u16::from_be_bytes([scratch[0], scratch[1]]) as u64;
            if value <= u8::MAX as u64 {
                return Err(Error::NotCanonical);
            }
            value
        }
        26 => {
            r.read_exact(&mut scratch[..4])?;
            let value =
                u32::from_be_bytes([scratch[0], scratch[1], scratch[2], scratch[3]]) as u64;
            if value <= u16::MAX as u64 {
                return Err(Error::NotCanonical);
            }
            value
        }
        27 => {
            r.read_exact(&mut scratch[..8])?;
            let value = u64::from_be_bytes(*scratch);
            if value <= u32::MAX as u64 {
                return Err(Error::NotCanonical);
            }
            value
        }
        _ => return Err(Error::Invalid("header", "reserved additional information")),
    };

    Ok((major, value))
}
