//! Verbatim pass-through of pre-encoded fragments, and structural skipping.

use crate::cid::CID_TAG;
use crate::codec::{MarshalCbor, UnmarshalCbor};
use crate::header::{read_header_buf, write_major_type_header_buf, MajorType, CBOR_NULL};
use crate::util::read_byte_vec;
use crate::{Cid, Error, BYTE_ARRAY_MAX_LEN, MAX_CID_LENGTH, MAX_DEPTH, MAX_LENGTH};
use bytes::Bytes;
use std::io::{self, Read, Write};

/// A raw pre-encoded fragment carried through encoding verbatim.
///
/// Used when upstream code has already produced canonical bytes for a value
/// and re-interpreting them would be wasted work.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deferred {
    /// The canonical bytes of exactly one value. Empty encodes as null.
    pub raw: Bytes,
}

impl MarshalCbor for Deferred {
    fn marshal_cbor(&self, w: &mut impl Write) -> Result<(), Error> {
        if self.raw.is_empty() {
            w.write_all(&CBOR_NULL)?;
            return Ok(());
        }
        w.write_all(&self.raw)?;
        Ok(())
    }
}

impl UnmarshalCbor for Deferred {
    fn unmarshal_cbor(r: &mut impl Read) -> Result<Self, Error> {
        let mut raw = Vec::new();
        walk_value(r, &mut raw, &mut |_| {}, 0)?;
        Ok(Self {
            raw: Bytes::from(raw),
        })
    }
}

/// Skips exactly one value, invoking `visitor` on every CID it contains.
///
/// Used by named-map decoders to advance past unknown fields without
/// interpreting them.
pub fn scan_for_links(r: &mut impl Read, mut visitor: impl FnMut(Cid)) -> Result<(), Error> {
    walk_value(r, &mut io::sink(), &mut visitor, 0)
}

/// Walks one value, echoing its canonical bytes into `out` and reporting
/// every CID to `visit`.
fn walk_value<R: Read, W: Write>(
    r: &mut R,
    out: &mut W,
    visit: &mut dyn FnMut(Cid),
    depth: usize,
) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(Error::Invalid("value", "nesting too deep"));
    }

    let mut scratch = [0u8; 8];
    let mut header = [0u8; 9];
    let (major, extra) = read_header_buf(r, &mut scratch)?;
    write_major_type_header_buf(&mut header, out, major, extra)?;

    match major {
        MajorType::UnsignedInt | MajorType::NegativeInt | MajorType::Other => {}
        MajorType::ByteString => {
            if extra > BYTE_ARRAY_MAX_LEN as u64 {
                return Err(Error::TooLong("byte string", extra, BYTE_ARRAY_MAX_LEN as u64));
            }
            copy_exact(r, out, extra)?;
        }
        MajorType::TextString => {
            if extra > MAX_LENGTH as u64 {
                return Err(Error::TooLong("text string", extra, MAX_LENGTH as u64));
            }
            copy_exact(r, out, extra)?;
        }
        MajorType::Array => {
            for _ in 0..extra {
                walk_value(&mut *r, &mut *out, visit, depth + 1)?;
            }
        }
        MajorType::Map => {
            for _ in 0..extra {
                walk_value(&mut *r, &mut *out, visit, depth + 1)?;
                walk_value(&mut *r, &mut *out, visit, depth + 1)?;
            }
        }
        MajorType::Tag => {
            if extra == CID_TAG {
                let (inner, len) = read_header_buf(r, &mut scratch)?;
                if inner != MajorType::ByteString {
                    return Err(Error::WrongType("cid", MajorType::ByteString, inner));
                }
                if len > MAX_CID_LENGTH as u64 {
                    return Err(Error::TooLong("cid", len, MAX_CID_LENGTH as u64));
                }
                write_major_type_header_buf(&mut header, out, inner, len)?;
                let buf = read_byte_vec(r, len as usize)?;
                out.write_all(&buf)?;
                match buf.split_first() {
                    Some((0, rest)) => visit(Cid::new(rest.to_vec())),
                    _ => {
                        return Err(Error::Invalid("cid", "expected multibase identity prefix"))
                    }
                }
            } else {
                walk_value(&mut *r, &mut *out, visit, depth + 1)?;
            }
        }
    }

    Ok(())
}

fn copy_exact<R: Read, W: Write>(r: &mut R, out: &mut W, len: u64) -> Result<(), Error> {
    let copied = io::copy(&mut (&mut *r).take(len), out)?;
    if copied != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(())
}
