//! Shared read helpers for emitted decoders.

use crate::header::{read_header_buf, MajorType};
use crate::Error;
use std::io::{self, Read};

/// Reads exactly `len` bytes into a fresh vector.
///
/// The pre-allocation is capped so a hostile length prefix cannot force a
/// large allocation before any data actually arrives. Callers are expected
/// to have validated `len` against the applicable ceiling already.
pub fn read_byte_vec(r: &mut impl Read, len: usize) -> Result<Vec<u8>, Error> {
    const PREALLOC: usize = 0x1000;

    let mut buf = Vec::with_capacity(len.min(PREALLOC));
    let read = (&mut *r).take(len as u64).read_to_end(&mut buf)?;
    if read != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

/// Reads a complete text string: header, bounds check, then payload.
pub fn read_string_buf(
    r: &mut impl Read,
    scratch: &mut [u8; 8],
    max_len: usize,
) -> Result<String, Error> {
    let (major, len) = read_header_buf(r, scratch)?;
    if major != MajorType::TextString {
        return Err(Error::WrongType(
            "text string",
            MajorType::TextString,
            major,
        ));
    }
    if len > max_len as u64 {
        return Err(Error::TooLong("text string", len, max_len as u64));
    }
    let buf = read_byte_vec(r, len as usize)?;
    String::from_utf8(buf).map_err(|_| Error::InvalidUtf8("text string"))
}
