//! Opaque content identifiers and their dedicated codec.
//!
//! On the wire a CID is a tag(42) item wrapping a byte string whose first
//! byte is the multibase identity prefix `0x00`. The prefix is not part of
//! the in-memory value.

use crate::codec::{MarshalCbor, UnmarshalCbor};
use crate::header::{read_header_buf, write_major_type_header_buf, MajorType};
use crate::util::read_byte_vec;
use crate::{Error, MAX_CID_LENGTH};
use bytes::Bytes;
use std::io::{Read, Write};

/// The tag number marking a content identifier.
pub(crate) const CID_TAG: u64 = 42;

/// An opaque content identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Cid(Bytes);

impl Cid {
    /// Wraps raw CID bytes (without the multibase prefix).
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The raw CID bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Writes `cid` through the scratch buffer.
pub fn write_cid_buf(scratch: &mut [u8; 9], w: &mut impl Write, cid: &Cid) -> Result<(), Error> {
    let payload_len = cid.0.len() + 1;
    if payload_len > MAX_CID_LENGTH {
        return Err(Error::TooLong(
            "cid",
            payload_len as u64,
            MAX_CID_LENGTH as u64,
        ));
    }
    write_major_type_header_buf(scratch, w, MajorType::Tag, CID_TAG)?;
    write_major_type_header_buf(scratch, w, MajorType::ByteString, payload_len as u64)?;
    w.write_all(&[0u8])?;
    w.write_all(&cid.0)?;
    Ok(())
}

/// Reads one CID, validating the tag and the multibase prefix.
pub fn read_cid(r: &mut impl Read) -> Result<Cid, Error> {
    let mut scratch = [0u8; 8];
    let (major, tag) = read_header_buf(r, &mut scratch)?;
    if major != MajorType::Tag {
        return Err(Error::WrongType("cid", MajorType::Tag, major));
    }
    if tag != CID_TAG {
        return Err(Error::Invalid("cid", "expected tag 42"));
    }

    let (major, len) = read_header_buf(r, &mut scratch)?;
    if major != MajorType::ByteString {
        return Err(Error::WrongType("cid", MajorType::ByteString, major));
    }
    if len > MAX_CID_LENGTH as u64 {
        return Err(Error::TooLong("cid", len, MAX_CID_LENGTH as u64));
    }

    let buf = read_byte_vec(r, len as usize)?;
    match buf.split_first() {
        Some((0, rest)) => Ok(Cid::new(rest.to_vec())),
        Some(_) => Err(Error::Invalid("cid", "expected multibase identity prefix")),
        None => Err(Error::Invalid("cid", "empty cid payload")),
    }
}

impl MarshalCbor for Cid {
    fn marshal_cbor(&self, w: &mut impl Write) -> Result<(), Error> {
        let mut scratch = [0u8; 9];
        write_cid_buf(&mut scratch, w, self)
    }
}

impl UnmarshalCbor for Cid {
    fn unmarshal_cbor(r: &mut impl Read) -> Result<Self, Error> {
        read_cid(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_slice, to_vec};

    fn from_hex(s: &str) -> Vec<u8> {
        assert!(s.len() % 2 == 0);
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_known_vector() {
        // tag(42), byte string of 37 bytes: identity prefix then a raw cid
        let encoded = from_hex(
            "d82a582500015512209d8453505bdc6f269678e16b3e56c2a2948a41f2c792617cc9611ed363c95b63",
        );
        let cid: Cid = from_slice(&encoded).unwrap();
        assert_eq!(cid.as_bytes().len(), 36);
        assert_eq!(&cid.as_bytes()[..4], &[0x01, 0x55, 0x12, 0x20][..]);
        assert_eq!(to_vec(&cid).unwrap(), encoded);
    }

    #[test]
    fn test_missing_prefix() {
        let encoded = [0xd8, 0x2a, 0x42, 0x01, 0x02];
        assert!(matches!(
            from_slice::<Cid>(&encoded),
            Err(Error::Invalid("cid", _))
        ));
    }

    #[test]
    fn test_wrong_tag() {
        let encoded = [0xd8, 0x29, 0x42, 0x00, 0x01];
        assert!(matches!(
            from_slice::<Cid>(&encoded),
            Err(Error::Invalid("cid", "expected tag 42"))
        ));
    }

    #[test]
    fn test_too_long() {
        let mut out = Vec::new();
        let mut scratch = [0u8; 9];
        let cid = Cid::new(vec![0xaa; MAX_CID_LENGTH]);
        assert!(matches!(
            write_cid_buf(&mut scratch, &mut out, &cid),
            Err(Error::TooLong("cid", _, _))
        ));
    }
}
