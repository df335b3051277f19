//! Codec traits implemented by emitted encoders and decoders.

use crate::Error;
use std::io::{Read, Write};

/// A value that can write its canonical encoding to a byte sink.
pub trait MarshalCbor {
    /// Writes the encoding of `self` to `w`.
    ///
    /// A failed write may leave partial output on the sink.
    fn marshal_cbor(&self, w: &mut impl Write) -> Result<(), Error>;
}

/// A value that can be parsed from its canonical encoding.
pub trait UnmarshalCbor: Sized {
    /// Reads one value from `r`.
    fn unmarshal_cbor(r: &mut impl Read) -> Result<Self, Error>;
}

/// Encodes `value` into a fresh vector.
pub fn to_vec<T: MarshalCbor>(value: &T) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    value.marshal_cbor(&mut out)?;
    Ok(out)
}

/// Decodes one value from `bytes`, rejecting trailing data.
pub fn from_slice<T: UnmarshalCbor>(bytes: &[u8]) -> Result<T, Error> {
    let mut reader = bytes;
    let value = T::unmarshal_cbor(&mut reader)?;
    if !reader.is_empty() {
        return Err(Error::ExtraData(reader.len()));
    }
    Ok(value)
}
