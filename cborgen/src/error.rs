//! Errors reported by encoders and decoders.

use crate::header::MajorType;
use std::io;
use thiserror::Error;

/// Errors that can occur while encoding or decoding canonical CBOR.
///
/// Errors raised while decoding a field carry the `Record.field` path the
/// generated code was working on when the input went wrong.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying byte sink or source failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A header carried the wrong major type for the value being decoded.
    #[error("{0}: expected {1}, found {2}")]
    WrongType(&'static str, MajorType, MajorType),

    /// A frame or fixed-size item carried the wrong length.
    #[error("{0}: expected length {1}, found {2}")]
    WrongLength(&'static str, u64, u64),

    /// A length exceeded the applicable ceiling.
    #[error("{0}: length {1} exceeds maximum {2}")]
    TooLong(&'static str, u64, u64),

    /// An integer in the input cannot be represented in the target width.
    #[error("{0}: integer overflow")]
    Overflow(&'static str),

    /// A text string held invalid UTF-8.
    #[error("{0}: invalid utf-8 in text string")]
    InvalidUtf8(&'static str),

    /// A header was not in canonical shortest form.
    #[error("header is not canonical")]
    NotCanonical,

    /// Trailing bytes remained after decoding a complete value.
    #[error("{0} trailing bytes after value")]
    ExtraData(usize),

    /// Malformed input that fits no other variant.
    #[error("{0}: {1}")]
    Invalid(&'static str, &'static str),
}
