//! One-byte look-ahead over a byte source.

use std::io::{self, Read};

/// Adapts an [`io::Read`] into a reader with single-byte look-ahead, as
/// required for optional-field null detection.
///
/// The look-ahead slot holds at most one byte. Generated decoders drain the
/// slot before returning, so wrapping an already-wrapped reader is sound.
#[derive(Debug)]
pub struct Peeker<R> {
    inner: R,
    slot: Option<u8>,
}

impl<R: Read> Peeker<R> {
    /// Wraps `inner` with an empty look-ahead slot.
    pub fn new(inner: R) -> Self {
        Self { inner, slot: None }
    }

    /// Reads a single byte.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        if let Some(byte) = self.slot.take() {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Returns `byte` to the stream so the next read observes it again.
    ///
    /// The slot must be empty: a byte may only be unread directly after it
    /// was read.
    pub fn unread_byte(&mut self, byte: u8) {
        debug_assert!(self.slot.is_none());
        self.slot = Some(byte);
    }
}

impl<R: Read> Read for Peeker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.slot.take() {
            buf[0] = byte;
            return Ok(1);
        }
        self.inner.read(buf)
    }
}
