//! Runtime support for generated canonical CBOR record codecs.
//!
//! # Overview
//!
//! The companion derive crate turns a record type into a pair of
//! reflection-free routines: an encoder that writes the record as canonical
//! CBOR and a decoder that parses it back. This crate is the runtime those
//! routines link against:
//!
//! - Canonical header synthesis and parsing through small scratch buffers
//! - The [`Peeker`] look-ahead reader used for optional-field null detection
//! - The opaque [`Cid`] handle and its tag(42) codec
//! - [`Deferred`] fragments and [`scan_for_links`] structural skipping
//! - The [`MarshalCbor`] / [`UnmarshalCbor`] traits and the
//!   [`to_vec`] / [`from_slice`] conveniences
//!
//! Encoding is deterministic: a given value always produces byte-identical
//! output, and decoders reject input whose headers are not in shortest form.
//!
//! # Example
//!
//! ```
//! use cborgen::{from_slice, to_vec};
//! use cborgen_derive::CborTuple;
//!
//! #[derive(Debug, PartialEq, CborTuple)]
//! struct Entry {
//!     pub name: String,
//!     pub count: u64,
//! }
//!
//! let entry = Entry { name: "cat".into(), count: 7 };
//! let bytes = to_vec(&entry).unwrap();
//! assert_eq!(bytes, [0x82, 0x63, b'c', b'a', b't', 0x07]);
//! assert_eq!(from_slice::<Entry>(&bytes).unwrap(), entry);
//! ```

pub mod cid;
pub mod codec;
pub mod deferred;
pub mod error;
pub mod header;
pub mod peeker;
pub mod util;

// Re-export main types and helpers
pub use cid::{read_cid, write_cid_buf, Cid};
pub use codec::{from_slice, to_vec, MarshalCbor, UnmarshalCbor};
pub use deferred::{scan_for_links, Deferred};
pub use error::Error;
pub use header::{
    read_header_buf, write_bool, write_major_type_header_buf, MajorType, CBOR_FALSE, CBOR_NULL,
    CBOR_TRUE,
};
pub use peeker::Peeker;
pub use util::{read_byte_vec, read_string_buf};

/// Re-export for emitted code that carries arbitrary-precision fields.
pub use num_bigint::BigUint;

/// Maximum element count for sequences and byte length for text strings.
pub const MAX_LENGTH: usize = 8192;

/// Maximum byte length for byte strings, absent a per-field override.
pub const BYTE_ARRAY_MAX_LEN: usize = 2 << 20;

/// Maximum encoded length of a CID payload, including the multibase prefix.
pub const MAX_CID_LENGTH: usize = 100;

/// Maximum nesting depth accepted when walking a value structurally.
pub const MAX_DEPTH: usize = 1024;
