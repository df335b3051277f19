//! Derive macros for canonical CBOR record codecs.
//!
//! Both derives reduce the annotated struct to a normalized field schema,
//! then emit a matched encoder/decoder pair
//! ([`MarshalCbor`]/[`UnmarshalCbor`] impls) that serialize the record
//! without any runtime type introspection. The two differ only in framing:
//!
//! - [`CborTuple`](macro@CborTuple) frames the record as a positional array.
//!   Field order is part of the wire contract and the decoder rejects any
//!   frame whose length is not the compiled-in field count.
//! - [`CborMap`](macro@CborMap) frames the record as a map keyed by field
//!   names. The decoder accepts keys in any order and silently skips unknown
//!   ones, so adding fields is forward and backward compatible.
//!
//! [`MarshalCbor`]: https://docs.rs/cborgen
//! [`UnmarshalCbor`]: https://docs.rs/cborgen

mod decode;
mod encode;
mod schema;

use proc_macro::TokenStream;
use schema::Representation;
use syn::{parse_macro_input, DeriveInput};

/// Derives tuple-representation codecs for a struct.
///
/// The record is framed as an array whose length equals the field count;
/// fields are serialized positionally in declaration order. Reordering,
/// adding, or removing fields is a breaking wire change.
///
/// # Field Attributes
///
/// `#[cborgen(maxlen = N)]` overrides the length ceiling for a text, byte
/// string, or sequence field. (`#[cborgen(rename = "…")]` is accepted but
/// only affects the named-map representation.)
///
/// # Example
///
/// ```
/// use cborgen::{from_slice, to_vec};
/// use cborgen_derive::CborTuple;
///
/// #[derive(Debug, PartialEq, CborTuple)]
/// struct Block {
///     pub parent: Option<u64>,
///     pub payload: Vec<u8>,
/// }
///
/// let block = Block { parent: None, payload: vec![1, 2, 3] };
/// let bytes = to_vec(&block).unwrap();
/// assert_eq!(bytes, [0x82, 0xf6, 0x43, 0x01, 0x02, 0x03]);
/// assert_eq!(from_slice::<Block>(&bytes).unwrap(), block);
/// ```
#[proc_macro_derive(CborTuple, attributes(cborgen))]
pub fn derive_cbor_tuple(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Representation::Tuple)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives named-map-representation codecs for a struct.
///
/// The record is framed as a map of field-name keys, emitted in ascending
/// key order so repeated encoding of the same value is byte-identical. The
/// decoder accepts entries in any order, skips unknown keys, and leaves
/// absent fields at their `Default` values, so every field type must
/// implement `Default`.
///
/// # Field Attributes
///
/// - `#[cborgen(rename = "…")]` overrides the wire key.
/// - `#[cborgen(maxlen = N)]` overrides the length ceiling for a text, byte
///   string, or sequence field.
///
/// # Example
///
/// ```
/// use cborgen::{from_slice, to_vec};
/// use cborgen_derive::CborMap;
///
/// #[derive(Debug, Default, PartialEq, CborMap)]
/// struct Config {
///     #[cborgen(rename = "n")]
///     pub name: String,
/// }
///
/// let config = Config { name: "x".into() };
/// let bytes = to_vec(&config).unwrap();
/// assert_eq!(bytes, [0xa1, 0x61, b'n', 0x61, b'x']);
/// assert_eq!(from_slice::<Config>(&bytes).unwrap(), config);
/// ```
#[proc_macro_derive(CborMap, attributes(cborgen))]
pub fn derive_cbor_map(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input, Representation::Map)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput, repr: Representation) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "generic records are not supported",
        ));
    }
    let schema = schema::parse(input)?;
    let marshal = encode::expand_marshal(&schema, repr)?;
    let unmarshal = decode::expand_unmarshal(&schema, repr)?;
    Ok(quote::quote! {
        #marshal
        #unmarshal
    })
}
