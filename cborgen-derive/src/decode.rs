//! Decode-side emission: tuple and named-map frame walks plus per-shape
//! read sequences.

use crate::schema::{FieldSchema, FieldShape, MapKind, NormalizedSchema, Representation};
use proc_macro2::{Literal, Span, TokenStream};
use quote::quote;

/// Emits the `UnmarshalCbor` impl for `schema` under `repr`.
pub fn expand_unmarshal(
    schema: &NormalizedSchema,
    repr: Representation,
) -> syn::Result<TokenStream> {
    match repr {
        Representation::Tuple => expand_tuple(schema),
        Representation::Map => expand_map(schema),
    }
}

/// Tuple form: verify the frame length, then read fields positionally.
fn expand_tuple(schema: &NormalizedSchema) -> syn::Result<TokenStream> {
    let name = &schema.name;
    let name_str = name.to_string();
    let name_str = name_str.as_str();
    let count = Literal::u64_suffixed(schema.fields.len() as u64);

    let mut reads = TokenStream::new();
    for field in &schema.fields {
        let ident = &field.ident;
        let ty = &field.ty;
        let expr = decode_field(schema, field)?;
        reads.extend(quote! {
            let #ident: #ty = #expr;
        });
    }

    let construct = construct_tokens(schema);

    Ok(quote! {
        impl ::cborgen::UnmarshalCbor for #name {
            fn unmarshal_cbor(
                r: &mut impl ::std::io::Read,
            ) -> ::std::result::Result<Self, ::cborgen::Error> {
                let mut br = ::cborgen::Peeker::new(r);
                let mut scratch = [0u8; 8];

                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::Array {
                    return Err(::cborgen::Error::WrongType(
                        #name_str,
                        ::cborgen::MajorType::Array,
                        major,
                    ));
                }
                if extra != #count {
                    return Err(::cborgen::Error::WrongLength(#name_str, #count, extra));
                }

                #reads

                Ok(#construct)
            }
        }
    })
}

/// Named-map form: default-initialize every field, then dispatch on wire
/// keys for as many entries as the frame declares. Unknown keys are skipped
/// without interpretation; absent fields keep their defaults.
fn expand_map(schema: &NormalizedSchema) -> syn::Result<TokenStream> {
    let name = &schema.name;
    let name_str = name.to_string();
    let name_str = name_str.as_str();

    let mut inits = TokenStream::new();
    let mut arms = TokenStream::new();
    for field in &schema.fields {
        let ident = &field.ident;
        let ty = &field.ty;
        let key = field.wire_key.as_str();
        let expr = decode_field(schema, field)?;
        inits.extend(quote! {
            let mut #ident: #ty = ::std::default::Default::default();
        });
        arms.extend(quote! {
            #key => {
                #ident = #expr;
            }
        });
    }

    let construct = construct_tokens(schema);

    Ok(quote! {
        impl ::cborgen::UnmarshalCbor for #name {
            fn unmarshal_cbor(
                r: &mut impl ::std::io::Read,
            ) -> ::std::result::Result<Self, ::cborgen::Error> {
                let mut br = ::cborgen::Peeker::new(r);
                let mut scratch = [0u8; 8];

                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::Map {
                    return Err(::cborgen::Error::WrongType(
                        #name_str,
                        ::cborgen::MajorType::Map,
                        major,
                    ));
                }
                if extra > ::cborgen::MAX_LENGTH as u64 {
                    return Err(::cborgen::Error::TooLong(
                        #name_str,
                        extra,
                        ::cborgen::MAX_LENGTH as u64,
                    ));
                }

                #inits

                for _ in 0..extra {
                    let key = ::cborgen::read_string_buf(
                        &mut br,
                        &mut scratch,
                        ::cborgen::MAX_LENGTH,
                    )?;
                    match key.as_str() {
                        #arms
                        _ => ::cborgen::scan_for_links(&mut br, |_| {})?,
                    }
                }

                Ok(#construct)
            }
        }
    })
}

/// The `Self { … }` (or bare `Self`) constructor, restoring skipped private
/// fields to their defaults.
fn construct_tokens(schema: &NormalizedSchema) -> TokenStream {
    if schema.unit {
        return quote!(Self);
    }
    let idents = schema.fields.iter().map(|f| &f.ident);
    let skipped = schema.skipped.iter();
    quote! {
        Self {
            #(#idents,)*
            #(#skipped: ::std::default::Default::default(),)*
        }
    }
}

/// Emits the expression producing one field's declared type.
fn decode_field(schema: &NormalizedSchema, field: &FieldSchema) -> syn::Result<TokenStream> {
    let ctx = format!("{}.{}", schema.name, field.ident);
    let ctx = ctx.as_str();

    if !field.optional {
        let mut expr = decode_shape(&field.shape, ctx, field.max_len, 0)?;
        if field.boxed {
            expr = quote!(::std::boxed::Box::new(#expr));
        }
        return Ok(expr);
    }

    match &field.shape {
        // Present-or-null shapes peek one byte to decide.
        FieldShape::U64 | FieldShape::Record(_) | FieldShape::Cid => {
            let mut inner = decode_shape(&field.shape, ctx, field.max_len, 0)?;
            if field.boxed {
                inner = quote!(::std::boxed::Box::new(#inner));
            }
            Ok(quote! {
                {
                    let byte = br.read_byte()?;
                    if byte == ::cborgen::CBOR_NULL[0] {
                        ::std::option::Option::None
                    } else {
                        br.unread_byte(byte);
                        ::std::option::Option::Some(#inner)
                    }
                }
            })
        }
        // Bignums and deferred fragments carry their own absence encoding,
        // so the decoded value is always present.
        FieldShape::BigInt | FieldShape::Deferred => {
            let inner = decode_shape(&field.shape, ctx, field.max_len, 0)?;
            Ok(quote! { ::std::option::Option::Some(#inner) })
        }
        _ => Err(syn::Error::new(
            Span::call_site(),
            "internal error: optional shape survived classification",
        )),
    }
}

/// Emits the expression reading one non-optional shape.
fn decode_shape(
    shape: &FieldShape,
    ctx: &str,
    max_len: Option<u64>,
    depth: usize,
) -> syn::Result<TokenStream> {
    match shape {
        FieldShape::Text => {
            let max = max_tokens(max_len, quote!(::cborgen::MAX_LENGTH));
            Ok(quote! {
                ::cborgen::read_string_buf(&mut br, &mut scratch, #max)?
            })
        }
        FieldShape::U64 => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::UnsignedInt {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::UnsignedInt,
                        major,
                    ));
                }
                extra
            }
        }),
        FieldShape::U8 => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::UnsignedInt {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::UnsignedInt,
                        major,
                    ));
                }
                if extra > u8::MAX as u64 {
                    return Err(::cborgen::Error::Overflow(#ctx));
                }
                extra as u8
            }
        }),
        FieldShape::I64 => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                match major {
                    ::cborgen::MajorType::UnsignedInt => {
                        if extra > i64::MAX as u64 {
                            return Err(::cborgen::Error::Overflow(#ctx));
                        }
                        extra as i64
                    }
                    ::cborgen::MajorType::NegativeInt => {
                        if extra > i64::MAX as u64 {
                            return Err(::cborgen::Error::Overflow(#ctx));
                        }
                        -1 - (extra as i64)
                    }
                    other => {
                        return Err(::cborgen::Error::WrongType(
                            #ctx,
                            ::cborgen::MajorType::UnsignedInt,
                            other,
                        ));
                    }
                }
            }
        }),
        FieldShape::Bool => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::Other {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::Other,
                        major,
                    ));
                }
                match extra {
                    20u64 => false,
                    21u64 => true,
                    _ => {
                        return Err(::cborgen::Error::Invalid(
                            #ctx,
                            "booleans are major type 7, value 20 or 21",
                        ));
                    }
                }
            }
        }),
        FieldShape::Bytes => {
            let max = max_tokens(max_len, quote!(::cborgen::BYTE_ARRAY_MAX_LEN));
            Ok(quote! {
                {
                    let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                    if major != ::cborgen::MajorType::ByteString {
                        return Err(::cborgen::Error::WrongType(
                            #ctx,
                            ::cborgen::MajorType::ByteString,
                            major,
                        ));
                    }
                    if extra > #max as u64 {
                        return Err(::cborgen::Error::TooLong(#ctx, extra, #max as u64));
                    }
                    ::cborgen::read_byte_vec(&mut br, extra as usize)?
                }
            })
        }
        FieldShape::FixedBytes(len) => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::ByteString {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::ByteString,
                        major,
                    ));
                }
                if extra != (#len) as u64 {
                    return Err(::cborgen::Error::WrongLength(#ctx, (#len) as u64, extra));
                }
                let mut buf = [0u8; #len];
                ::std::io::Read::read_exact(&mut br, &mut buf)?;
                buf
            }
        }),
        FieldShape::Sequence(elem) => {
            let max = max_tokens(max_len, quote!(::cborgen::MAX_LENGTH));
            let elem_expr = decode_shape(elem, ctx, None, depth + 1)?;
            Ok(quote! {
                {
                    let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                    if major != ::cborgen::MajorType::Array {
                        return Err(::cborgen::Error::WrongType(
                            #ctx,
                            ::cborgen::MajorType::Array,
                            major,
                        ));
                    }
                    if extra > #max as u64 {
                        return Err(::cborgen::Error::TooLong(#ctx, extra, #max as u64));
                    }
                    let mut items = ::std::vec::Vec::with_capacity(extra as usize);
                    for _ in 0..extra {
                        items.push(#elem_expr);
                    }
                    items
                }
            })
        }
        FieldShape::FixedSequence(len, elem) => {
            let elem_expr = decode_shape(elem, ctx, None, depth + 1)?;
            Ok(quote! {
                {
                    let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                    if major != ::cborgen::MajorType::Array {
                        return Err(::cborgen::Error::WrongType(
                            #ctx,
                            ::cborgen::MajorType::Array,
                            major,
                        ));
                    }
                    if extra != (#len) as u64 {
                        return Err(::cborgen::Error::WrongLength(#ctx, (#len) as u64, extra));
                    }
                    let mut items = ::std::vec::Vec::with_capacity(extra as usize);
                    for _ in 0..extra {
                        items.push(#elem_expr);
                    }
                    match <[_; #len] as ::std::convert::TryFrom<::std::vec::Vec<_>>>::try_from(
                        items,
                    ) {
                        Ok(array) => array,
                        Err(_) => {
                            return Err(::cborgen::Error::WrongLength(
                                #ctx,
                                (#len) as u64,
                                extra,
                            ));
                        }
                    }
                }
            })
        }
        FieldShape::Map {
            kind,
            value,
            value_optional,
        } => {
            let new_map = match kind {
                MapKind::BTree => quote!(::std::collections::BTreeMap::new()),
                MapKind::Hash => quote!(::std::collections::HashMap::with_capacity(extra as usize)),
            };
            let value_expr = decode_map_value(value, *value_optional, ctx)?;
            Ok(quote! {
                {
                    let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                    if major != ::cborgen::MajorType::Map {
                        return Err(::cborgen::Error::WrongType(
                            #ctx,
                            ::cborgen::MajorType::Map,
                            major,
                        ));
                    }
                    if extra > 4096u64 {
                        return Err(::cborgen::Error::TooLong(#ctx, extra, 4096u64));
                    }
                    let mut entries = #new_map;
                    for _ in 0..extra {
                        let entry_key = ::cborgen::read_string_buf(
                            &mut br,
                            &mut scratch,
                            ::cborgen::MAX_LENGTH,
                        )?;
                        let entry_value = #value_expr;
                        entries.insert(entry_key, entry_value);
                    }
                    entries
                }
            })
        }
        FieldShape::Record(ty) => Ok(quote! {
            <#ty as ::cborgen::UnmarshalCbor>::unmarshal_cbor(&mut br)?
        }),
        FieldShape::BigInt => Ok(quote! {
            {
                let (major, extra) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::Tag {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::Tag,
                        major,
                    ));
                }
                if extra != 2u64 {
                    return Err(::cborgen::Error::Invalid(#ctx, "bignums carry tag 2"));
                }
                let (major, len) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::ByteString {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::ByteString,
                        major,
                    ));
                }
                if len > 256u64 {
                    return Err(::cborgen::Error::TooLong(#ctx, len, 256u64));
                }
                let magnitude = ::cborgen::read_byte_vec(&mut br, len as usize)?;
                ::cborgen::BigUint::from_bytes_be(&magnitude)
            }
        }),
        FieldShape::Cid => Ok(quote! {
            ::cborgen::read_cid(&mut br)?
        }),
        FieldShape::Deferred => Ok(quote! {
            <::cborgen::Deferred as ::cborgen::UnmarshalCbor>::unmarshal_cbor(&mut br)?
        }),
    }
}

/// Emits the value expression inside a map-field loop.
fn decode_map_value(
    value: &FieldShape,
    optional: bool,
    ctx: &str,
) -> syn::Result<TokenStream> {
    match (value, optional) {
        (FieldShape::Record(ty), false) => Ok(quote! {
            <#ty as ::cborgen::UnmarshalCbor>::unmarshal_cbor(&mut br)?
        }),
        (FieldShape::Record(ty), true) => Ok(quote! {
            {
                let byte = br.read_byte()?;
                if byte == ::cborgen::CBOR_NULL[0] {
                    ::std::option::Option::None
                } else {
                    br.unread_byte(byte);
                    ::std::option::Option::Some(
                        <#ty as ::cborgen::UnmarshalCbor>::unmarshal_cbor(&mut br)?,
                    )
                }
            }
        }),
        (FieldShape::U64, false) => Ok(quote! {
            {
                let (major, value) = ::cborgen::read_header_buf(&mut br, &mut scratch)?;
                if major != ::cborgen::MajorType::UnsignedInt {
                    return Err(::cborgen::Error::WrongType(
                        #ctx,
                        ::cborgen::MajorType::UnsignedInt,
                        major,
                    ));
                }
                value
            }
        }),
        _ => Err(syn::Error::new(
            Span::call_site(),
            "internal error: map value shape survived classification",
        )),
    }
}

/// The ceiling expression for a length check: the per-field override if one
/// was given, otherwise the shared runtime constant.
fn max_tokens(max_len: Option<u64>, default: TokenStream) -> TokenStream {
    match max_len {
        Some(n) => {
            let lit = Literal::usize_suffixed(n as usize);
            quote!(#lit)
        }
        None => default,
    }
}
