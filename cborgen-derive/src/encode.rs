//! Encode-side emission: each field shape becomes an inline write sequence
//! against the sink and the scratch buffer.

use crate::schema::{FieldSchema, FieldShape, MapKind, NormalizedSchema, Representation};
use proc_macro2::{Literal, Span, TokenStream};
use quote::{format_ident, quote};

/// Emits the `MarshalCbor` impl for `schema` under `repr`.
pub fn expand_marshal(
    schema: &NormalizedSchema,
    repr: Representation,
) -> syn::Result<TokenStream> {
    let name = &schema.name;
    let count = schema.fields.len() as u64;

    // The frame header is constant for a given record, so it is precomputed
    // here and emitted as a byte literal.
    let header = match repr {
        Representation::Tuple => frame_header(4, count),
        Representation::Map => frame_header(5, count),
    };

    let mut fields: Vec<&FieldSchema> = schema.fields.iter().collect();
    if repr == Representation::Map {
        fields.sort_by(|a, b| a.wire_key.as_bytes().cmp(b.wire_key.as_bytes()));
    }

    let mut body = TokenStream::new();
    for field in &fields {
        if repr == Representation::Map {
            body.extend(encode_wire_key(&field.wire_key));
        }
        body.extend(encode_field(schema, field)?);
    }

    let needs_scratch = match repr {
        Representation::Tuple => schema.needs_scratch(),
        // The map form writes a text header per wire key.
        Representation::Map => !schema.fields.is_empty(),
    };
    let scratch = if needs_scratch {
        quote! { let mut scratch = [0u8; 9]; }
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        impl ::cborgen::MarshalCbor for #name {
            fn marshal_cbor(
                &self,
                w: &mut impl ::std::io::Write,
            ) -> ::std::result::Result<(), ::cborgen::Error> {
                w.write_all(&[#(#header),*])?;
                #scratch
                #body
                Ok(())
            }
        }
    })
}

/// Canonical header bytes for a frame of `len` items, computed at expansion
/// time. Mirrors the runtime writer's shortest-form rules.
fn frame_header(major: u8, len: u64) -> Vec<u8> {
    let high = major << 5;
    let mut out = Vec::with_capacity(9);
    if len < 24 {
        out.push(high | len as u8);
    } else if len <= u8::MAX as u64 {
        out.push(high | 24);
        out.push(len as u8);
    } else if len <= u16::MAX as u64 {
        out.push(high | 25);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else if len <= u32::MAX as u64 {
        out.push(high | 26);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    } else {
        out.push(high | 27);
        out.extend_from_slice(&len.to_be_bytes());
    }
    out
}

/// Emits the constant wire-key text item preceding a map-form field.
fn encode_wire_key(key: &str) -> TokenStream {
    let len = key.len() as u64;
    let bytes = syn::LitByteStr::new(key.as_bytes(), Span::call_site());
    quote! {
        ::cborgen::write_major_type_header_buf(
            &mut scratch,
            w,
            ::cborgen::MajorType::TextString,
            #len,
        )?;
        w.write_all(#bytes)?;
    }
}

fn encode_field(schema: &NormalizedSchema, field: &FieldSchema) -> syn::Result<TokenStream> {
    let ident = &field.ident;
    let access = quote!(self.#ident);
    let ctx = format!("{}.{}", schema.name, ident);
    let ctx = ctx.as_str();

    if !field.optional {
        return encode_shape(&field.shape, &access, ctx, field.max_len, 0);
    }

    // Absent optional fields encode as the single null byte.
    match &field.shape {
        FieldShape::U64 => Ok(quote! {
            match &#access {
                None => w.write_all(&::cborgen::CBOR_NULL)?,
                Some(v0) => ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::UnsignedInt,
                    *v0,
                )?,
            }
        }),
        FieldShape::Record(ty) => Ok(quote! {
            match &#access {
                None => w.write_all(&::cborgen::CBOR_NULL)?,
                Some(v0) => <#ty as ::cborgen::MarshalCbor>::marshal_cbor(v0, w)?,
            }
        }),
        FieldShape::Cid => Ok(quote! {
            match &#access {
                None => w.write_all(&::cborgen::CBOR_NULL)?,
                Some(v0) => ::cborgen::write_cid_buf(&mut scratch, w, v0)?,
            }
        }),
        FieldShape::Deferred => Ok(quote! {
            match &#access {
                None => w.write_all(&::cborgen::CBOR_NULL)?,
                Some(v0) => <::cborgen::Deferred as ::cborgen::MarshalCbor>::marshal_cbor(v0, w)?,
            }
        }),
        // An absent bignum encodes as an empty magnitude under the tag.
        FieldShape::BigInt => Ok(quote! {
            {
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::Tag,
                    2u64,
                )?;
                let mut magnitude = match &#access {
                    Some(v0) => v0.to_bytes_be(),
                    None => ::std::vec::Vec::new(),
                };
                if magnitude == [0u8] {
                    magnitude.clear();
                }
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::ByteString,
                    magnitude.len() as u64,
                )?;
                w.write_all(&magnitude)?;
            }
        }),
        _ => Err(syn::Error::new(
            Span::call_site(),
            "internal error: optional shape survived classification",
        )),
    }
}

/// Emits the write sequence for one non-optional shape.
///
/// `access` is an expression of the shape's value type; integer shapes
/// expect a value, everything else works through a reference.
fn encode_shape(
    shape: &FieldShape,
    access: &TokenStream,
    ctx: &str,
    max_len: Option<u64>,
    depth: usize,
) -> syn::Result<TokenStream> {
    match shape {
        FieldShape::Text => {
            let max = max_tokens(max_len, quote!(::cborgen::MAX_LENGTH));
            Ok(quote! {
                if #access.len() > #max {
                    return Err(::cborgen::Error::TooLong(
                        #ctx,
                        #access.len() as u64,
                        #max as u64,
                    ));
                }
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::TextString,
                    #access.len() as u64,
                )?;
                w.write_all(#access.as_bytes())?;
            })
        }
        FieldShape::U64 => Ok(quote! {
            ::cborgen::write_major_type_header_buf(
                &mut scratch,
                w,
                ::cborgen::MajorType::UnsignedInt,
                #access,
            )?;
        }),
        FieldShape::U8 => Ok(quote! {
            ::cborgen::write_major_type_header_buf(
                &mut scratch,
                w,
                ::cborgen::MajorType::UnsignedInt,
                u64::from(#access),
            )?;
        }),
        FieldShape::I64 => Ok(quote! {
            if #access >= 0 {
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::UnsignedInt,
                    #access as u64,
                )?;
            } else {
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::NegativeInt,
                    (-(#access + 1)) as u64,
                )?;
            }
        }),
        FieldShape::Bool => Ok(quote! {
            ::cborgen::write_bool(w, #access)?;
        }),
        FieldShape::Bytes => {
            let max = max_tokens(max_len, quote!(::cborgen::BYTE_ARRAY_MAX_LEN));
            Ok(quote! {
                if #access.len() > #max {
                    return Err(::cborgen::Error::TooLong(
                        #ctx,
                        #access.len() as u64,
                        #max as u64,
                    ));
                }
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::ByteString,
                    #access.len() as u64,
                )?;
                w.write_all(&#access)?;
            })
        }
        FieldShape::FixedBytes(_) => Ok(quote! {
            ::cborgen::write_major_type_header_buf(
                &mut scratch,
                w,
                ::cborgen::MajorType::ByteString,
                #access.len() as u64,
            )?;
            w.write_all(&#access)?;
        }),
        FieldShape::Sequence(elem) => {
            let max = max_tokens(max_len, quote!(::cborgen::MAX_LENGTH));
            let body = encode_elements(elem, access, ctx, depth)?;
            Ok(quote! {
                if #access.len() > #max {
                    return Err(::cborgen::Error::TooLong(
                        #ctx,
                        #access.len() as u64,
                        #max as u64,
                    ));
                }
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::Array,
                    #access.len() as u64,
                )?;
                #body
            })
        }
        FieldShape::FixedSequence(_, elem) => {
            let body = encode_elements(elem, access, ctx, depth)?;
            Ok(quote! {
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::Array,
                    #access.len() as u64,
                )?;
                #body
            })
        }
        FieldShape::Map {
            kind,
            value,
            value_optional,
        } => {
            let value_code = encode_map_value(value, *value_optional)?;
            let entries = match kind {
                // BTreeMap keys are already in ascending byte order.
                MapKind::BTree => quote! {
                    let entries = #access.iter();
                },
                MapKind::Hash => quote! {
                    let mut entries: ::std::vec::Vec<_> = #access.iter().collect();
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                },
            };
            Ok(quote! {
                {
                    if #access.len() > 4096usize {
                        return Err(::cborgen::Error::TooLong(
                            #ctx,
                            #access.len() as u64,
                            4096u64,
                        ));
                    }
                    ::cborgen::write_major_type_header_buf(
                        &mut scratch,
                        w,
                        ::cborgen::MajorType::Map,
                        #access.len() as u64,
                    )?;
                    #entries
                    for (k, v) in entries {
                        if k.len() > ::cborgen::MAX_LENGTH {
                            return Err(::cborgen::Error::TooLong(
                                #ctx,
                                k.len() as u64,
                                ::cborgen::MAX_LENGTH as u64,
                            ));
                        }
                        ::cborgen::write_major_type_header_buf(
                            &mut scratch,
                            w,
                            ::cborgen::MajorType::TextString,
                            k.len() as u64,
                        )?;
                        w.write_all(k.as_bytes())?;
                        #value_code
                    }
                }
            })
        }
        FieldShape::Record(ty) => Ok(quote! {
            <#ty as ::cborgen::MarshalCbor>::marshal_cbor(&#access, w)?;
        }),
        FieldShape::BigInt => Ok(quote! {
            {
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::Tag,
                    2u64,
                )?;
                let mut magnitude = #access.to_bytes_be();
                if magnitude == [0u8] {
                    magnitude.clear();
                }
                ::cborgen::write_major_type_header_buf(
                    &mut scratch,
                    w,
                    ::cborgen::MajorType::ByteString,
                    magnitude.len() as u64,
                )?;
                w.write_all(&magnitude)?;
            }
        }),
        FieldShape::Cid => Ok(quote! {
            ::cborgen::write_cid_buf(&mut scratch, w, &#access)?;
        }),
        FieldShape::Deferred => Ok(quote! {
            <::cborgen::Deferred as ::cborgen::MarshalCbor>::marshal_cbor(&#access, w)?;
        }),
    }
}

/// Emits the element loop shared by sequences and fixed sequences.
fn encode_elements(
    elem: &FieldShape,
    access: &TokenStream,
    ctx: &str,
    depth: usize,
) -> syn::Result<TokenStream> {
    let var = format_ident!("v{}", depth);
    // Copy primitives are destructured out of the iterator so the element
    // emitters see plain values.
    let pattern = match elem {
        FieldShape::U64 | FieldShape::U8 | FieldShape::I64 => quote!(&#var),
        _ => quote!(#var),
    };
    let body = encode_shape(elem, &quote!(#var), ctx, None, depth + 1)?;
    Ok(quote! {
        for #pattern in #access.iter() {
            #body
        }
    })
}

/// Emits the value write inside a map-field loop, where `v` is a reference
/// to the entry value.
fn encode_map_value(value: &FieldShape, optional: bool) -> syn::Result<TokenStream> {
    match (value, optional) {
        (FieldShape::Record(ty), false) => Ok(quote! {
            <#ty as ::cborgen::MarshalCbor>::marshal_cbor(v, w)?;
        }),
        (FieldShape::Record(ty), true) => Ok(quote! {
            match v {
                None => w.write_all(&::cborgen::CBOR_NULL)?,
                Some(inner) => <#ty as ::cborgen::MarshalCbor>::marshal_cbor(inner, w)?,
            }
        }),
        (FieldShape::U64, false) => Ok(quote! {
            ::cborgen::write_major_type_header_buf(
                &mut scratch,
                w,
                ::cborgen::MajorType::UnsignedInt,
                *v,
            )?;
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
