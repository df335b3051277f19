//! Reduction of a deriving struct into a normalized field schema.
//!
//! Every structural problem — an unsupported shape, a forbidden optional
//! nesting, a non-textual map key — is reported here, at expansion time.
//! The emitters only ever see schemas that are known to be encodable.

use syn::{Data, DeriveInput, Field, Fields, GenericArgument, PathArguments, Type, Visibility};

/// Representation selected by the invoked derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// The record frames as a positional array.
    Tuple,
    /// The record frames as a map keyed by wire names.
    Map,
}

/// Which container backs a map field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    BTree,
    Hash,
}

/// The closed set of wire shapes the emitters dispatch on.
#[derive(Debug, Clone)]
pub enum FieldShape {
    Text,
    U64,
    U8,
    I64,
    Bool,
    Bytes,
    FixedBytes(syn::Expr),
    Sequence(Box<FieldShape>),
    FixedSequence(syn::Expr, Box<FieldShape>),
    Map {
        kind: MapKind,
        value: Box<FieldShape>,
        value_optional: bool,
    },
    Record(Type),
    BigInt,
    Cid,
    Deferred,
}

/// One field of the normalized schema.
pub struct FieldSchema {
    /// Declared field identifier.
    pub ident: syn::Ident,
    /// Declared field type, as written.
    pub ty: Type,
    /// Byte-level name used by the named-map representation.
    pub wire_key: String,
    /// Wire shape after stripping the optional layer.
    pub shape: FieldShape,
    /// Whether the field is wrapped in `Option`.
    pub optional: bool,
    /// Whether the nested record is boxed.
    pub boxed: bool,
    /// Per-field length ceiling override.
    pub max_len: Option<u64>,
}

/// A record reduced to its wire schema.
pub struct NormalizedSchema {
    pub name: syn::Ident,
    /// Encodable fields, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Private fields, reconstructed with `Default::default()` by decoders.
    pub skipped: Vec<syn::Ident>,
    /// Whether the record is a unit struct.
    pub unit: bool,
}

impl NormalizedSchema {
    /// Whether the tuple-form encoder synthesizes any header at runtime.
    ///
    /// Bool fields and delegating records write fixed bytes or hand off to
    /// another encoder, so a record made only of those skips the scratch
    /// binding entirely.
    pub fn needs_scratch(&self) -> bool {
        self.fields.iter().any(|f| {
            !matches!(
                f.shape,
                FieldShape::Bool | FieldShape::Record(_) | FieldShape::Deferred
            )
        })
    }
}

/// Normalizes the deriving struct, or reports why it cannot be encoded.
pub fn parse(input: &DeriveInput) -> syn::Result<NormalizedSchema> {
    let (named, unit) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => (fields.named.iter().collect::<Vec<_>>(), false),
            Fields::Unit => (Vec::new(), true),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "tuple structs are not supported",
                ));
            }
        },
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(input, "enums are not supported"));
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(input, "unions are not supported"));
        }
    };

    let mut schema = NormalizedSchema {
        name: input.ident.clone(),
        fields: Vec::new(),
        skipped: Vec::new(),
        unit,
    };

    for field in named {
        let ident = field.ident.clone().unwrap();
        if !matches!(field.vis, Visibility::Public(_)) {
            schema.skipped.push(ident);
            continue;
        }

        let attrs = parse_field_attrs(field)?;
        let (shape, optional, boxed) = classify_field(&field.ty)?;
        schema.fields.push(FieldSchema {
            wire_key: attrs.rename.unwrap_or_else(|| ident.to_string()),
            ident,
            ty: field.ty.clone(),
            shape,
            optional,
            boxed,
            max_len: attrs.max_len,
        });
    }

    Ok(schema)
}

// ---------- Attributes ----------

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    max_len: Option<u64>,
}

/// Parses `#[cborgen(rename = "…")]` and `#[cborgen(maxlen = N)]`.
fn parse_field_attrs(field: &Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("cborgen") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                attrs.rename = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("maxlen") {
                let lit: syn::LitInt = meta.value()?.parse()?;
                attrs.max_len = Some(lit.base10_parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown cborgen attribute; use `rename = \"…\"` or `maxlen = N`"))
            }
        })?;
    }
    Ok(attrs)
}

// ---------- Classification ----------

/// Classifies a declared field type, stripping one `Option` layer.
fn classify_field(ty: &Type) -> syn::Result<(FieldShape, bool, bool)> {
    if let Some(inner) = single_arg(ty, "Option") {
        if single_arg(inner, "Option").is_some() {
            return Err(syn::Error::new_spanned(ty, "nested Option is not supported"));
        }
        let (inner, boxed) = match single_arg(inner, "Box") {
            Some(unboxed) => (unboxed, true),
            None => (inner, false),
        };
        let shape = classify_shape(inner)?;
        match &shape {
            FieldShape::U64
            | FieldShape::Record(_)
            | FieldShape::Cid
            | FieldShape::BigInt
            | FieldShape::Deferred => {}
            FieldShape::Text => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "optional text fields are not supported",
                ));
            }
            FieldShape::U8 | FieldShape::I64 => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "optional integers other than Option<u64> are not supported",
                ));
            }
            _ => {
                return Err(syn::Error::new_spanned(
                    ty,
                    "this field type does not admit an optional form",
                ));
            }
        }
        if boxed && !matches!(shape, FieldShape::Record(_)) {
            return Err(syn::Error::new_spanned(
                ty,
                "Box is only supported around nested records",
            ));
        }
        return Ok((shape, true, boxed));
    }

    if let Some(inner) = single_arg(ty, "Box") {
        let shape = classify_shape(inner)?;
        if !matches!(shape, FieldShape::Record(_)) {
            return Err(syn::Error::new_spanned(
                ty,
                "Box is only supported around nested records",
            ));
        }
        return Ok((shape, false, true));
    }

    Ok((classify_shape(ty)?, false, false))
}

/// Classifies a type with the optional layer already stripped.
fn classify_shape(ty: &Type) -> syn::Result<FieldShape> {
    if let Type::Array(array) = ty {
        let len = array.len.clone();
        if is_u8(&array.elem) {
            return Ok(FieldShape::FixedBytes(len));
        }
        let elem = classify_element(&array.elem)?;
        return Ok(FieldShape::FixedSequence(len, Box::new(elem)));
    }

    let Some(ident) = path_ident(ty) else {
        return Err(syn::Error::new_spanned(ty, "unsupported field type"));
    };

    match ident.to_string().as_str() {
        "String" => Ok(FieldShape::Text),
        "u64" => Ok(FieldShape::U64),
        "u8" => Ok(FieldShape::U8),
        "i64" => Ok(FieldShape::I64),
        "bool" => Ok(FieldShape::Bool),
        "Vec" => {
            let inner = single_arg(ty, "Vec")
                .ok_or_else(|| syn::Error::new_spanned(ty, "Vec requires a type argument"))?;
            if is_u8(inner) {
                Ok(FieldShape::Bytes)
            } else {
                let elem = classify_element(inner)?;
                Ok(FieldShape::Sequence(Box::new(elem)))
            }
        }
        name @ ("BTreeMap" | "HashMap") => {
            let (key, value) = two_args(ty, name)
                .ok_or_else(|| syn::Error::new_spanned(ty, "maps require two type arguments"))?;
            if path_ident(key).map(|i| *i != "String").unwrap_or(true) {
                return Err(syn::Error::new_spanned(
                    ty,
                    "map keys must be String",
                ));
            }
            let (value, value_optional) = match single_arg(value, "Option") {
                Some(inner) => (inner, true),
                None => (value, false),
            };
            let value_shape = classify_shape(value)?;
            match &value_shape {
                FieldShape::Record(_) => {}
                FieldShape::U64 if !value_optional => {}
                _ => {
                    return Err(syn::Error::new_spanned(
                        ty,
                        "map values must be records, optional records, or u64",
                    ));
                }
            }
            let kind = if name == "BTreeMap" {
                MapKind::BTree
            } else {
                MapKind::Hash
            };
            Ok(FieldShape::Map {
                kind,
                value: Box::new(value_shape),
                value_optional,
            })
        }
        "BigUint" => Ok(FieldShape::BigInt),
        "Cid" => Ok(FieldShape::Cid),
        "Deferred" => Ok(FieldShape::Deferred),
        "Option" => Err(syn::Error::new_spanned(
            ty,
            "Option is not supported in this position",
        )),
        "Box" => Err(syn::Error::new_spanned(
            ty,
            "Box is only supported around nested records",
        )),
        "f32" | "f64" => Err(syn::Error::new_spanned(
            ty,
            "floating-point fields are not supported",
        )),
        "u16" | "u32" | "u128" | "usize" | "i8" | "i16" | "i32" | "i128" | "isize" | "char" => {
            Err(syn::Error::new_spanned(
                ty,
                "only u8, u64, and i64 integer fields are supported",
            ))
        }
        _ => Ok(FieldShape::Record(ty.clone())),
    }
}

/// Classifies a sequence element, restricting to the shapes sequences admit.
fn classify_element(ty: &Type) -> syn::Result<FieldShape> {
    let shape = classify_shape(ty)?;
    match shape {
        FieldShape::Text
        | FieldShape::U64
        | FieldShape::I64
        | FieldShape::Bytes
        | FieldShape::Sequence(_)
        | FieldShape::FixedBytes(_)
        | FieldShape::FixedSequence(..)
        | FieldShape::Cid
        | FieldShape::Record(_) => Ok(shape),
        _ => Err(syn::Error::new_spanned(
            ty,
            "unsupported sequence element type",
        )),
    }
}

// ---------- Type helpers ----------

/// The final path segment identifier, if the type is a plain path.
fn path_ident(ty: &Type) -> Option<&syn::Ident> {
    let Type::Path(path) = ty else { return None };
    if path.qself.is_some() {
        return None;
    }
    path.path.segments.last().map(|segment| &segment.ident)
}

fn is_u8(ty: &Type) -> bool {
    path_ident(ty).map(|ident| *ident == "u8").unwrap_or(false)
}

/// The single type argument of `name<T>`, if `ty` has that form.
fn single_arg<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let mut args = generic_args(ty, name)?;
    let first = args.next()?;
    if args.next().is_some() {
        return None;
    }
    Some(first)
}

/// The two type arguments of `name<K, V>`, if `ty` has that form.
fn two_args<'a>(ty: &'a Type, name: &str) -> Option<(&'a Type, &'a Type)> {
    let mut args = generic_args(ty, name)?;
    let first = args.next()?;
    let second = args.next()?;
    if args.next().is_some() {
        return None;
    }
    Some((first, second))
}

fn generic_args<'a>(ty: &'a Type, name: &str) -> Option<impl Iterator<Item = &'a Type>> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    Some(args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    }))
}
