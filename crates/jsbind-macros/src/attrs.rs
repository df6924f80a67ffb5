//! Attribute parsing for the `#[js(...)]` helper attribute.

use syn::{Attribute, Field, GenericArgument, Ident, LitStr, PathArguments, Type, TypeBareFn};

/// Parsed `#[js(...)]` attributes on a type.
#[derive(Debug, Default)]
pub struct TypeAttrs {
    /// Override the reported type name (default: Rust struct name)
    pub name: Option<String>,
}

/// How a field of a wrapped struct holds the external handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    /// Public embedding: the struct derefs to the field.
    Embed,
    /// Private holding.
    Handle,
}

/// Parsed `#[js(...)]` attributes on a field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    pub handle: Option<HandleMode>,
    /// External property name (default: Rust field name)
    pub name: Option<String>,
    pub skip: bool,
}

impl TypeAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("js") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else {
                    return Err(meta.error(format!(
                        "unknown js type attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

impl FieldAttrs {
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("js") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                let mode = if meta.path.is_ident("embed") {
                    Some(HandleMode::Embed)
                } else if meta.path.is_ident("handle") {
                    Some(HandleMode::Handle)
                } else {
                    None
                };
                if let Some(mode) = mode {
                    if result.handle.is_some() {
                        return Err(meta.error("`embed` and `handle` are mutually exclusive"));
                    }
                    result.handle = Some(mode);
                } else if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.name = Some(value.value());
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                } else {
                    return Err(meta.error(format!(
                        "unknown js field attribute: {}",
                        meta.path.get_ident().map(|i| i.to_string()).unwrap_or_default()
                    )));
                }
                Ok(())
            })?;
        }

        Ok(result)
    }
}

/// A named struct field with its parsed attributes.
pub struct ParsedField<'a> {
    pub field: &'a Field,
    pub ident: &'a Ident,
    pub attrs: FieldAttrs,
}

impl ParsedField<'_> {
    /// External property name.
    pub fn js_name(&self) -> String {
        self.attrs
            .name
            .clone()
            .unwrap_or_else(|| self.ident.to_string())
    }
}

/// Collect the named fields of a struct, rejecting enums, unions and tuple
/// structs.
pub fn named_fields<'a>(
    input: &'a syn::DeriveInput,
    derive: &str,
) -> syn::Result<Vec<ParsedField<'a>>> {
    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] is only supported on structs"),
        ));
    };
    let syn::Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] requires named fields"),
        ));
    };
    fields
        .named
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .as_ref()
                .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
            Ok(ParsedField {
                field,
                ident,
                attrs: FieldAttrs::from_attrs(&field.attrs)?,
            })
        })
        .collect()
}

/// What a `Prop<T>` marker projects.
pub enum PropKind<'a> {
    /// `Prop<T>`: a readable and writable property.
    Value(&'a Type),
    /// `Prop<fn(A..) -> R>`: a method.
    Method(&'a TypeBareFn),
}

/// Recognize `Prop<T>` (by its last path segment) and classify `T`.
pub fn prop_kind(ty: &Type) -> Option<PropKind<'_>> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Prop" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(Type::BareFn(function)) => Some(PropKind::Method(function)),
        GenericArgument::Type(inner) => Some(PropKind::Value(inner)),
        _ => None,
    }
}
