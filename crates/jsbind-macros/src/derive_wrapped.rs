//! Implementation of the `#[derive(Wrapped)]` macro.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{DeriveInput, GenericParam, Lifetime, LifetimeParam, ReturnType, parse_macro_input};

use crate::attrs::{HandleMode, ParsedField, PropKind, TypeAttrs, named_fields, prop_kind};

pub fn derive_wrapped_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_wrapped_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_wrapped_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = TypeAttrs::from_attrs(&input.attrs)?
        .name
        .unwrap_or_else(|| name.to_string());
    let fields = named_fields(input, "Wrapped")?;
    let handle = find_handle(input, &fields)?;

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let handle_ident = handle.ident;
    let handle_ty = &handle.field.ty;

    let deref = match handle.attrs.handle {
        Some(HandleMode::Embed) => quote! {
            impl #impl_generics ::core::ops::Deref for #name #ty_generics #where_clause {
                type Target = #handle_ty;

                fn deref(&self) -> &Self::Target {
                    &self.#handle_ident
                }
            }
        },
        _ => TokenStream2::new(),
    };

    let defaults: Vec<_> = fields
        .iter()
        .filter(|f| f.ident != handle_ident)
        .map(|f| {
            let ident = f.ident;
            quote! { #ident: ::core::default::Default::default() }
        })
        .collect();

    let vis = &input.vis;
    let accessors = fields
        .iter()
        .map(generate_accessors)
        .collect::<syn::Result<Vec<_>>>()?;
    let reflect = generate_reflect(input, &type_name, handle, &fields);

    // Extra lifetime for the by-reference conversion.
    let mut ref_generics = input.generics.clone();
    ref_generics.params.insert(
        0,
        GenericParam::Lifetime(LifetimeParam::new(Lifetime::new("'__js", Span::call_site()))),
    );
    let (ref_impl_generics, _, _) = ref_generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::jsbind_core::HasHandle for #name #ty_generics #where_clause {
            fn handle(&self) -> &::jsbind_core::Object {
                ::jsbind_core::HasHandle::handle(&self.#handle_ident)
            }
        }

        #deref

        #[allow(dead_code)]
        impl #impl_generics #name #ty_generics #where_clause {
            /// Wrap an existing handle.
            #vis fn wrap(#handle_ident: #handle_ty) -> Self {
                Self {
                    #handle_ident,
                    #(#defaults,)*
                }
            }

            #(#accessors)*
        }

        impl #impl_generics ::jsbind_core::IntoJs for #name #ty_generics #where_clause {
            fn into_js(
                self,
                rt: &::jsbind_core::Runtime,
            ) -> ::core::result::Result<::jsbind_core::JsValue, ::jsbind_core::BridgeError> {
                ::jsbind_core::IntoJs::into_js(<Self as ::jsbind_core::HasHandle>::handle(&self), rt)
            }
        }

        impl #ref_impl_generics ::jsbind_core::IntoJs for &'__js #name #ty_generics #where_clause {
            fn into_js(
                self,
                rt: &::jsbind_core::Runtime,
            ) -> ::core::result::Result<::jsbind_core::JsValue, ::jsbind_core::BridgeError> {
                ::jsbind_core::IntoJs::into_js(<#name #ty_generics as ::jsbind_core::HasHandle>::handle(self), rt)
            }
        }

        impl #impl_generics ::jsbind_core::FromJs for #name #ty_generics #where_clause {
            fn from_js(
                value: ::jsbind_core::Object,
            ) -> ::core::result::Result<Self, ::jsbind_core::BridgeError> {
                ::core::result::Result::Ok(Self {
                    #handle_ident: ::jsbind_core::FromJs::from_js(value)?,
                    #(#defaults,)*
                })
            }
        }

        #reflect
    })
}

/// The single field marked `embed` or `handle`.
fn find_handle<'f, 'a>(
    input: &DeriveInput,
    fields: &'f [ParsedField<'a>],
) -> syn::Result<&'f ParsedField<'a>> {
    let mut handles = fields.iter().filter(|f| f.attrs.handle.is_some());
    match (handles.next(), handles.next()) {
        (Some(handle), None) => Ok(handle),
        (None, _) => Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Wrapped)] requires a field marked #[js(embed)] or #[js(handle)]",
        )),
        (Some(_), Some(extra)) => Err(syn::Error::new_spanned(
            extra.ident,
            "only one field may be marked #[js(embed)] or #[js(handle)]",
        )),
    }
}

/// The held handle, as an expression inside generated methods.
fn handle_expr() -> TokenStream2 {
    quote! { <Self as ::jsbind_core::HasHandle>::handle(self) }
}

/// Getter and setter for `Prop<T>`, call method and proxy for `Prop<fn(..)>`.
fn generate_accessors(field: &ParsedField<'_>) -> syn::Result<TokenStream2> {
    let Some(kind) = prop_kind(&field.field.ty) else {
        return Ok(TokenStream2::new());
    };
    if field.attrs.handle.is_some() {
        return Err(syn::Error::new_spanned(
            field.ident,
            "a Prop field cannot hold the handle",
        ));
    }
    let vis = &field.field.vis;
    let ident = field.ident;
    let js_name = field.js_name();
    let handle = handle_expr();

    Ok(match kind {
        PropKind::Value(ty) => {
            let setter = format_ident!("set_{}", ident);
            quote! {
                #vis fn #ident(&self) -> ::core::result::Result<#ty, ::jsbind_core::BridgeError> {
                    #handle.get_as::<#ty>(#js_name)
                }

                #vis fn #setter(&self, value: #ty) -> ::core::result::Result<(), ::jsbind_core::BridgeError> {
                    #handle.set(#js_name, value)
                }
            }
        }
        PropKind::Method(function) => {
            let proxy = format_ident!("{}_fn", ident);
            let arg_tys: Vec<_> = function.inputs.iter().map(|arg| &arg.ty).collect();
            let arg_names: Vec<_> = (0..arg_tys.len()).map(|i| format_ident!("arg{}", i)).collect();
            let ret = match &function.output {
                ReturnType::Default => quote! { () },
                ReturnType::Type(_, ty) => quote! { #ty },
            };
            quote! {
                #vis fn #ident(&self, #(#arg_names: #arg_tys),*) -> ::core::result::Result<#ret, ::jsbind_core::BridgeError> {
                    #handle.call(#js_name, (#(#arg_names,)*))?.to::<#ret>()
                }

                #vis fn #proxy(&self) -> impl Fn(#(#arg_tys),*) -> ::core::result::Result<#ret, ::jsbind_core::BridgeError> + 'static {
                    let target = ::core::clone::Clone::clone(#handle);
                    move |#(#arg_names: #arg_tys),*| target.call(#js_name, (#(#arg_names,)*))?.to::<#ret>()
                }
            }
        }
    })
}

fn generate_reflect(
    input: &DeriveInput,
    type_name: &str,
    handle: &ParsedField<'_>,
    fields: &[ParsedField<'_>],
) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let handle_ident = handle.ident;
    let handle_name = handle_ident.to_string();
    let handle_expr = handle_expr();

    let mut value_names = Vec::new();
    let mut value_props = Vec::new();
    let mut method_names = Vec::new();
    let mut method_props = Vec::new();
    for field in fields {
        match prop_kind(&field.field.ty) {
            Some(PropKind::Value(_)) => {
                value_names.push(field.ident.to_string());
                value_props.push(field.js_name());
            }
            Some(PropKind::Method(_)) => {
                method_names.push(field.ident.to_string());
                method_props.push(field.js_name());
            }
            None => {}
        }
    }

    quote! {
        impl #impl_generics ::jsbind_core::Reflect for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn field_names(&self) -> ::core::result::Result<::std::vec::Vec<::std::string::String>, ::jsbind_core::BridgeError> {
                ::core::result::Result::Ok(::std::vec![
                    ::std::string::String::from(#handle_name),
                    #(::std::string::String::from(#value_names),)*
                ])
            }

            fn field(&self, name: &str) -> ::core::result::Result<::jsbind_core::Object, ::jsbind_core::BridgeError> {
                match name {
                    #handle_name => ::core::result::Result::Ok(::core::clone::Clone::clone(#handle_expr)),
                    #(#value_names => #handle_expr.get(#value_props),)*
                    _ => ::core::result::Result::Err(::jsbind_core::BridgeError::NoSuchMember {
                        type_name: #type_name,
                        member: name.to_string(),
                    }),
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: ::jsbind_core::Object,
            ) -> ::core::result::Result<(), ::jsbind_core::BridgeError> {
                match name {
                    #handle_name => {
                        self.#handle_ident = ::jsbind_core::FromJs::from_js(value)?;
                        ::core::result::Result::Ok(())
                    }
                    #(#value_names => #handle_expr.set(#value_props, value),)*
                    _ => ::core::result::Result::Err(::jsbind_core::BridgeError::NoSuchMember {
                        type_name: #type_name,
                        member: name.to_string(),
                    }),
                }
            }

            fn method_names(&self) -> ::std::vec::Vec<&'static str> {
                let mut names: ::std::vec::Vec<&'static str> = ::std::vec![#(#method_names),*];
                names.extend(::jsbind_core::Reflect::method_names(#handle_expr));
                names
            }

            fn call_method(
                &self,
                name: &str,
                args: ::std::vec::Vec<::jsbind_core::Object>,
            ) -> ::core::result::Result<::jsbind_core::Object, ::jsbind_core::BridgeError> {
                match name {
                    #(#method_names => #handle_expr.call(#method_props, args),)*
                    _ => ::jsbind_core::Reflect::call_method(#handle_expr, name, args),
                }
            }
        }
    }
}
