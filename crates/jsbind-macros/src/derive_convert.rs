//! Implementation of `#[derive(IntoJs)]` and `#[derive(FromJs)]` for plain
//! structs, which travel as plain external objects keyed by field name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::attrs::{ParsedField, named_fields};

pub fn derive_into_js_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_into_js_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

pub fn derive_from_js_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_from_js_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Named fields, rejecting the handle markers that belong to `Wrapped`.
fn plain_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<Vec<ParsedField<'a>>> {
    let fields = named_fields(input, derive)?;
    if let Some(field) = fields.iter().find(|f| f.attrs.handle.is_some()) {
        return Err(syn::Error::new_spanned(
            field.ident,
            format!("#[derive({derive})] does not take handle fields; use #[derive(Wrapped)]"),
        ));
    }
    Ok(fields)
}

fn derive_into_js_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = plain_fields(input, "IntoJs")?;

    let sets = fields.iter().filter(|f| !f.attrs.skip).map(|f| {
        let ident = f.ident;
        let js_name = f.js_name();
        quote! { object.set(#js_name, self.#ident)?; }
    });

    Ok(quote! {
        impl #impl_generics ::jsbind_core::IntoJs for #name #ty_generics #where_clause {
            fn into_js(
                self,
                rt: &::jsbind_core::Runtime,
            ) -> ::core::result::Result<::jsbind_core::JsValue, ::jsbind_core::BridgeError> {
                let object = rt.new_object();
                #(#sets)*
                ::core::result::Result::Ok(object.into_raw())
            }
        }
    })
}

fn derive_from_js_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let fields = plain_fields(input, "FromJs")?;

    let inits = fields.iter().map(|f| {
        let ident = f.ident;
        if f.attrs.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            let js_name = f.js_name();
            quote! { #ident: value.get_as(#js_name)? }
        }
    });

    Ok(quote! {
        impl #impl_generics ::jsbind_core::FromJs for #name #ty_generics #where_clause {
            fn from_js(
                value: ::jsbind_core::Object,
            ) -> ::core::result::Result<Self, ::jsbind_core::BridgeError> {
                ::core::result::Result::Ok(Self {
                    #(#inits,)*
                })
            }
        }
    })
}
