//! Implementation of `#[derive(Reflect)]` for plain structs whose reflected
//! fields each hold a handle.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::attrs::{TypeAttrs, named_fields};

pub fn derive_reflect_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_reflect_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_reflect_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = TypeAttrs::from_attrs(&input.attrs)?
        .name
        .unwrap_or_else(|| name.to_string());
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields: Vec<_> = named_fields(input, "Reflect")?
        .into_iter()
        .filter(|f| !f.attrs.skip)
        .collect();
    let idents: Vec<_> = fields.iter().map(|f| f.ident).collect();
    let names: Vec<_> = idents.iter().map(|ident| ident.to_string()).collect();

    Ok(quote! {
        impl #impl_generics ::jsbind_core::Reflect for #name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            fn field_names(&self) -> ::core::result::Result<::std::vec::Vec<::std::string::String>, ::jsbind_core::BridgeError> {
                ::core::result::Result::Ok(::std::vec![#(::std::string::String::from(#names)),*])
            }

            fn field(&self, name: &str) -> ::core::result::Result<::jsbind_core::Object, ::jsbind_core::BridgeError> {
                match name {
                    #(#names => ::core::result::Result::Ok(::core::clone::Clone::clone(
                        ::jsbind_core::HasHandle::handle(&self.#idents),
                    )),)*
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
                    #(#names => {
                        self.#idents = ::jsbind_core::FromJs::from_js(value)?;
                        ::core::result::Result::Ok(())
                    })*
                    _ => ::core::result::Result::Err(::jsbind_core::BridgeError::NoSuchMember {
                        type_name: #type_name,
                        member: name.to_string(),
                    }),
                }
            }
        }
    })
}
