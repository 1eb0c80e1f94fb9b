//! `#[derive(Bind)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{parse_quote, Data, DeriveInput, Fields, Path};

use crate::parse::{ContainerAttrs, FieldAttrs};

/// Expands the derive for one struct.
pub fn expand_bind(input: DeriveInput) -> syn::Result<TokenStream> {
    let container = ContainerAttrs::from_attrs(&input.attrs)?;
    let krate: Path = container.krate.unwrap_or_else(|| parse_quote!(::pinax));

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Bind requires a struct with named fields",
        ));
    };

    let mut declarations = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let attrs = FieldAttrs::from_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.to_string();
        let name = name.strip_prefix("r#").unwrap_or(&name).to_string();
        attrs
            .check_field_named(&name)
            .map_err(|message| syn::Error::new_spanned(ident, message))?;
        let tag = attrs.tag();
        let method = if attrs.flatten {
            quote!(flatten)
        } else {
            quote!(field)
        };
        declarations.push(quote! {
            .#method(#name, #tag, |target| &mut target.#ident)
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::FieldType for #ident #ty_generics #where_clause {
            fn shape() -> #krate::TypeShape {
                #krate::TypeShape::nested::<Self>()
            }
        }

        impl #impl_generics #krate::Bindable for #ident #ty_generics #where_clause {
            fn schema() -> #krate::StructSchema {
                #krate::SchemaBuilder::<Self>::new()
                    #(#declarations)*
                    .build()
            }
        }
    })
}
