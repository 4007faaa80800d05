mod attr;

use crate::injectable::attr::{parse_field_attrs, InjectArgs};

use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned as _, Data, DeriveInput, Error, Index, Member};

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(&input.ident, "`Injectable` can only be derived for structs"));
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut field_injections = Vec::new();
    let mut initializers = Vec::new();

    for (position, field) in data.fields.iter().enumerate() {
        let ty = &field.ty;
        let (member, field_name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(position)), position.to_string()),
        };

        match parse_field_attrs(&field.attrs) {
            None => {
                initializers.push(quote_spanned! { field.span() =>
                    #member: ::core::default::Default::default()
                });
            }
            Some(Err((err, attr))) => {
                let mut combined = Error::new_spanned(attr, "invalid `inject` attribute");
                combined.combine(err);
                return Err(combined);
            }
            Some(Ok(InjectArgs { annotation })) => {
                let annotation = annotation.map(|annotation| annotation.value()).unwrap_or_default();
                let slot = field_injections.len();

                field_injections.push(quote_spanned! { field.span() =>
                    ::wiring::FieldInjection::new::<#ty>(#position, #field_name, #annotation)
                });
                initializers.push(quote_spanned! { field.span() =>
                    #member: arguments.take_field::<#ty>(#slot)?
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::wiring::Injectable for #ident #ty_generics #where_clause {
            fn injection_fields() -> ::std::vec::Vec<::wiring::FieldInjection> {
                ::std::vec![#(#field_injections),*]
            }

            #[allow(unused_variables)]
            fn assemble(
                arguments: &mut ::wiring::Arguments,
            ) -> ::core::result::Result<Self, ::wiring::ResolveErrorKind> {
                ::core::result::Result::Ok(Self {
                    #(#initializers),*
                })
            }
        }
    })
}
