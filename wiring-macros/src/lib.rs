use proc_macro::TokenStream;
use quote::{quote, ToTokens};
use std::env::var_os;
use syn::parse::Parse;

mod attr_parsing;
mod injectable;

/// Derives `wiring::Injectable` for a struct.
///
/// Fields marked `#[inject]` or `#[inject("..")]` are filled by the container in declaration order,
/// the rest are initialised with [`Default::default`]. Injected fields are `Arc<T>` or `Option<Arc<T>>`.
///
/// The annotation string is parsed when the container is built:
/// - `""`: unnamed, required
/// - `"name"`: named, required
/// - `"?"` or `"optional"`: unnamed, optional
/// - `"name,?"` or `"name,optional"`: named, optional
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(item: TokenStream) -> TokenStream {
    expand_with(item, injectable::expand)
}

fn expand_with<F, I, K>(input: TokenStream, f: F) -> TokenStream
where
    F: FnOnce(I) -> syn::Result<K>,
    I: Parse,
    K: ToTokens,
{
    expand(syn::parse(input).and_then(f))
}

fn expand<T>(result: syn::Result<T>) -> TokenStream
where
    T: ToTokens,
{
    match result {
        Ok(tokens) => {
            let tokens = (quote! { #tokens }).into();
            if var_os("MACROS_DEBUG").is_some() {
                eprintln!("{tokens}");
            }
            tokens
        }
        Err(err) => err.into_compile_error().into(),
    }
}
