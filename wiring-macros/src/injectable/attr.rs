use syn::{
    parse::{Parse, ParseStream},
    Attribute, LitStr,
};

use crate::attr_parsing::{parse_attrs, Combine};

#[derive(Default)]
pub(crate) struct InjectArgs {
    pub(crate) annotation: Option<LitStr>,
}

impl Parse for InjectArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(Self::default());
        }

        let annotation = input.parse()?;
        if !input.is_empty() {
            return Err(input.error("expected a single string, like `#[inject(\"name,?\")]`"));
        }

        Ok(Self {
            annotation: Some(annotation),
        })
    }
}

impl Combine for InjectArgs {
    fn combine(self, other: Self) -> syn::Result<Self> {
        let msg = "`inject` specified more than once";
        match other.annotation {
            Some(annotation) => Err(syn::Error::new_spanned(annotation, msg)),
            None => Err(syn::Error::new(proc_macro2::Span::call_site(), msg)),
        }
    }
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> Option<Result<InjectArgs, (syn::Error, Attribute)>> {
    parse_attrs("inject", attrs)
}
