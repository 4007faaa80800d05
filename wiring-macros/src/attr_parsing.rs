use syn::{parse::Parse, Attribute, Meta};

pub(crate) trait Combine: Sized {
    fn combine(self, other: Self) -> syn::Result<Self>;
}

/// Parses `#[ident]` (as `T::default()`) and `#[ident(..)]`, combining repeated attributes
pub(crate) fn parse_attrs<T>(ident: &str, attrs: &[Attribute]) -> Option<Result<T, (syn::Error, Attribute)>>
where
    T: Combine + Parse + Default,
{
    let mut iter = attrs
        .iter()
        .filter(|attr| attr.meta.path().is_ident(ident))
        .map(|attr| (attr, parse_args::<T>(ident, attr)));

    let first = match iter.next() {
        Some((_, Ok(first))) => first,
        Some((attr, Err(err))) => return Some(Err((err, attr.clone()))),
        None => return None,
    };

    let result = iter.try_fold(first, |out, (attr, next_result)| match next_result {
        Ok(next) => out.combine(next).map_err(|err| (err, attr.clone())),
        Err(err) => Err((err, attr.clone())),
    });

    Some(result)
}

fn parse_args<T>(ident: &str, attr: &Attribute) -> syn::Result<T>
where
    T: Parse + Default,
{
    match &attr.meta {
        Meta::Path(_) => Ok(T::default()),
        Meta::List(_) => attr.parse_args(),
        Meta::NameValue(_) => Err(syn::Error::new_spanned(
            attr,
            format!("expected `#[{ident}]` or `#[{ident}(..)]`"),
        )),
    }
}
