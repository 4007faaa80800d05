use alloc::boxed::Box;
use core::any::TypeId;

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind};
use crate::{any::TypeInfo, key::ServiceKey};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Container isn't built. Call `Container::build` before resolving")]
    NotBuilt,
    #[error("Provider not found for {key}")]
    NoProvider { key: ServiceKey },
    #[error("{key} is scoped, but there is no active scope. Resolve it from a `Scope`")]
    NoActiveScope { key: ServiceKey },
    #[error("Scope is disposed")]
    ScopeDisposed,
    #[error("Incorrect instance type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error("Provider of {key} returned no usable instance")]
    NoInstance { key: ServiceKey },
    #[error("Argument #{position} wasn't resolved")]
    MissingArgument { position: usize },
    #[error("Failed to inject field `{field}` of {owner}: {source}")]
    Field {
        owner: TypeInfo,
        field: &'static str,
        source: Box<ResolveErrorKind>,
    },
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

impl ResolveErrorKind {
    /// Key that isn't available here, as opposed to a key that failed to build
    #[inline]
    #[must_use]
    pub(crate) fn absent_key(&self) -> Option<&ServiceKey> {
        match self {
            Self::NoProvider { key } | Self::NoActiveScope { key } => Some(key),
            _ => None,
        }
    }
}
