use crate::{any::TypeInfo, key::ServiceKey, lifetime::Lifetime};

#[derive(thiserror::Error, Debug)]
pub enum RegistryErrorKind {
    #[error("{key} is already registered")]
    Duplicate { key: ServiceKey },
    #[error("Container is finalized. Registrations aren't accepted after `Container::build`")]
    Finalized,
    #[error("{key} isn't an abstract type, so it can't be bound to {implementation}")]
    NotAbstract { key: ServiceKey, implementation: TypeInfo },
    #[error("{key} can't be an alias of itself")]
    SelfAlias { key: ServiceKey },
    #[error("Alias {alias} and its target {target} have different types")]
    AliasTypeMismatch { alias: ServiceKey, target: ServiceKey },
    #[error("{key} is registered by value, so it must be a singleton, not {lifetime}")]
    InvalidLifetime { key: ServiceKey, lifetime: Lifetime },
    #[error("Provider not found for {key}")]
    NoProvider { key: ServiceKey },
    #[error("{key} is {reason}, so it can't have a finalizer")]
    UnsupportedFinalizer { key: ServiceKey, reason: &'static str },
}
