use alloc::boxed::Box;
use core::fmt::{self, Display, Formatter};

use super::ResolveErrorKind;
use crate::{dependency::DependencyPosition, key::ServiceKey, lifetime::Lifetime};

#[derive(thiserror::Error, Debug)]
pub enum BuildErrorKind {
    #[error("Container is already built")]
    AlreadyBuilt,
    #[error("Container is being built")]
    Building,
    #[error("{owner} requires {dependency} through {position}, but it isn't registered")]
    UnresolvedDependency {
        owner: ServiceKey,
        dependency: ServiceKey,
        position: DependencyPosition,
    },
    #[error("Singleton {owner} can't depend on {dependency_lifetime} {dependency} through {position}")]
    LifetimeViolation {
        owner: ServiceKey,
        dependency: ServiceKey,
        dependency_lifetime: Lifetime,
        position: DependencyPosition,
    },
    #[error("Cyclic dependency detected: {from} -> {to}. Cycle: {}", KeyPath(.path))]
    CircularDependency {
        from: ServiceKey,
        to: ServiceKey,
        path: Box<[ServiceKey]>,
    },
    #[error("Malformed injection annotation {annotation:?} on field `{field}` of {owner}: {reason}")]
    MalformedAnnotation {
        owner: ServiceKey,
        field: &'static str,
        annotation: &'static str,
        reason: &'static str,
    },
    #[error("Field `{field}` of {owner} is optional, but its type has no empty value. Use `Option<Arc<_>>`")]
    OptionalWithoutDefault { owner: ServiceKey, field: &'static str },
    #[error("Failed to build singleton {key}: {source}")]
    Instantiation {
        key: ServiceKey,
        source: ResolveErrorKind,
    },
}

struct KeyPath<'a>(&'a [ServiceKey]);

impl Display for KeyPath<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, key) in self.0.iter().enumerate() {
            if index != 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
