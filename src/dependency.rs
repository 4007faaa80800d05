use alloc::borrow::Cow;
use core::fmt::{self, Display, Formatter};

use crate::{any::TypeInfo, inject::InjectField, key::ServiceKey};

/// A single dependency of a factory or an injectable struct
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependency {
    pub key: ServiceKey,
    pub optional: bool,
}

impl Dependency {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            key: ServiceKey::of::<T>(),
            optional: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: ServiceKey::named::<T>(name),
            optional: false,
        }
    }

    /// Marks the dependency as optional: when nothing is registered for it, `None` is injected
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Where a dependency is consumed by its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyPosition {
    Argument(usize),
    Field { position: usize, name: &'static str },
    AliasTarget,
}

impl Display for DependencyPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DependencyPosition::Argument(index) => write!(f, "argument #{index}"),
            DependencyPosition::Field { position, name } => write!(f, "field `{name}` (#{position})"),
            DependencyPosition::AliasTarget => f.write_str("alias target"),
        }
    }
}

/// Raw description of an injected struct field, as emitted by `#[derive(Injectable)]`.
///
/// The annotation is kept as written and parsed once when the container is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInjection {
    pub position: usize,
    pub field_name: &'static str,
    pub type_info: TypeInfo,
    pub annotation: &'static str,
    pub allows_absent: bool,
}

impl FieldInjection {
    #[inline]
    #[must_use]
    pub fn new<F: InjectField>(position: usize, field_name: &'static str, annotation: &'static str) -> Self {
        Self {
            position,
            field_name,
            type_info: TypeInfo::of::<F::Target>(),
            annotation,
            allows_absent: F::ALLOWS_ABSENT,
        }
    }
}
