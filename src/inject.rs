use alloc::{sync::Arc, vec::Vec};
use core::ops::Deref;

use crate::{
    dependency::{Dependency, FieldInjection},
    dependency_resolver::{Arguments, DependencyResolver},
    errors::ResolveErrorKind,
};

/// Factory argument that requires a registered dependency.
///
/// Wrap it in `Option` to make the dependency optional: `None` is passed when nothing is registered for it.
pub struct Inject<Dep: ?Sized>(pub Arc<Dep>);

impl<Dep: ?Sized> Deref for Inject<Dep> {
    type Target = Dep;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<Dep: ?Sized + Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    #[inline]
    fn describe(dependencies: &mut Vec<Dependency>) {
        dependencies.push(Dependency::of::<Dep>());
    }

    #[inline]
    fn resolve(arguments: &mut Arguments) -> Result<Self, ResolveErrorKind> {
        arguments.next_required().map(Self)
    }
}

impl<Dep: ?Sized + Send + Sync + 'static> DependencyResolver for Option<Inject<Dep>> {
    #[inline]
    fn describe(dependencies: &mut Vec<Dependency>) {
        dependencies.push(Dependency::of::<Dep>().optional());
    }

    #[inline]
    fn resolve(arguments: &mut Arguments) -> Result<Self, ResolveErrorKind> {
        arguments.next().map(|dependency| dependency.map(Inject))
    }
}

/// Type of a struct field that can be injected
pub trait InjectField: Sized {
    type Target: ?Sized + Send + Sync + 'static;

    /// Whether the field has an empty value to use when an optional dependency is absent
    const ALLOWS_ABSENT: bool;

    fn from_resolved(dependency: Option<Arc<Self::Target>>) -> Option<Self>;
}

impl<Dep: ?Sized + Send + Sync + 'static> InjectField for Arc<Dep> {
    type Target = Dep;

    const ALLOWS_ABSENT: bool = false;

    #[inline]
    fn from_resolved(dependency: Option<Arc<Self::Target>>) -> Option<Self> {
        dependency
    }
}

impl<Dep: ?Sized + Send + Sync + 'static> InjectField for Option<Arc<Dep>> {
    type Target = Dep;

    const ALLOWS_ABSENT: bool = true;

    #[inline]
    fn from_resolved(dependency: Option<Arc<Self::Target>>) -> Option<Self> {
        Some(dependency)
    }
}

/// Struct whose fields are filled by the container.
///
/// Usually derived with `#[derive(Injectable)]`:
/// ```
/// use std::sync::Arc;
/// use wiring::Injectable;
///
/// struct Logger;
///
/// #[derive(Injectable)]
/// struct Repository {
///     #[inject]
///     logger: Arc<Logger>,
///     #[inject("replica,?")]
///     replica: Option<Arc<Logger>>,
///     retries: u8,
/// }
/// ```
/// Annotated fields are injected in declaration order, the rest get their [`Default`] value.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Injected fields in declaration order, with their raw annotations
    fn injection_fields() -> Vec<FieldInjection>;

    /// Builds the value. The `n`th argument belongs to the `n`th entry of [`Injectable::injection_fields`].
    ///
    /// # Errors
    /// Returns an error if a required field wasn't resolved or has an unexpected type
    fn assemble(arguments: &mut Arguments) -> Result<Self, ResolveErrorKind>;
}

/// Converts a shared implementation into the abstract type it's registered as.
///
/// Every type implements itself. For traits, use [`crate::implements`].
pub trait Implements<I: ?Sized>: Send + Sync + 'static {
    fn upcast(this: Arc<Self>) -> Arc<I>;
}

impl<T: Send + Sync + 'static> Implements<T> for T {
    #[inline]
    fn upcast(this: Arc<Self>) -> Arc<T> {
        this
    }
}

/// Declares that a type can be registered as one or more trait objects
///
/// ```
/// use wiring::implements;
///
/// trait Store: Send + Sync {}
///
/// struct MemoryStore;
///
/// impl Store for MemoryStore {}
///
/// implements!(MemoryStore: Store);
/// ```
#[macro_export]
macro_rules! implements {
    ($ty:ty: $($iface:path),+ $(,)?) => {
        $(
            impl $crate::Implements<dyn $iface> for $ty {
                #[inline]
                fn upcast(this: ::std::sync::Arc<Self>) -> ::std::sync::Arc<dyn $iface> {
                    this
                }
            }
        )+
    };
}
