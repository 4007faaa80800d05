use alloc::{boxed::Box, sync::Arc, vec::Vec};
use tracing::debug;

use crate::{
    any::{erase, Instance},
    dependency::Dependency,
    dependency_resolver::{Arguments, DependencyResolver},
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    inject::{Implements, Injectable},
    service::{service_fn, BoxCloneService},
};

/// Factory of a service, implemented for closures which take [`DependencyResolver`]s
/// and return `Result<_, impl Into<InstantiateErrorKind>>`.
pub trait Instantiator<Deps>: Send + Sync + 'static
where
    Deps: DependencyResolver,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    /// # Errors
    /// Returns the factory's own error
    fn instantiate(&self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Dependency> {
        let mut dependencies = Vec::new();
        Deps::describe(&mut dependencies);
        dependencies
    }
}

/// `Ok(None)` means the provider produced no usable instance
pub(crate) type InstantiatorResult =
    Result<Option<Instance>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

pub(crate) type BoxedCloneInstantiator =
    BoxCloneService<Arguments, Option<Instance>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

#[must_use]
pub(crate) fn boxed_instantiator<I, Inst, Deps>(instantiator: Inst) -> BoxedCloneInstantiator
where
    I: ?Sized + Send + Sync + 'static,
    Inst: Instantiator<Deps>,
    Inst::Provides: Implements<I>,
    Deps: DependencyResolver,
{
    let instantiator = Arc::new(instantiator);
    BoxCloneService(Box::new(service_fn(move |mut arguments: Arguments| -> InstantiatorResult {
        let dependencies = match Deps::resolve(&mut arguments) {
            Ok(dependencies) => dependencies,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err)),
        };
        let provides = match instantiator.instantiate(dependencies) {
            Ok(provides) => provides,
            Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
        };

        debug!("Instantiated");

        Ok(Some(erase::<I>(Inst::Provides::upcast(Arc::new(provides)))))
    })))
}

/// Factory which reads its arguments by hand, for dependency lists only known at runtime
#[must_use]
pub(crate) fn boxed_explicit_instantiator<T, F, E>(factory: F) -> BoxedCloneInstantiator
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Arguments) -> Result<Option<Arc<T>>, E> + Send + Sync + 'static,
    E: Into<InstantiateErrorKind>,
{
    let factory = Arc::new(factory);
    BoxCloneService(Box::new(service_fn(move |mut arguments: Arguments| -> InstantiatorResult {
        match factory(&mut arguments) {
            Ok(provides) => {
                debug!("Instantiated");
                Ok(provides.map(erase::<T>))
            }
            Err(err) => Err(InstantiatorErrorKind::Factory(err.into())),
        }
    })))
}

#[must_use]
pub(crate) fn boxed_injectable_instantiator<I, Impl>() -> BoxedCloneInstantiator
where
    I: ?Sized + Send + Sync + 'static,
    Impl: Injectable + Implements<I>,
{
    BoxCloneService(Box::new(service_fn(|mut arguments: Arguments| -> InstantiatorResult {
        let implementation = match Impl::assemble(&mut arguments) {
            Ok(implementation) => implementation,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err)),
        };

        debug!("Assembled");

        Ok(Some(erase::<I>(Impl::upcast(Arc::new(implementation)))))
    })))
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Result<Response, Err> + Send + Sync + 'static,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);
