use alloc::{sync::Arc, vec::Vec};

use crate::{
    any::{cast, Instance},
    dependency::Dependency,
    errors::ResolveErrorKind,
    inject::InjectField,
};

/// Dependencies already resolved by the container for one construction, in schema order
pub struct Arguments {
    values: Vec<Option<Instance>>,
    cursor: usize,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub(crate) fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values, cursor: 0 }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Takes the next argument. `Ok(None)` means an optional dependency was absent.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::MissingArgument`] if all arguments are already taken
    /// - [`ResolveErrorKind::IncorrectType`] if the argument isn't a `T`
    pub fn next<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let position = self.cursor;
        self.cursor += 1;

        match self.values.get_mut(position) {
            Some(value) => value.take().map(|instance| cast::<T>(&instance)).transpose(),
            None => Err(ResolveErrorKind::MissingArgument { position }),
        }
    }

    /// Takes the next argument, failing if it's absent
    ///
    /// # Errors
    /// - [`ResolveErrorKind::MissingArgument`] if the argument is absent or all arguments are already taken
    /// - [`ResolveErrorKind::IncorrectType`] if the argument isn't a `T`
    pub fn next_required<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveErrorKind> {
        let position = self.cursor;
        self.next()?.ok_or(ResolveErrorKind::MissingArgument { position })
    }

    /// Takes the argument at `index` as a struct field value
    ///
    /// # Errors
    /// - [`ResolveErrorKind::MissingArgument`] if the argument is absent and `F` has no empty value
    /// - [`ResolveErrorKind::IncorrectType`] if the argument isn't a `F::Target`
    pub fn take_field<F: InjectField>(&mut self, index: usize) -> Result<F, ResolveErrorKind> {
        let value = match self.values.get_mut(index).and_then(Option::take) {
            Some(instance) => Some(cast::<F::Target>(&instance)?),
            None => None,
        };
        F::from_resolved(value).ok_or(ResolveErrorKind::MissingArgument { position: index })
    }
}

/// Describes and extracts the arguments of a factory.
///
/// Implemented for [`crate::Inject`], `Option<Inject<_>>` and tuples of them.
pub trait DependencyResolver: Sized {
    /// Appends the dependencies of `Self` in declaration order
    fn describe(dependencies: &mut Vec<Dependency>);

    /// Takes the values of `Self` from the resolved arguments
    ///
    /// # Errors
    /// Returns an error if an argument is missing or has an unexpected type
    fn resolve(arguments: &mut Arguments) -> Result<Self, ResolveErrorKind>;
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver, )*
        {
            #[inline]
            fn describe(dependencies: &mut Vec<Dependency>) {
                $( $ty::describe(dependencies); )*
            }

            #[inline]
            fn resolve(arguments: &mut Arguments) -> Result<Self, ResolveErrorKind> {
                Ok(($($ty::resolve(arguments)?,)*))
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);
