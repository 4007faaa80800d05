use alloc::{boxed::Box, sync::Arc};
use core::convert::Infallible;
use tracing::warn;

use crate::{
    any::{downcast, Instance},
    service::{service_fn, BoxCloneService},
};

/// Called with a cached instance when its owner (the container or a scope) is closed
pub trait Finalizer<Dep: ?Sized>: Send + Sync + 'static {
    fn finalize(&self, dependency: Arc<Dep>);
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: Fn(Arc<Dep>) + Send + Sync + 'static,
    Dep: ?Sized,
{
    #[inline]
    fn finalize(&self, dependency: Arc<Dep>) {
        self(dependency);
    }
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<Instance, (), Infallible>;

#[must_use]
pub(crate) fn boxed_finalizer<Dep, Fin>(finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: ?Sized + Send + Sync + 'static,
    Fin: Finalizer<Dep>,
{
    let finalizer = Arc::new(finalizer);
    BoxCloneService(Box::new(service_fn(move |instance: Instance| -> Result<(), Infallible> {
        match downcast::<Dep>(&instance) {
            Some(dependency) => finalizer.finalize(dependency),
            None => warn!("Finalizer skipped: instance isn't a {}", core::any::type_name::<Dep>()),
        }
        Ok(())
    })))
}
