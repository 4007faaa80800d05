use alloc::{borrow::Cow, boxed::Box, sync::Arc, vec::Vec};
use core::{
    mem,
    sync::atomic::{AtomicBool, Ordering},
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info_span};

use crate::{
    any::Instance,
    context::Context,
    definition::{Definitions, ServiceDefinition},
    errors::ResolveErrorKind,
    key::ServiceKey,
    resolver,
    service::Service as _,
};

/// Unit of work of a built [`crate::Container`], which owns one instance of every scoped dependency.
///
/// Singletons are shared with the container and transients are never cached.
/// The scope is disposed by [`Scope::dispose`] or when its last handle is dropped.
#[derive(Clone)]
pub struct Scope {
    pub(crate) inner: Arc<ScopeInner>,
}

impl Scope {
    #[must_use]
    pub(crate) fn new(definitions: Arc<Definitions>) -> Self {
        let slots = (0..definitions.slots()).map(|_| Slot::default()).collect();
        Self {
            inner: Arc::new(ScopeInner {
                definitions,
                slots,
                resolved: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        self.get_key(&ServiceKey::of::<T>())
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>, ResolveErrorKind> {
        self.get_key(&ServiceKey::named::<T>(name))
    }

    /// Gets a dependency in this scope.
    ///
    /// Scoped dependencies are created once per scope, and their own scoped dependencies come from the same scope.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::ScopeDisposed`] once the scope is disposed, for any lifetime
    pub fn get_key<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> Result<Arc<T>, ResolveErrorKind> {
        let span = info_span!("scope_get", dependency = %key);
        let _guard = span.enter();

        let result = if self.inner.is_disposed() {
            Err(ResolveErrorKind::ScopeDisposed)
        } else {
            Context::Scope(&self.inner).get(key)
        };
        if let Err(err) = &result {
            error!("{}", err);
        }
        result
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn resolve_into<T: ?Sized + Send + Sync + 'static>(
        &self,
        target: &mut Option<Arc<T>>,
    ) -> Result<(), ResolveErrorKind> {
        *target = Some(self.get()?);
        Ok(())
    }

    /// # Panics
    /// Panics if the dependency can't be resolved
    #[inline]
    #[must_use]
    pub fn must_get<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get().unwrap_or_else(|err| panic!("{err}"))
    }

    /// # Panics
    /// Panics if the dependency can't be resolved
    #[inline]
    #[must_use]
    pub fn must_get_named<T: ?Sized + Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Arc<T> {
        self.get_named(name).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Calls finalizers of the scoped instances in reverse order of creation and releases them.
    /// Only the first call does anything.
    #[inline]
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

#[derive(Default)]
struct Slot {
    value: RwLock<Option<Instance>>,
    /// Held while the slot's instance is being created
    guard: Mutex<()>,
}

pub(crate) struct ScopeInner {
    definitions: Arc<Definitions>,
    slots: Box<[Slot]>,
    /// Slots with a finalizer, in order of creation
    resolved: Mutex<Vec<usize>>,
    disposed: AtomicBool,
}

impl ScopeInner {
    #[inline]
    #[must_use]
    pub(crate) fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    #[inline]
    #[must_use]
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn resolve_slot(
        &self,
        slot: usize,
        definition: &ServiceDefinition,
    ) -> Result<Instance, ResolveErrorKind> {
        let cell = &self.slots[slot];

        if let Some(instance) = cell.value.read().as_ref().cloned() {
            debug!(key = %definition.key, "Found in scope cache");
            return Ok(instance);
        }

        let _guard = cell.guard.lock();
        if self.is_disposed() {
            return Err(ResolveErrorKind::ScopeDisposed);
        }
        // Another thread may have filled the slot while we waited for the guard
        if let Some(instance) = cell.value.read().as_ref().cloned() {
            debug!(key = %definition.key, "Found in scope cache");
            return Ok(instance);
        }
        debug!(key = %definition.key, "Not found in scope cache");

        let instance = resolver::instantiate(Context::Scope(self), definition)?;
        *cell.value.write() = Some(instance.clone());
        debug!(key = %definition.key, "Cached in scope");

        if definition.finalizer.is_some() {
            self.resolved.lock().push(slot);
            debug!(key = %definition.key, "Pushed to resolved set");
        }

        Ok(instance)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Wait for creations that started before the flag was set
        for cell in &*self.slots {
            let _guard = cell.guard.lock();
        }

        let resolved = mem::take(&mut *self.resolved.lock());
        for &slot in resolved.iter().rev() {
            let definition = self.definitions.slot_owner(slot);
            let instance = self.slots[slot].value.read().as_ref().cloned();

            if let (Some(finalizer), Some(instance)) = (&definition.finalizer, instance) {
                let _ = finalizer.call(instance);
                debug!(key = %definition.key, "Finalizer called");
            }
        }

        for cell in &*self.slots {
            cell.value.write().take();
        }

        debug!("Scope disposed");
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        config::Config,
        container::Container,
        errors::ResolveErrorKind,
        inject::Inject,
        key::ServiceKey,
    };

    use alloc::{sync::Arc, vec::Vec};
    use core::sync::atomic::{AtomicU8, Ordering};
    use parking_lot::Mutex;
    use std::{sync::Barrier, thread};
    use tracing::debug;
    use tracing_test::traced_test;

    struct Settings(&'static str);
    struct Session(Arc<Settings>);
    struct Request(Arc<Session>);

    fn container(session_call_count: Arc<AtomicU8>) -> Container {
        let container = Container::new();
        container.register_value(Settings("memory")).unwrap();
        container
            .register_factory_with(
                move |Inject(settings): Inject<Settings>| {
                    session_call_count.fetch_add(1, Ordering::SeqCst);

                    debug!("Call session instantiator");
                    Ok(Session(settings))
                },
                Config::scoped(),
            )
            .unwrap();
        container
            .register_factory_with(|Inject(session): Inject<Session>| Ok(Request(session)), Config::transient())
            .unwrap();
        container
    }

    #[test]
    #[traced_test]
    fn test_scoped_get() {
        let session_call_count = Arc::new(AtomicU8::new(0));

        let container = container(session_call_count.clone());
        container.build().unwrap();

        let scope_1 = container.create_scope().unwrap();
        let scope_2 = container.create_scope().unwrap();

        let session_1 = scope_1.get::<Session>().unwrap();
        assert!(Arc::ptr_eq(&session_1, &scope_1.get::<Session>().unwrap()));
        assert!(Arc::ptr_eq(&session_1, &scope_1.clone().get::<Session>().unwrap()));

        let session_2 = scope_2.get::<Session>().unwrap();
        assert!(!Arc::ptr_eq(&session_1, &session_2));
        assert!(Arc::ptr_eq(&session_1.0, &session_2.0));

        assert_eq!(session_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_transient_in_scope() {
        let session_call_count = Arc::new(AtomicU8::new(0));

        let container = container(session_call_count.clone());
        container.build().unwrap();

        assert!(matches!(
            container.get::<Request>(),
            Err(ResolveErrorKind::NoActiveScope { .. })
        ));

        let scope = container.create_scope().unwrap();
        let request_1 = scope.get::<Request>().unwrap();
        let request_2 = scope.get::<Request>().unwrap();

        assert!(!Arc::ptr_eq(&request_1, &request_2));
        assert!(Arc::ptr_eq(&request_1.0, &request_2.0));
        assert!(Arc::ptr_eq(&request_1.0, &scope.get::<Session>().unwrap()));
        assert_eq!(session_call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn test_singleton_in_scope() {
        let container = container(Arc::new(AtomicU8::new(0)));
        container.build().unwrap();

        let scope = container.create_scope().unwrap();

        assert!(Arc::ptr_eq(
            &scope.get::<Settings>().unwrap(),
            &container.get::<Settings>().unwrap()
        ));
        assert!(matches!(
            scope.get_key::<Settings>(&ServiceKey::named::<Settings>("missing")),
            Err(ResolveErrorKind::NoProvider { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_dispose() {
        struct Cache;

        let calls = Arc::new(Mutex::new(Vec::new()));

        let container = container(Arc::new(AtomicU8::new(0)));
        container
            .register_factory_with(|| Ok(Cache), Config::scoped())
            .unwrap();
        container
            .add_finalizer({
                let calls = calls.clone();
                move |_: Arc<Session>| {
                    calls.lock().push("session");
                    debug!("Finalizer 1 called");
                }
            })
            .unwrap();
        container
            .add_finalizer({
                let calls = calls.clone();
                move |_: Arc<Cache>| {
                    calls.lock().push("cache");
                    debug!("Finalizer 2 called");
                }
            })
            .unwrap();
        container.build().unwrap();

        let scope = container.create_scope().unwrap();
        let _ = scope.get::<Cache>().unwrap();
        let _ = scope.get::<Session>().unwrap();

        let unused_scope = container.create_scope().unwrap();
        unused_scope.dispose();
        assert!(calls.lock().is_empty());

        scope.dispose();
        scope.dispose();

        assert!(scope.is_disposed());
        assert_eq!(*calls.lock(), ["session", "cache"]);
        assert!(matches!(scope.get::<Session>(), Err(ResolveErrorKind::ScopeDisposed)));
        assert!(matches!(scope.get::<Settings>(), Err(ResolveErrorKind::ScopeDisposed)));
    }

    #[test]
    #[traced_test]
    fn test_dispose_on_drop() {
        let finalizer_call_count = Arc::new(AtomicU8::new(0));

        let container = container(Arc::new(AtomicU8::new(0)));
        container
            .add_finalizer({
                let finalizer_call_count = finalizer_call_count.clone();
                move |_: Arc<Session>| {
                    finalizer_call_count.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        container.build().unwrap();

        let scope = container.create_scope().unwrap();
        let session = scope.get::<Session>().unwrap();
        let clone = scope.clone();

        drop(scope);
        assert_eq!(finalizer_call_count.load(Ordering::SeqCst), 0);

        drop(clone);
        assert_eq!(finalizer_call_count.load(Ordering::SeqCst), 1);
        assert_eq!(session.0 .0, "memory");
    }

    #[test]
    #[traced_test]
    fn test_concurrent_scoped_get() {
        const THREADS: usize = 8;

        let session_call_count = Arc::new(AtomicU8::new(0));
        let container = container(session_call_count.clone());
        container.build().unwrap();

        let scope = container.create_scope().unwrap();
        let barrier = Barrier::new(THREADS);
        let sessions = Mutex::new(Vec::with_capacity(THREADS));

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let session = scope.get::<Session>().unwrap();
                    sessions.lock().push(session);
                });
            }
        });

        let sessions = sessions.into_inner();
        assert_eq!(sessions.len(), THREADS);
        assert!(sessions.iter().all(|session| Arc::ptr_eq(session, &sessions[0])));
        assert_eq!(session_call_count.load(Ordering::SeqCst), 1);
    }
}
