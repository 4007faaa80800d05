use alloc::{borrow::Cow, sync::Arc, vec::Vec};
use core::{
    any::TypeId,
    mem,
    sync::atomic::{AtomicBool, Ordering},
};
use parking_lot::Mutex;
use std::sync::OnceLock;
use tracing::{debug, error, info, info_span};

use crate::{
    any::{erase, is_abstract, TypeInfo},
    config::Config,
    context::Context,
    definition::{Definitions, Provider, Registration, Storage},
    dependency::Dependency,
    dependency_resolver::{Arguments, DependencyResolver},
    errors::{BuildErrorKind, InstantiateErrorKind, RegistryErrorKind, ResolveErrorKind},
    finalizer::{boxed_finalizer, BoxedCloneFinalizer, Finalizer},
    inject::{Implements, Injectable},
    instantiator::{boxed_explicit_instantiator, boxed_injectable_instantiator, boxed_instantiator, Instantiator},
    key::ServiceKey,
    lifetime::Lifetime,
    registry::Registry,
    schema::SchemaSource,
    scope::Scope,
    service::Service as _,
};

/// Dependency-injection container.
///
/// Services are registered first, then [`Container::build`] validates the dependency graph
/// and eagerly creates every singleton. After that the container only resolves.
///
/// The container is a cheap handle: clones share the same registrations and instances.
#[derive(Clone, Default)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made singleton instance
    ///
    /// # Errors
    /// - [`RegistryErrorKind::Finalized`] if the container is already built
    /// - [`RegistryErrorKind::Duplicate`] if the type is already registered without a name
    #[inline]
    pub fn register_value<T: Send + Sync + 'static>(&self, value: T) -> Result<(), RegistryErrorKind> {
        self.register_value_with(value, Config::default())
    }

    /// Registers a ready-made instance with a name.
    /// Only [`Lifetime::Singleton`] is accepted, other lifetimes fail with [`RegistryErrorKind::InvalidLifetime`].
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn register_value_with<T: Send + Sync + 'static>(
        &self,
        value: T,
        config: Config,
    ) -> Result<(), RegistryErrorKind> {
        self.register_shared(Arc::new(value), config)
    }

    /// Registers a ready-made shared instance, which may be a trait object
    #[allow(clippy::missing_errors_doc)]
    pub fn register_shared<T>(&self, value: Arc<T>, config: Config) -> Result<(), RegistryErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let Config { lifetime, name } = config;
        let key = ServiceKey::new(TypeInfo::of::<T>(), name);

        if lifetime != Lifetime::Singleton {
            return Err(log_registry_error(RegistryErrorKind::InvalidLifetime { key, lifetime }));
        }

        self.register(Registration::new(
            key,
            TypeInfo::of::<T>(),
            Provider::Value(erase(value)),
            Lifetime::Singleton,
            SchemaSource::Empty,
        ))
    }

    /// Registers a singleton factory. The factory's arguments are its dependencies:
    /// [`crate::Inject`] for required ones and `Option<Inject<_>>` for optional ones.
    ///
    /// ```
    /// use wiring::{Container, Inject};
    ///
    /// struct Config(&'static str);
    /// struct Client(&'static str);
    ///
    /// let container = Container::new();
    /// container.register_value(Config("localhost")).unwrap();
    /// container
    ///     .register_factory(|Inject(config): Inject<Config>| Ok(Client(config.0)))
    ///     .unwrap();
    /// container.build().unwrap();
    ///
    /// assert_eq!(container.get::<Client>().unwrap().0, "localhost");
    /// ```
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn register_factory<Inst, Deps>(&self, instantiator: Inst) -> Result<(), RegistryErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind>,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver,
    {
        self.register_factory_with(instantiator, Config::default())
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn register_factory_with<Inst, Deps>(&self, instantiator: Inst, config: Config) -> Result<(), RegistryErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind>,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver,
    {
        self.register_factory_as::<Inst::Provides, Inst, Deps>(instantiator, config)
    }

    /// Registers a factory under a type its output [`Implements`], usually a trait object
    #[allow(clippy::missing_errors_doc)]
    pub fn register_factory_as<I, Inst, Deps>(
        &self,
        instantiator: Inst,
        config: Config,
    ) -> Result<(), RegistryErrorKind>
    where
        I: ?Sized + Send + Sync + 'static,
        Inst: Instantiator<Deps, Error = InstantiateErrorKind>,
        Inst::Provides: Implements<I>,
        Deps: DependencyResolver,
    {
        let Config { lifetime, name } = config;

        self.register(Registration::new(
            ServiceKey::new(TypeInfo::of::<I>(), name),
            TypeInfo::of::<Inst::Provides>(),
            Provider::Instantiator(boxed_instantiator::<I, Inst, Deps>(instantiator)),
            lifetime,
            SchemaSource::Arguments(<Inst as Instantiator<Deps>>::dependencies),
        ))
    }

    /// Registers a factory with an explicit dependency list, which replaces the inferred one.
    /// The factory reads the resolved dependencies from [`Arguments`] in the same order.
    /// `Ok(None)` means the factory has no usable instance and fails the resolution.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use wiring::{Config, Container, Dependency};
    ///
    /// struct Url(&'static str);
    ///
    /// let container = Container::new();
    /// container.register_value_with(Url("db://primary"), Config::default().named("primary")).unwrap();
    /// container
    ///     .register_factory_with_dependencies(
    ///         [Dependency::named::<Url>("primary"), Dependency::named::<Url>("replica").optional()],
    ///         |arguments| {
    ///             let primary = arguments.next_required::<Url>()?;
    ///             let replica = arguments.next::<Url>()?;
    ///             Ok(Some(Arc::new(replica.unwrap_or(primary).0.len())))
    ///         },
    ///         Config::default(),
    ///     )
    ///     .unwrap();
    /// container.build().unwrap();
    ///
    /// assert_eq!(*container.get::<usize>().unwrap(), 12);
    /// ```
    #[allow(clippy::missing_errors_doc)]
    pub fn register_factory_with_dependencies<T, F>(
        &self,
        dependencies: impl IntoIterator<Item = Dependency>,
        factory: F,
        config: Config,
    ) -> Result<(), RegistryErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<Option<Arc<T>>, InstantiateErrorKind> + Send + Sync + 'static,
    {
        let Config { lifetime, name } = config;

        self.register(Registration::new(
            ServiceKey::new(TypeInfo::of::<T>(), name),
            TypeInfo::of::<T>(),
            Provider::Instantiator(boxed_explicit_instantiator(factory)),
            lifetime,
            SchemaSource::Explicit(dependencies.into_iter().collect()),
        ))
    }

    /// Binds `I` to the injectable implementation `Impl`, whose fields are filled by the container.
    ///
    /// `I` must be a trait object (see [`crate::implements`]) or `Impl` itself.
    ///
    /// # Errors
    /// - [`RegistryErrorKind::NotAbstract`] if `I` is a concrete type other than `Impl`
    /// - [`RegistryErrorKind::Finalized`] and [`RegistryErrorKind::Duplicate`], like other registrations
    pub fn register_implementation<I, Impl>(&self, config: Config) -> Result<(), RegistryErrorKind>
    where
        I: ?Sized + Send + Sync + 'static,
        Impl: Injectable + Implements<I>,
    {
        let Config { lifetime, name } = config;
        let key = ServiceKey::new(TypeInfo::of::<I>(), name);

        if !is_abstract::<I>() && TypeId::of::<I>() != TypeId::of::<Impl>() {
            return Err(log_registry_error(RegistryErrorKind::NotAbstract {
                key,
                implementation: TypeInfo::of::<Impl>(),
            }));
        }

        self.register(Registration::new(
            key,
            TypeInfo::of::<Impl>(),
            Provider::Instantiator(boxed_injectable_instantiator::<I, Impl>()),
            lifetime,
            SchemaSource::Fields(Impl::injection_fields),
        ))
    }

    /// Registers an injectable struct as itself
    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn register_injectable<T: Injectable>(&self, config: Config) -> Result<(), RegistryErrorKind> {
        self.register_implementation::<T, T>(config)
    }

    /// Makes `alias` resolve to whatever `target` resolves to. Both keys must have the same type.
    ///
    /// # Errors
    /// - [`RegistryErrorKind::SelfAlias`] if `alias` and `target` are the same key
    /// - [`RegistryErrorKind::AliasTypeMismatch`] if they have different types
    pub fn register_alias(&self, alias: ServiceKey, target: ServiceKey) -> Result<(), RegistryErrorKind> {
        if alias == target {
            return Err(log_registry_error(RegistryErrorKind::SelfAlias { key: alias }));
        }
        if alias.type_info != target.type_info {
            return Err(log_registry_error(RegistryErrorKind::AliasTypeMismatch { alias, target }));
        }

        let implementation = target.type_info;
        self.register(Registration::new(
            alias,
            implementation,
            Provider::Alias(target),
            // Replaced by the target's lifetime on build
            Lifetime::Singleton,
            SchemaSource::Empty,
        ))
    }

    /// Adds a finalizer for a registered singleton or scoped dependency.
    /// Singleton finalizers are called by [`Container::close`] in reverse build order,
    /// scoped ones when their scope is disposed, in reverse order of creation.
    ///
    /// # Errors
    /// - [`RegistryErrorKind::NoProvider`] if the dependency isn't registered yet
    /// - [`RegistryErrorKind::UnsupportedFinalizer`] if it's transient or an alias
    /// - [`RegistryErrorKind::Finalized`] if the container is already built
    #[inline]
    pub fn add_finalizer<T>(&self, finalizer: impl Finalizer<T>) -> Result<(), RegistryErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_finalizer_for(ServiceKey::of::<T>(), boxed_finalizer(finalizer))
    }

    #[allow(clippy::missing_errors_doc)]
    #[inline]
    pub fn add_named_finalizer<T>(
        &self,
        name: impl Into<Cow<'static, str>>,
        finalizer: impl Finalizer<T>,
    ) -> Result<(), RegistryErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_finalizer_for(ServiceKey::named::<T>(name), boxed_finalizer(finalizer))
    }

    /// Validates the registrations and creates every singleton in dependency order.
    ///
    /// On failure nothing is published: the container stays unbuilt and keeps its registrations,
    /// so the problem can be fixed and `build` called again.
    ///
    /// # Errors
    /// - [`BuildErrorKind::AlreadyBuilt`] if the container is already built
    /// - [`BuildErrorKind::Building`] if called from a singleton factory during the build
    /// - Graph errors: unresolved dependencies, lifetime violations, cycles and malformed annotations
    /// - [`BuildErrorKind::Instantiation`] if a singleton can't be created
    pub fn build(&self) -> Result<(), BuildErrorKind> {
        let span = info_span!("build");
        let _guard = span.enter();

        let definitions = {
            let registry = self.inner.registry.lock();
            if self.is_built() {
                return Err(log_build_error(BuildErrorKind::AlreadyBuilt));
            }
            if self.inner.building.load(Ordering::Acquire) {
                return Err(log_build_error(BuildErrorKind::Building));
            }
            debug!(registrations = registry.len(), "Building");

            let definitions = registry.build().map_err(log_build_error)?;
            self.inner.building.store(true, Ordering::Release);
            definitions
        };
        let building = BuildingGuard(&self.inner.building);

        // Not under the registry lock: factories may call back into the container
        let instantiated = instantiate_singletons(&definitions);

        let mut registry = self.inner.registry.lock();
        drop(building);
        instantiated.map_err(log_build_error)?;

        let services = definitions.entries.len();
        let _ = self.inner.definitions.set(Arc::new(definitions));
        drop(mem::take(&mut *registry));

        info!(services, "Container built");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.inner.definitions.get().is_some()
    }

    /// Keys in the order singletons were created: every key comes after its dependencies.
    /// `None` until the container is built.
    #[must_use]
    pub fn build_order(&self) -> Option<Vec<ServiceKey>> {
        let definitions = self.inner.definitions.get()?;
        Some(
            definitions
                .build_order
                .iter()
                .map(|&position| definitions.entries[position].key.clone())
                .collect(),
        )
    }

    /// Gets an unnamed dependency.
    ///
    /// Singletons come from the cache filled by [`Container::build`], transients are created on every call.
    /// Scoped dependencies fail with [`ResolveErrorKind::NoActiveScope`], use [`Container::create_scope`] for them.
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

    #[allow(clippy::missing_errors_doc)]
    pub fn get_key<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> Result<Arc<T>, ResolveErrorKind> {
        let span = info_span!("get", dependency = %key);
        let _guard = span.enter();

        let result = match self.inner.definitions.get() {
            Some(definitions) => Context::Root(definitions).get(key),
            None => Err(ResolveErrorKind::NotBuilt),
        };
        if let Err(err) = &result {
            error!("{}", err);
        }
        result
    }

    /// Resolves an unnamed dependency into `target`. `target` is left untouched on failure.
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

    /// Creates a scope for scoped dependencies, usually one per request or unit of work
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NotBuilt`] if the container isn't built
    pub fn create_scope(&self) -> Result<Scope, ResolveErrorKind> {
        let Some(definitions) = self.inner.definitions.get() else {
            let err = ResolveErrorKind::NotBuilt;
            error!("{}", err);
            return Err(err);
        };

        debug!(slots = definitions.slots(), "Scope created");
        Ok(Scope::new(definitions.clone()))
    }

    /// Calls singleton finalizers in reverse build order.
    /// Only the first call does anything. Also called when the last handle is dropped.
    #[inline]
    pub fn close(&self) {
        self.inner.close();
    }

    fn register(&self, registration: Registration) -> Result<(), RegistryErrorKind> {
        let mut registry = self.inner.registry.lock();
        if self.is_built() || self.inner.building.load(Ordering::Acquire) {
            return Err(log_registry_error(RegistryErrorKind::Finalized));
        }
        registry.add(registration).map_err(log_registry_error)
    }

    fn add_finalizer_for(&self, key: ServiceKey, finalizer: BoxedCloneFinalizer) -> Result<(), RegistryErrorKind> {
        let mut registry = self.inner.registry.lock();
        if self.is_built() || self.inner.building.load(Ordering::Acquire) {
            return Err(log_registry_error(RegistryErrorKind::Finalized));
        }
        registry.add_finalizer(&key, finalizer).map_err(log_registry_error)
    }
}

fn log_registry_error(err: RegistryErrorKind) -> RegistryErrorKind {
    error!("{}", err);
    err
}

/// Clears the `building` flag, even if a factory panics
struct BuildingGuard<'a>(&'a AtomicBool);

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn log_build_error(err: BuildErrorKind) -> BuildErrorKind {
    error!("{}", err);
    err
}

fn instantiate_singletons(definitions: &Definitions) -> Result<(), BuildErrorKind> {
    for &position in &definitions.build_order {
        let definition = &definitions.entries[position];
        if !matches!(definition.storage, Storage::Shared(_)) {
            continue;
        }

        Context::Root(definitions)
            .resolve(&definition.key)
            .map_err(|source| BuildErrorKind::Instantiation {
                key: definition.key.clone(),
                source,
            })?;
    }
    Ok(())
}

#[derive(Default)]
pub(crate) struct ContainerInner {
    registry: Mutex<Registry>,
    definitions: OnceLock<Arc<Definitions>>,
    /// Set while singletons are being created, with the registry lock released
    building: AtomicBool,
    closed: AtomicBool,
}

impl ContainerInner {
    fn close(&self) {
        let Some(definitions) = self.definitions.get() else {
            return;
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        for &position in definitions.build_order.iter().rev() {
            let definition = &definitions.entries[position];
            let (Some(finalizer), Storage::Shared(cell)) = (&definition.finalizer, &definition.storage) else {
                continue;
            };

            if let Some(instance) = cell.get() {
                let _ = finalizer.call(instance.clone());
                debug!(key = %definition.key, "Finalizer called");
            }
        }

        info!("Container closed");
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.close();
    }
}
