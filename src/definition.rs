use alloc::{collections::BTreeMap, vec::Vec};
use std::sync::OnceLock;

use crate::{
    any::{Instance, TypeInfo},
    finalizer::BoxedCloneFinalizer,
    instantiator::BoxedCloneInstantiator,
    key::ServiceKey,
    lifetime::Lifetime,
    schema::{InjectionSchema, SchemaSource},
};

/// What produces instances of a key
#[derive(Clone)]
pub(crate) enum Provider {
    /// Ready-made instance, always a singleton
    Value(Instance),
    /// Resolves whatever the target key resolves to
    Alias(ServiceKey),
    Instantiator(BoxedCloneInstantiator),
}

/// Pending registration, kept until the container is built
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) key: ServiceKey,
    /// Concrete type behind the key, used in diagnostics
    pub(crate) implementation: TypeInfo,
    pub(crate) provider: Provider,
    pub(crate) lifetime: Lifetime,
    pub(crate) schema: SchemaSource,
    pub(crate) finalizer: Option<BoxedCloneFinalizer>,
}

impl Registration {
    #[inline]
    #[must_use]
    pub(crate) fn new(
        key: ServiceKey,
        implementation: TypeInfo,
        provider: Provider,
        lifetime: Lifetime,
        schema: SchemaSource,
    ) -> Self {
        Self {
            key,
            implementation,
            provider,
            lifetime,
            schema,
            finalizer: None,
        }
    }
}

/// Where a built definition keeps its instances
pub(crate) enum Storage {
    /// Singleton cell, filled once while the container is built
    Shared(OnceLock<Instance>),
    /// Index of the scoped slot in every scope
    Slot(usize),
    Fresh,
    Forward,
}

pub(crate) struct ServiceDefinition {
    pub(crate) key: ServiceKey,
    pub(crate) implementation: TypeInfo,
    pub(crate) provider: Provider,
    /// For aliases, the lifetime of the final target
    pub(crate) lifetime: Lifetime,
    pub(crate) schema: InjectionSchema,
    pub(crate) storage: Storage,
    pub(crate) finalizer: Option<BoxedCloneFinalizer>,
}

impl ServiceDefinition {
    #[inline]
    #[must_use]
    pub(crate) fn alias_target(&self) -> Option<&ServiceKey> {
        match &self.provider {
            Provider::Alias(target) => Some(target),
            Provider::Value(_) | Provider::Instantiator(_) => None,
        }
    }
}

/// Validated, immutable definition map of a built container
pub(crate) struct Definitions {
    pub(crate) entries: Vec<ServiceDefinition>,
    pub(crate) index: BTreeMap<ServiceKey, usize>,
    /// Entry indexes, every entry after its dependencies
    pub(crate) build_order: Vec<usize>,
    /// Entry index of each scoped slot
    pub(crate) slot_owners: Vec<usize>,
}

impl Definitions {
    #[inline]
    #[must_use]
    pub(crate) fn get(&self, key: &ServiceKey) -> Option<&ServiceDefinition> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    /// Follows aliases from `key` to the key that actually provides instances.
    /// Unregistered keys are returned as is.
    #[must_use]
    pub(crate) fn alias_end<'a>(&'a self, mut key: &'a ServiceKey) -> &'a ServiceKey {
        for _ in 0..self.entries.len() {
            match self.get(key).and_then(ServiceDefinition::alias_target) {
                Some(target) => key = target,
                None => break,
            }
        }
        key
    }

    #[inline]
    #[must_use]
    pub(crate) fn slots(&self) -> usize {
        self.slot_owners.len()
    }

    #[inline]
    #[must_use]
    pub(crate) fn slot_owner(&self, slot: usize) -> &ServiceDefinition {
        &self.entries[self.slot_owners[slot]]
    }
}
