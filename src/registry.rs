use alloc::{
    collections::{btree_map::Entry, BTreeMap},
    vec::Vec,
};
use std::sync::OnceLock;
use tracing::debug;

use crate::{
    definition::{Definitions, Provider, Registration, ServiceDefinition, Storage},
    errors::{BuildErrorKind, RegistryErrorKind},
    finalizer::BoxedCloneFinalizer,
    graph::DependencyGraph,
    key::ServiceKey,
    lifetime::Lifetime,
    schema,
};

/// Registrations collected before the container is built
#[derive(Clone, Default)]
pub(crate) struct Registry {
    registrations: BTreeMap<ServiceKey, Registration>,
}

impl Registry {
    /// # Errors
    /// Returns [`RegistryErrorKind::Duplicate`] if the key is already registered
    pub(crate) fn add(&mut self, registration: Registration) -> Result<(), RegistryErrorKind> {
        match self.registrations.entry(registration.key.clone()) {
            Entry::Occupied(_) => Err(RegistryErrorKind::Duplicate { key: registration.key }),
            Entry::Vacant(entry) => {
                debug!(key = %registration.key, lifetime = %registration.lifetime, "Registered");
                entry.insert(registration);
                Ok(())
            }
        }
    }

    /// # Errors
    /// - [`RegistryErrorKind::NoProvider`] if the key isn't registered
    /// - [`RegistryErrorKind::UnsupportedFinalizer`] if the registration is transient or an alias
    pub(crate) fn add_finalizer(
        &mut self,
        key: &ServiceKey,
        finalizer: BoxedCloneFinalizer,
    ) -> Result<(), RegistryErrorKind> {
        let Some(registration) = self.registrations.get_mut(key) else {
            return Err(RegistryErrorKind::NoProvider { key: key.clone() });
        };

        let reason = match (&registration.provider, registration.lifetime) {
            (Provider::Alias(_), _) => Some("an alias"),
            (_, Lifetime::Transient) => Some("transient"),
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(RegistryErrorKind::UnsupportedFinalizer { key: key.clone(), reason });
        }

        registration.finalizer = Some(finalizer);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Analyzes the registrations and validates their graph. Nothing is instantiated.
    ///
    /// # Errors
    /// Returns the first schema, graph, lifetime or cycle error
    pub(crate) fn build(&self) -> Result<Definitions, BuildErrorKind> {
        let mut entries = Vec::with_capacity(self.registrations.len());
        let mut index = BTreeMap::new();
        let mut slot_owners = Vec::new();

        for (position, registration) in self.registrations.values().enumerate() {
            let schema = schema::analyze(&registration.key, &registration.schema)?;
            let storage = match (&registration.provider, registration.lifetime) {
                (Provider::Alias(_), _) => Storage::Forward,
                (_, Lifetime::Singleton) => Storage::Shared(OnceLock::new()),
                (_, Lifetime::Transient) => Storage::Fresh,
                (_, Lifetime::Scoped) => {
                    slot_owners.push(position);
                    Storage::Slot(slot_owners.len() - 1)
                }
            };

            index.insert(registration.key.clone(), position);
            entries.push(ServiceDefinition {
                key: registration.key.clone(),
                implementation: registration.implementation,
                provider: registration.provider.clone(),
                lifetime: registration.lifetime,
                schema,
                storage,
                finalizer: registration.finalizer.clone(),
            });
        }

        let graph = DependencyGraph::new(&entries, &index)?;
        graph.propagate_alias_lifetimes(&mut entries);
        graph.validate_lifetimes(&entries)?;
        let build_order = graph.build_order(&entries)?;

        debug!(definitions = entries.len(), slots = slot_owners.len(), "Graph validated");

        Ok(Definitions {
            entries,
            index,
            build_order,
            slot_owners,
        })
    }
}
