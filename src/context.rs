use alloc::sync::Arc;
use std::sync::OnceLock;
use tracing::debug;

use crate::{
    any::{cast, Instance},
    definition::{Definitions, ServiceDefinition, Storage},
    errors::ResolveErrorKind,
    key::ServiceKey,
    resolver,
    scope::ScopeInner,
};

/// Where a resolution happens: the container itself, or a scope of it
#[derive(Clone, Copy)]
pub(crate) enum Context<'a> {
    Root(&'a Definitions),
    Scope(&'a ScopeInner),
}

impl<'a> Context<'a> {
    #[inline]
    #[must_use]
    pub(crate) fn definitions(self) -> &'a Definitions {
        match self {
            Context::Root(definitions) => definitions,
            Context::Scope(scope) => scope.definitions(),
        }
    }

    pub(crate) fn resolve(self, key: &ServiceKey) -> Result<Instance, ResolveErrorKind> {
        let Some(definition) = self.definitions().get(key) else {
            return Err(ResolveErrorKind::NoProvider { key: key.clone() });
        };

        match (&definition.storage, self) {
            (Storage::Shared(cell), _) => shared(self.definitions(), definition, cell),
            (Storage::Fresh | Storage::Forward, _) => resolver::instantiate(self, definition),
            (Storage::Slot(_), Context::Root(_)) => Err(ResolveErrorKind::NoActiveScope { key: key.clone() }),
            (Storage::Slot(slot), Context::Scope(scope)) => scope.resolve_slot(*slot, definition),
        }
    }

    #[inline]
    pub(crate) fn get<T: ?Sized + Send + Sync + 'static>(self, key: &ServiceKey) -> Result<Arc<T>, ResolveErrorKind> {
        self.resolve(key).and_then(|instance| cast(&instance))
    }
}

/// Singletons are always built from the root, so they never capture a scope's instances
fn shared(
    definitions: &Definitions,
    definition: &ServiceDefinition,
    cell: &OnceLock<Instance>,
) -> Result<Instance, ResolveErrorKind> {
    if let Some(instance) = cell.get() {
        debug!(key = %definition.key, "Found in cache");
        return Ok(instance.clone());
    }
    debug!(key = %definition.key, "Not found in cache");

    // Only reachable while the container is being built: dependencies first, in build order
    let instance = resolver::instantiate(Context::Root(definitions), definition)?;
    Ok(cell.get_or_init(|| instance).clone())
}
