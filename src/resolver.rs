use alloc::{boxed::Box, vec::Vec};
use tracing::debug;

use crate::{
    any::Instance,
    context::Context,
    definition::{Provider, ServiceDefinition},
    dependency::Dependency,
    dependency_resolver::Arguments,
    errors::{InstantiatorErrorKind, ResolveErrorKind},
    service::Service as _,
};

/// Produces a new instance of `definition`, resolving its dependencies through `context`.
///
/// Caching is up to the caller.
pub(crate) fn instantiate(context: Context<'_>, definition: &ServiceDefinition) -> Result<Instance, ResolveErrorKind> {
    match &definition.provider {
        Provider::Value(instance) => Ok(instance.clone()),
        Provider::Alias(target) => {
            debug!(%target, "Forwarded to alias target");
            context.resolve(target)
        }
        Provider::Instantiator(instantiator) => {
            let arguments = resolve_dependencies(context, definition)?;

            match instantiator.call(arguments) {
                Ok(Some(instance)) => Ok(instance),
                Ok(None) => Err(ResolveErrorKind::NoInstance {
                    key: definition.key.clone(),
                }),
                Err(InstantiatorErrorKind::Deps(err)) => {
                    Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(err))))
                }
                Err(InstantiatorErrorKind::Factory(err)) => {
                    Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)))
                }
            }
        }
    }
}

fn resolve_dependencies(context: Context<'_>, definition: &ServiceDefinition) -> Result<Arguments, ResolveErrorKind> {
    let schema = &definition.schema;
    let mut values = Vec::with_capacity(schema.len());

    for dependency in &schema.arguments {
        values.push(resolve_dependency(context, dependency)?);
    }
    for field in &schema.fields {
        let value = resolve_dependency(context, &field.dependency).map_err(|err| ResolveErrorKind::Field {
            owner: definition.implementation,
            field: field.name,
            source: Box::new(err),
        })?;
        values.push(value);
    }

    Ok(Arguments::new(values))
}

/// An optional dependency becomes `None` only when it (or the end of its alias chain) is absent itself.
/// Absence deeper in its own construction propagates like any other failure.
fn resolve_dependency(context: Context<'_>, dependency: &Dependency) -> Result<Option<Instance>, ResolveErrorKind> {
    match context.resolve(&dependency.key) {
        Ok(instance) => Ok(Some(instance)),
        Err(err)
            if dependency.optional
                && err.absent_key() == Some(context.definitions().alias_end(&dependency.key)) =>
        {
            debug!(key = %dependency.key, "Optional dependency is absent");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
