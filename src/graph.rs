use alloc::{collections::BTreeMap, vec, vec::Vec};

use crate::{
    definition::ServiceDefinition,
    dependency::DependencyPosition,
    errors::BuildErrorKind,
    key::ServiceKey,
    lifetime::Lifetime,
};

pub(crate) struct Edge {
    pub(crate) target: usize,
    pub(crate) position: DependencyPosition,
}

/// Directed graph over registered definitions, from a dependant to its dependencies.
///
/// Optional dependencies that aren't registered have no edge. Registered ones do: they are resolved
/// like required ones, so a cycle through them would recurse forever at resolution time.
pub(crate) struct DependencyGraph {
    edges: Vec<Vec<Edge>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

impl DependencyGraph {
    /// # Errors
    /// Returns [`BuildErrorKind::UnresolvedDependency`] for a required dependency
    /// (or alias target) that isn't registered
    pub(crate) fn new(
        definitions: &[ServiceDefinition],
        index: &BTreeMap<ServiceKey, usize>,
    ) -> Result<Self, BuildErrorKind> {
        let mut edges = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let alias_target = definition
                .alias_target()
                .map(|target| (DependencyPosition::AliasTarget, target, false));
            let dependencies = definition
                .schema
                .dependencies()
                .map(|(position, dependency)| (position, &dependency.key, dependency.optional));

            let mut targets = Vec::with_capacity(definition.schema.len() + 1);
            for (position, key, optional) in alias_target.into_iter().chain(dependencies) {
                match index.get(key) {
                    Some(&target) => targets.push(Edge { target, position }),
                    None if optional => {}
                    None => {
                        return Err(BuildErrorKind::UnresolvedDependency {
                            owner: definition.key.clone(),
                            dependency: key.clone(),
                            position,
                        })
                    }
                }
            }
            edges.push(targets);
        }

        Ok(Self { edges })
    }

    /// Lifetime of the definition an alias chain ends at
    fn effective_lifetime(&self, definitions: &[ServiceDefinition], mut node: usize) -> Lifetime {
        for _ in 0..definitions.len() {
            if definitions[node].alias_target().is_none() {
                break;
            }
            match self.edges[node].first() {
                Some(edge) => node = edge.target,
                None => break,
            }
        }
        definitions[node].lifetime
    }

    /// Gives every alias the lifetime of its final target
    pub(crate) fn propagate_alias_lifetimes(&self, definitions: &mut [ServiceDefinition]) {
        let lifetimes: Vec<_> = (0..definitions.len())
            .map(|node| self.effective_lifetime(definitions, node))
            .collect();

        for (definition, lifetime) in definitions.iter_mut().zip(lifetimes) {
            definition.lifetime = lifetime;
        }
    }

    /// # Errors
    /// Returns [`BuildErrorKind::LifetimeViolation`] if a singleton directly depends
    /// on a transient or scoped definition
    pub(crate) fn validate_lifetimes(&self, definitions: &[ServiceDefinition]) -> Result<(), BuildErrorKind> {
        for (node, definition) in definitions.iter().enumerate() {
            if definition.lifetime != Lifetime::Singleton {
                continue;
            }

            for edge in &self.edges[node] {
                let dependency = &definitions[edge.target];
                if dependency.lifetime != Lifetime::Singleton {
                    return Err(BuildErrorKind::LifetimeViolation {
                        owner: definition.key.clone(),
                        dependency: dependency.key.clone(),
                        dependency_lifetime: dependency.lifetime,
                        position: edge.position,
                    });
                }
            }
        }
        Ok(())
    }

    /// Depth-first post-order over all definitions: every definition comes after its dependencies
    ///
    /// # Errors
    /// Returns [`BuildErrorKind::CircularDependency`] with the first cycle found
    pub(crate) fn build_order(&self, definitions: &[ServiceDefinition]) -> Result<Vec<usize>, BuildErrorKind> {
        let mut marks = vec![Mark::Unvisited; definitions.len()];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(definitions.len());

        for node in 0..definitions.len() {
            if marks[node] != Mark::Unvisited {
                continue;
            }
            if let Err((from, to)) = self.visit(node, &mut marks, &mut stack, &mut order) {
                let start = stack.iter().position(|&node| node == to).unwrap_or_default();
                let path = stack[start..]
                    .iter()
                    .chain([&to])
                    .map(|&node| definitions[node].key.clone())
                    .collect();

                return Err(BuildErrorKind::CircularDependency {
                    from: definitions[from].key.clone(),
                    to: definitions[to].key.clone(),
                    path,
                });
            }
        }
        Ok(order)
    }

    /// On a back edge, returns it and leaves the stack as it was when the edge was found
    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), (usize, usize)> {
        marks[node] = Mark::Active;
        stack.push(node);

        for edge in &self.edges[node] {
            match marks[edge.target] {
                Mark::Done => {}
                Mark::Active => return Err((node, edge.target)),
                Mark::Unvisited => self.visit(edge.target, marks, stack, order)?,
            }
        }

        stack.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }
}
