//! Dependency-injection container with build-time graph validation.
//!
//! Services are registered on a [`Container`] by value, by factory, as injectable structs bound to
//! trait objects, or as aliases of other registrations. [`Container::build`] parses their dependencies,
//! rejects missing dependencies, cycles and singletons that capture shorter-lived services,
//! then creates every singleton in dependency order. Scoped services live in a [`Scope`].

extern crate alloc;
extern crate self as wiring;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod context;
pub(crate) mod definition;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod graph;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod key;
pub(crate) mod lifetime;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod schema;
pub(crate) mod scope;
pub(crate) mod service;

pub use any::TypeInfo;
pub use config::Config;
pub use container::Container;
pub use dependency::{Dependency, DependencyPosition, FieldInjection};
pub use dependency_resolver::{Arguments, DependencyResolver};
pub use errors::{BuildErrorKind, InstantiateErrorKind, InstantiatorErrorKind, RegistryErrorKind, ResolveErrorKind};
pub use finalizer::Finalizer;
pub use inject::{Implements, Inject, InjectField, Injectable};
pub use instantiator::Instantiator;
pub use key::ServiceKey;
pub use lifetime::Lifetime;
pub use scope::Scope;

#[cfg(feature = "macros")]
pub use wiring_macros::Injectable;
