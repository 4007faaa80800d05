use alloc::{borrow::Cow, sync::Arc, vec::Vec};

use crate::{
    dependency::{Dependency, DependencyPosition, FieldInjection},
    errors::BuildErrorKind,
    key::ServiceKey,
};

/// Where the dependencies of a registration come from. Read once, when the container is built.
#[derive(Clone)]
pub(crate) enum SchemaSource {
    Empty,
    Arguments(fn() -> Vec<Dependency>),
    Explicit(Arc<[Dependency]>),
    Fields(fn() -> Vec<FieldInjection>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldDependency {
    pub(crate) position: usize,
    pub(crate) name: &'static str,
    pub(crate) dependency: Dependency,
}

/// Parsed dependencies of a registration: factory arguments first, then injected fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InjectionSchema {
    pub(crate) arguments: Vec<Dependency>,
    pub(crate) fields: Vec<FieldDependency>,
}

impl InjectionSchema {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.arguments.len() + self.fields.len()
    }

    pub(crate) fn dependencies(&self) -> impl Iterator<Item = (DependencyPosition, &Dependency)> {
        self.arguments
            .iter()
            .enumerate()
            .map(|(index, dependency)| (DependencyPosition::Argument(index), dependency))
            .chain(self.fields.iter().map(|field| {
                (
                    DependencyPosition::Field {
                        position: field.position,
                        name: field.name,
                    },
                    &field.dependency,
                )
            }))
    }
}

/// Parsed form of `#[inject("..")]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Annotation<'a> {
    pub(crate) name: Option<&'a str>,
    pub(crate) optional: bool,
}

#[inline]
fn is_optional_marker(marker: &str) -> bool {
    marker == "?" || marker == "optional"
}

/// Parses an injection annotation:
/// - `""`: unnamed, required
/// - `"name"`: named, required
/// - `"?"` or `"optional"`: unnamed, optional
/// - `"name,?"` or `"name,optional"`: named, optional
pub(crate) fn parse_annotation(annotation: &str) -> Result<Annotation<'_>, &'static str> {
    let mut parts = annotation.split(',').map(str::trim);
    let head = parts.next().unwrap_or_default();
    let marker = parts.next();

    if parts.next().is_some() {
        return Err("expected at most one comma");
    }

    match marker {
        None if is_optional_marker(head) => Ok(Annotation { name: None, optional: true }),
        None => Ok(Annotation {
            name: Some(head).filter(|name| !name.is_empty()),
            optional: false,
        }),
        Some(marker) if is_optional_marker(marker) => {
            if head.is_empty() {
                return Err("expected a name before the comma");
            }
            Ok(Annotation {
                name: Some(head),
                optional: true,
            })
        }
        Some("") => Err("expected `?` or `optional` after the comma"),
        Some(_) => Err("unknown marker after the comma, expected `?` or `optional`"),
    }
}

/// Builds the injection schema of `owner`, validating field annotations
pub(crate) fn analyze(owner: &ServiceKey, source: &SchemaSource) -> Result<InjectionSchema, BuildErrorKind> {
    match source {
        SchemaSource::Empty => Ok(InjectionSchema::default()),
        SchemaSource::Arguments(describe) => Ok(InjectionSchema {
            arguments: describe(),
            fields: Vec::new(),
        }),
        SchemaSource::Explicit(dependencies) => Ok(InjectionSchema {
            arguments: dependencies.to_vec(),
            fields: Vec::new(),
        }),
        SchemaSource::Fields(describe) => {
            let fields = describe()
                .into_iter()
                .map(|field| analyze_field(owner, field))
                .collect::<Result<_, _>>()?;
            Ok(InjectionSchema {
                arguments: Vec::new(),
                fields,
            })
        }
    }
}

fn analyze_field(owner: &ServiceKey, field: FieldInjection) -> Result<FieldDependency, BuildErrorKind> {
    let Annotation { name, optional } =
        parse_annotation(field.annotation).map_err(|reason| BuildErrorKind::MalformedAnnotation {
            owner: owner.clone(),
            field: field.field_name,
            annotation: field.annotation,
            reason,
        })?;

    if optional && !field.allows_absent {
        return Err(BuildErrorKind::OptionalWithoutDefault {
            owner: owner.clone(),
            field: field.field_name,
        });
    }

    Ok(FieldDependency {
        position: field.position,
        name: field.field_name,
        dependency: Dependency {
            key: ServiceKey::new(field.type_info, name.map(Cow::Borrowed)),
            optional,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::{analyze, parse_annotation, Annotation, SchemaSource};
    use crate::{
        dependency::{Dependency, DependencyPosition, FieldInjection},
        errors::BuildErrorKind,
        key::ServiceKey,
    };

    use alloc::{sync::Arc, vec, vec::Vec};

    struct Logger;
    struct Owner;

    #[test]
    fn test_parse_annotation() {
        let cases = [
            ("", None, false),
            ("  ", None, false),
            ("primary", Some("primary"), false),
            (" primary ", Some("primary"), false),
            ("?", None, true),
            ("optional", None, true),
            ("primary,?", Some("primary"), true),
            ("primary , optional", Some("primary"), true),
        ];

        for (annotation, name, optional) in cases {
            assert_eq!(parse_annotation(annotation), Ok(Annotation { name, optional }), "{annotation:?}");
        }
    }

    #[test]
    fn test_parse_malformed_annotation() {
        for annotation in ["primary,", "primary,required", ",?", "a,?,?"] {
            assert!(parse_annotation(annotation).is_err(), "{annotation:?}");
        }
    }

    fn fields() -> Vec<FieldInjection> {
        vec![
            FieldInjection::new::<Arc<Logger>>(0, "logger", ""),
            FieldInjection::new::<Option<Arc<Logger>>>(2, "audit", "audit,?"),
        ]
    }

    fn required_optional_field() -> Vec<FieldInjection> {
        vec![FieldInjection::new::<Arc<Logger>>(0, "logger", "?")]
    }

    fn malformed_field() -> Vec<FieldInjection> {
        vec![FieldInjection::new::<Arc<Logger>>(1, "logger", "a,b,c")]
    }

    #[test]
    fn test_analyze_fields() {
        let owner = ServiceKey::of::<Owner>();
        let schema = analyze(&owner, &SchemaSource::Fields(fields)).unwrap();

        assert_eq!(schema.len(), 2);
        let dependencies: Vec<_> = schema.dependencies().collect();
        assert_eq!(
            dependencies,
            vec![
                (
                    DependencyPosition::Field { position: 0, name: "logger" },
                    &Dependency::of::<Logger>()
                ),
                (
                    DependencyPosition::Field { position: 2, name: "audit" },
                    &Dependency::named::<Logger>("audit").optional()
                ),
            ]
        );
    }

    #[test]
    fn test_analyze_field_errors() {
        let owner = ServiceKey::of::<Owner>();

        assert!(matches!(
            analyze(&owner, &SchemaSource::Fields(required_optional_field)),
            Err(BuildErrorKind::OptionalWithoutDefault { field: "logger", .. })
        ));
        assert!(matches!(
            analyze(&owner, &SchemaSource::Fields(malformed_field)),
            Err(BuildErrorKind::MalformedAnnotation {
                field: "logger",
                annotation: "a,b,c",
                ..
            })
        ));
    }

    #[test]
    fn test_analyze_arguments() {
        let owner = ServiceKey::of::<Owner>();
        let explicit: Arc<[Dependency]> = Arc::from(vec![Dependency::of::<Logger>()]);

        let schema = analyze(&owner, &SchemaSource::Explicit(explicit)).unwrap();
        assert_eq!(
            schema.dependencies().map(|(position, _)| position).collect::<Vec<_>>(),
            vec![DependencyPosition::Argument(0)]
        );
        assert_eq!(analyze(&owner, &SchemaSource::Empty).unwrap().len(), 0);
    }
}
