//! Type graph builder
//!
//! Walks one service's metadata depth-first and registers every shape in a
//! private [`ShapeArena`]. A shape is reserved before its children are
//! visited, so a member that points back at a shape under construction gets
//! the cached id instead of recursing again.

use crate::metadata::{MetadataStore, ShapeDescriptor};
use sdk_stubs_builder_common::{
    to_snake_case, Argument, BuilderError, EnumShape, ExclusionPolicy, Field, LiteralUnion,
    Operation, PaginatorInfo, Reservation, Result, ScalarKind, ServiceName, ShapeArena, ShapeId,
    ShapeKind, StructureShape, Waiter,
};
use std::collections::HashSet;
use tracing::debug;

/// Shapes and operations of one service, before packaging
#[derive(Debug, Clone)]
pub struct ServiceShapeGraph {
    pub service_name: ServiceName,
    pub arena: ShapeArena,
    pub operations: Vec<Operation>,
    pub waiters: Vec<Waiter>,
    /// Regions the service is available in
    pub regions: Vec<String>,
    /// Filled by the literal resolver
    pub literals: Vec<LiteralUnion>,
}

impl ServiceShapeGraph {
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Builds a [`ServiceShapeGraph`] from a metadata store
pub struct ShapeGraphBuilder<'a> {
    store: &'a dyn MetadataStore,
    service_name: ServiceName,
    exclusions: &'a ExclusionPolicy,
    arena: ShapeArena,
}

impl<'a> ShapeGraphBuilder<'a> {
    pub fn new(
        store: &'a dyn MetadataStore,
        service_name: ServiceName,
        exclusions: &'a ExclusionPolicy,
    ) -> Self {
        Self {
            store,
            service_name,
            exclusions,
            arena: ShapeArena::new(),
        }
    }

    /// Shapes registered so far
    pub fn arena(&self) -> &ShapeArena {
        &self.arena
    }

    /// Build every operation, paginator and waiter of the service
    pub fn build(mut self) -> Result<ServiceShapeGraph> {
        let service = self.service_name.name().to_string();
        let metadata = self.store.service_metadata(&service)?;
        let paginators = self.store.paginators(&service)?;

        let mut operations = Vec::new();
        for name in self.store.list_operations(&service)? {
            if self.exclusions.is_operation_excluded(&service, &name) {
                debug!(service = %service, operation = %name, "Skipping excluded operation");
                continue;
            }

            if let Some(mut operation) = self.build_operation(&name)? {
                operation.paginator = paginators.pagination.get(&name).map(|p| {
                    let p = p.clone();
                    PaginatorInfo {
                        input_token: p.input_token.into_vec(),
                        output_token: p.output_token.into_vec(),
                        limit_key: p.limit_key,
                        result_key: p.result_key.map(|r| r.into_vec()).unwrap_or_default(),
                    }
                });
                operations.push(operation);
            }
        }

        let waiters = self
            .store
            .waiters(&service)?
            .waiters
            .into_iter()
            .filter_map(|(name, waiter)| {
                if operations.iter().any(|op| op.name == waiter.operation) {
                    Some(Waiter {
                        name,
                        operation: waiter.operation,
                        delay: waiter.delay,
                        max_attempts: waiter.max_attempts,
                    })
                } else {
                    debug!(service = %service, waiter = %name, "Skipping waiter for missing operation");
                    None
                }
            })
            .collect();

        let pending = self.arena.find_pending();
        if !pending.is_empty() {
            return Err(BuilderError::Metadata(format!(
                "Shapes left unresolved in {}: {}",
                service,
                pending.join(", ")
            )));
        }

        debug!(
            service = %service,
            operations = operations.len(),
            shapes = self.arena.len(),
            "Built shape graph"
        );

        Ok(ServiceShapeGraph {
            service_name: self.service_name,
            arena: self.arena,
            operations,
            waiters,
            regions: metadata.regions,
            literals: Vec::new(),
        })
    }

    fn build_operation(&mut self, name: &str) -> Result<Option<Operation>> {
        let service = self.service_name.name().to_string();
        let descriptor = self.store.get_operation(&service, name)?;

        if descriptor.deprecated && self.exclusions.skip_deprecated {
            debug!(service = %service, operation = %name, "Skipping deprecated operation");
            return Ok(None);
        }

        if let Some(input) = &descriptor.input {
            if self.exclusions.is_shape_excluded(&service, &input.shape) {
                debug!(
                    service = %service,
                    operation = %name,
                    shape = %input.shape,
                    "Skipping operation with excluded input shape"
                );
                return Ok(None);
            }
        }

        let input = descriptor
            .input
            .as_ref()
            .map(|r| self.resolve_shape(&r.shape))
            .transpose()?;

        let output = match &descriptor.output {
            Some(r) if !self.exclusions.is_shape_excluded(&service, &r.shape) => {
                Some(self.resolve_shape(&r.shape)?)
            }
            _ => None,
        };

        let mut errors = Vec::new();
        for error in &descriptor.errors {
            if self.exclusions.is_shape_excluded(&service, &error.shape) {
                continue;
            }
            errors.push(self.resolve_shape(&error.shape)?);
        }

        let arguments = input
            .and_then(|id| self.arena.get(id).as_structure())
            .map(|s| {
                s.fields
                    .iter()
                    .map(|f| Argument::new(f.name.clone(), f.shape, f.required))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(Operation {
            name: name.to_string(),
            method_name: to_snake_case(name),
            arguments,
            input,
            output,
            errors,
            deprecated: descriptor.deprecated,
            documentation: descriptor.documentation,
            paginator: None,
            overloads: Vec::new(),
        }))
    }

    /// Resolve a shape by name, registering it and its children on first visit
    pub fn resolve_shape(&mut self, name: &str) -> Result<ShapeId> {
        let origin = format!("{}/{}", self.service_name.name(), name);
        let id = match self.arena.reserve(&origin) {
            Reservation::Existing(id) => return Ok(id),
            Reservation::New(id) => id,
        };

        let descriptor = self.store.get_shape(self.service_name.name(), name)?;
        let kind = self.shape_kind(&origin, &descriptor)?;
        self.arena.complete(id, kind);
        self.arena.set_documentation(id, descriptor.documentation);
        Ok(id)
    }

    fn shape_kind(&mut self, origin: &str, descriptor: &ShapeDescriptor) -> Result<ShapeKind> {
        let kind = match descriptor.type_name.as_str() {
            "structure" => ShapeKind::Structure(self.structure(descriptor)?),
            "list" => {
                let member = self.child(origin, "member", descriptor.member.as_ref())?;
                ShapeKind::List { member }
            }
            "map" => {
                let key = self.child(origin, "key", descriptor.key.as_ref())?;
                let value = self.child(origin, "value", descriptor.value.as_ref())?;
                ShapeKind::Map { key, value }
            }
            "string" if !descriptor.enum_values.is_empty() => ShapeKind::Enum(EnumShape {
                values: descriptor.enum_values.clone(),
            }),
            "string" => ShapeKind::Scalar(ScalarKind::String),
            "integer" | "long" | "short" | "byte" => ShapeKind::Scalar(ScalarKind::Integer),
            "float" | "double" => ShapeKind::Scalar(ScalarKind::Float),
            "boolean" => ShapeKind::Scalar(ScalarKind::Boolean),
            "timestamp" => ShapeKind::Scalar(ScalarKind::Timestamp),
            "blob" => ShapeKind::Scalar(ScalarKind::Binary),
            other => {
                return Err(BuilderError::UnsupportedShapeKind {
                    origin: origin.to_string(),
                    kind: other.to_string(),
                })
            }
        };
        Ok(kind)
    }

    fn structure(&mut self, descriptor: &ShapeDescriptor) -> Result<StructureShape> {
        let service = self.service_name.name().to_string();
        let mut fields = Vec::with_capacity(descriptor.members.len());

        for (member_name, member) in &descriptor.members {
            if self.is_excluded(&member.shape)? {
                debug!(
                    service = %service,
                    member = %member_name,
                    shape = %member.shape,
                    "Dropping member with excluded shape"
                );
                continue;
            }

            let shape = self.resolve_shape(&member.shape)?;
            let required = descriptor.required.iter().any(|r| r == member_name);
            let mut field = Field::new(member_name.clone(), shape, required);
            field.documentation = member.documentation.clone();
            fields.push(field);
        }

        Ok(StructureShape {
            fields,
            is_exception: descriptor.exception,
            ..Default::default()
        })
    }

    /// Whether a shape is excluded, directly or through a list or map element
    ///
    /// Structures are not followed: they drop their own excluded members.
    fn is_excluded(&self, name: &str) -> Result<bool> {
        let service = self.service_name.name();
        let mut stack = vec![name.to_string()];
        let mut seen = HashSet::new();

        while let Some(name) = stack.pop() {
            if self.exclusions.is_shape_excluded(service, &name) {
                return Ok(true);
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            let descriptor = self.store.get_shape(service, &name)?;
            if matches!(descriptor.type_name.as_str(), "list" | "map") {
                stack.extend(
                    [&descriptor.member, &descriptor.key, &descriptor.value]
                        .into_iter()
                        .flatten()
                        .map(|r| r.shape.clone()),
                );
            }
        }
        Ok(false)
    }

    fn child(
        &mut self,
        origin: &str,
        role: &str,
        reference: Option<&crate::metadata::ShapeRef>,
    ) -> Result<ShapeId> {
        let reference = reference.ok_or_else(|| {
            BuilderError::Metadata(format!("Shape {} has no {} reference", origin, role))
        })?;
        self.resolve_shape(&reference.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryMetadataStore;

    const SERVICE_JSON: &str = r#"{
        "metadata": {"serviceAbbreviation": "Amazon S3"},
        "operations": {
            "GetThing": {
                "name": "GetThing",
                "input": {"shape": "GetThingRequest"},
                "output": {"shape": "Thing"}
            }
        },
        "shapes": {
            "GetThingRequest": {
                "type": "structure",
                "required": ["Id"],
                "members": {
                    "Id": {"shape": "String"},
                    "Version": {"shape": "Long"}
                }
            },
            "Thing": {
                "type": "structure",
                "members": {
                    "Id": {"shape": "String"},
                    "Tags": {"shape": "TagMap"}
                }
            },
            "TagMap": {
                "type": "map",
                "key": {"shape": "String"},
                "value": {"shape": "String"}
            },
            "String": {"type": "string"},
            "Long": {"type": "long"}
        }
    }"#;

    #[test]
    fn test_resolve_shape_returns_cached_id() {
        let store = InMemoryMetadataStore::new();
        store.add_service_json("s3", SERVICE_JSON).unwrap();
        let exclusions = ExclusionPolicy::default();
        let mut builder = ShapeGraphBuilder::new(&store, ServiceName::new("s3", "S3"), &exclusions);

        let first = builder.resolve_shape("Thing").unwrap();
        let second = builder.resolve_shape("Thing").unwrap();
        assert_eq!(first, second);

        // Thing, String, TagMap
        assert_eq!(builder.arena().len(), 3);
    }

    #[test]
    fn test_build_arguments() {
        let store = InMemoryMetadataStore::new();
        store.add_service_json("s3", SERVICE_JSON).unwrap();
        let exclusions = ExclusionPolicy::default();
        let graph = ShapeGraphBuilder::new(&store, ServiceName::new("s3", "S3"), &exclusions)
            .build()
            .unwrap();

        let op = graph.operation("GetThing").unwrap();
        assert_eq!(op.method_name, "get_thing");
        assert!(op.argument("Id").unwrap().required);
        assert!(!op.argument("Version").unwrap().required);
        assert_eq!(
            graph.arena.get(op.argument("Version").unwrap().shape).kind(),
            &ShapeKind::Scalar(ScalarKind::Integer)
        );
        assert!(graph.arena.find_pending().is_empty());
    }

    #[test]
    fn test_unknown_member_shape_is_error() {
        let store = InMemoryMetadataStore::new();
        store
            .add_service_json(
                "s3",
                r#"{"metadata": {}, "shapes": {
                    "Broken": {"type": "structure", "members": {"X": {"shape": "Missing"}}}
                }}"#,
            )
            .unwrap();
        let exclusions = ExclusionPolicy::default();
        let mut builder = ShapeGraphBuilder::new(&store, ServiceName::new("s3", "S3"), &exclusions);

        assert!(matches!(
            builder.resolve_shape("Broken"),
            Err(BuilderError::Metadata(_))
        ));
    }
}
