//! Assembled packages handed to the renderer
//!
//! A package owns the shapes it renders. Packages never share shapes: the
//! aggregate packages refer to service packages by distribution name and
//! version only.

use crate::operation::{Discriminator, LiteralUnion, Operation, PaginatorInfo, Waiter};
use crate::service_name::{ProductLibrary, ServiceName};
use crate::shape::{ShapeArena, ShapeId, ShapeKind};
use crate::{BuilderError, Result};
use std::collections::HashSet;

/// Name and version information shared by every package kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub pypi_name: String,
    pub module_name: String,
    pub version: String,
    pub library_name: String,
    pub library_version: String,
    /// Lowest library version the package supports
    pub min_library_version: String,
}

impl PackageMetadata {
    pub fn new(
        pypi_name: &str,
        module_name: &str,
        library: ProductLibrary,
        library_version: &str,
    ) -> Self {
        Self {
            pypi_name: pypi_name.to_string(),
            module_name: module_name.to_string(),
            version: library_version.to_string(),
            library_name: library.library_name().to_string(),
            library_version: library_version.to_string(),
            min_library_version: min_build_version(library_version),
        }
    }

    /// Reference usable by other packages
    pub fn reference(&self) -> PackageReference {
        PackageReference {
            pypi_name: self.pypi_name.clone(),
            module_name: self.module_name.clone(),
            version: self.version.clone(),
        }
    }
}

/// Lowest compatible version for a build: `1.2.3` -> `1.2.0`
pub fn min_build_version(version: &str) -> String {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() < 2 {
        return version.to_string();
    }
    format!("{}.{}.0", parts[0], parts[1])
}

/// Cross-package reference resolved by name and version at render time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub pypi_name: String,
    pub module_name: String,
    pub version: String,
}

/// Service client
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    /// Class name, e.g. `S3Client`
    pub name: String,
    pub methods: Vec<Operation>,
    /// Exception structures, deduplicated, in first-seen order
    pub exceptions: Vec<ShapeId>,
}

/// Paginator bound to one client operation
#[derive(Debug, Clone, PartialEq)]
pub struct Paginator {
    /// Class name, e.g. `ListObjectsV2Paginator`
    pub name: String,
    /// Operation whose arguments and output the paginator reuses
    pub operation_name: String,
    pub info: PaginatorInfo,
}

/// Per-service stubs package
#[derive(Debug, Clone)]
pub struct ServicePackage {
    metadata: PackageMetadata,
    service_name: ServiceName,
    arena: ShapeArena,
    client: Client,
    paginators: Vec<Paginator>,
    waiters: Vec<Waiter>,
    typed_dicts: Vec<ShapeId>,
    literals: Vec<LiteralUnion>,
}

impl ServicePackage {
    /// Assemble a package from resolved parts
    ///
    /// Fails if a shape reachable from the client is missing from the
    /// package's declarations.
    pub fn from_parts(
        metadata: PackageMetadata,
        service_name: ServiceName,
        arena: ShapeArena,
        client: Client,
        paginators: Vec<Paginator>,
        waiters: Vec<Waiter>,
        literals: Vec<LiteralUnion>,
    ) -> Result<Self> {
        let mut package = Self {
            metadata,
            service_name,
            arena,
            client,
            paginators,
            waiters,
            typed_dicts: Vec::new(),
            literals,
        };
        let typed_dicts: Vec<ShapeId> = package
            .reachable_shapes()
            .into_iter()
            .filter(|id| {
                package
                    .arena
                    .get(*id)
                    .as_structure()
                    .is_some_and(|s| !s.is_exception)
            })
            .collect();
        package.typed_dicts = typed_dicts;
        package.validate_closed()?;
        Ok(package)
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn service_name(&self) -> &ServiceName {
        &self.service_name
    }

    pub fn shapes(&self) -> &ShapeArena {
        &self.arena
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn paginators(&self) -> &[Paginator] {
        &self.paginators
    }

    pub fn waiters(&self) -> &[Waiter] {
        &self.waiters
    }

    /// Structures rendered as typed dicts, in discovery order
    pub fn typed_dicts(&self) -> &[ShapeId] {
        &self.typed_dicts
    }

    pub fn literals(&self) -> &[LiteralUnion] {
        &self.literals
    }

    pub fn set_version(&mut self, version: &str) {
        self.metadata.version = version.to_string();
    }

    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.client.methods.iter().find(|op| op.name == name)
    }

    /// Literal union derived from an enum shape
    pub fn literal_for(&self, shape: ShapeId) -> Option<&LiteralUnion> {
        self.literals.iter().find(|l| l.shape == Some(shape))
    }

    pub fn literal(&self, name: &str) -> Option<&LiteralUnion> {
        self.literals.iter().find(|l| l.name == name)
    }

    /// Every shape reachable from the client's operations and exceptions
    pub fn reachable_shapes(&self) -> Vec<ShapeId> {
        let roots = self
            .client
            .methods
            .iter()
            .flat_map(|op| {
                op.input
                    .into_iter()
                    .chain(op.output)
                    .chain(op.arguments.iter().map(|a| a.shape))
                    .chain(op.errors.iter().copied())
            })
            .chain(self.client.exceptions.iter().copied());
        self.arena.reachable_from(roots)
    }

    /// Names this package exports
    pub fn surface(&self) -> Vec<String> {
        let mut names = vec![self.client.name.clone()];
        names.extend(self.paginators.iter().map(|p| p.name.clone()));
        names.extend(self.waiters.iter().map(|w| format!("{}Waiter", w.name)));
        names.extend(self.literals.iter().map(|l| l.name.clone()));
        names.extend(
            self.typed_dicts
                .iter()
                .map(|id| format!("{}TypeDef", self.arena.get(*id).name())),
        );
        names
    }

    /// Check that everything the renderer will look up is declared here
    pub fn validate_closed(&self) -> Result<()> {
        let typed_dicts: HashSet<ShapeId> = self.typed_dicts.iter().copied().collect();

        for id in self.reachable_shapes() {
            let shape = self.arena.try_get(id).ok_or_else(|| {
                BuilderError::Generation(format!(
                    "Shape {:?} referenced by {} is not in the package",
                    id, self.metadata.pypi_name
                ))
            })?;

            match shape.kind() {
                ShapeKind::Pending => {
                    return Err(BuilderError::Generation(format!(
                        "Shape {} was never populated",
                        shape.origin()
                    )));
                }
                ShapeKind::Structure(s) if !s.is_exception && !typed_dicts.contains(&id) => {
                    return Err(BuilderError::Generation(format!(
                        "Structure {} is not declared as a typed dict",
                        shape.origin()
                    )));
                }
                ShapeKind::Enum(_) if self.literal_for(id).is_none() => {
                    return Err(BuilderError::Generation(format!(
                        "Enum {} has no literal declaration",
                        shape.origin()
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Name re-exported by an aggregate package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
    /// Module the name is imported from
    pub module_name: String,
    pub name: String,
}

/// Declarations every service shares; emitted once per aggregate package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDeclarations {
    pub exceptions: Vec<String>,
    pub session: String,
}

impl Default for SharedDeclarations {
    fn default() -> Self {
        Self {
            exceptions: vec!["BotocoreClientError".to_string()],
            session: "Session".to_string(),
        }
    }
}

/// Aggregate package exposing every service
#[derive(Debug, Clone, PartialEq)]
pub struct MasterPackage {
    pub metadata: PackageMetadata,
    pub services: Vec<PackageReference>,
    pub exports: Vec<PackageExport>,
    pub shared: SharedDeclarations,
}

/// `Session.client()` overload for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOverload {
    pub discriminator: Discriminator,
    pub module_name: String,
    pub return_type: String,
}

/// Aggregate typed stubs for the runtime library
#[derive(Debug, Clone, PartialEq)]
pub struct StubsPackage {
    pub metadata: PackageMetadata,
    pub service_names: Vec<ServiceName>,
    pub services: Vec<PackageReference>,
    /// Emitted in service order; empty for the lite variant
    pub session_overloads: Vec<SessionOverload>,
    pub service_literal: LiteralUnion,
    pub shared: SharedDeclarations,
    pub lite: bool,
}

/// Stub-only package for the lower-level transport library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotocoreStubsPackage {
    pub metadata: PackageMetadata,
    pub modules: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Field, ScalarKind, StructureShape};
    use crate::Argument;

    fn client_with(methods: Vec<Operation>) -> Client {
        Client {
            name: "S3Client".to_string(),
            methods,
            exceptions: vec![],
        }
    }

    fn operation(input: ShapeId) -> Operation {
        Operation {
            name: "PutObject".to_string(),
            method_name: "put_object".to_string(),
            arguments: vec![Argument::new("Bucket", input, true)],
            input: Some(input),
            output: None,
            errors: vec![],
            deprecated: false,
            documentation: None,
            paginator: None,
            overloads: vec![],
        }
    }

    #[test]
    fn test_min_build_version() {
        assert_eq!(min_build_version("1.34.12"), "1.34.0");
        assert_eq!(min_build_version("2.5"), "2.5.0");
        assert_eq!(min_build_version("latest"), "latest");
    }

    #[test]
    fn test_from_parts_collects_typed_dicts() {
        let mut arena = ShapeArena::new();
        let string = arena.register("s3/String", ShapeKind::Scalar(ScalarKind::String));
        let request = arena.register(
            "s3/PutObjectRequest",
            ShapeKind::Structure(StructureShape {
                fields: vec![Field::new("Bucket", string, true)],
                ..Default::default()
            }),
        );

        let package = ServicePackage::from_parts(
            PackageMetadata::new("mypy-boto3-s3", "mypy_boto3_s3", ProductLibrary::Boto3, "1.0.0"),
            ServiceName::new("s3", "S3"),
            arena,
            client_with(vec![operation(request)]),
            vec![],
            vec![],
            vec![],
        )
        .unwrap();

        assert_eq!(package.typed_dicts(), &[request]);
        assert!(package.surface().contains(&"PutObjectRequestTypeDef".to_string()));
    }

    #[test]
    fn test_validate_rejects_enum_without_literal() {
        let mut arena = ShapeArena::new();
        let e = arena.register(
            "s3/Encryption",
            ShapeKind::Enum(crate::EnumShape {
                values: vec!["AES256".to_string()],
            }),
        );

        let result = ServicePackage::from_parts(
            PackageMetadata::new("mypy-boto3-s3", "mypy_boto3_s3", ProductLibrary::Boto3, "1.0.0"),
            ServiceName::new("s3", "S3"),
            arena,
            client_with(vec![operation(e)]),
            vec![],
            vec![],
            vec![],
        );

        assert!(matches!(result, Err(BuilderError::Generation(_))));
    }
}
