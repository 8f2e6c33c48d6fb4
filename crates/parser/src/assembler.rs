//! Package structure assembly
//!
//! Moves a resolved [`ServiceShapeGraph`] into a [`ServicePackage`] and builds
//! the aggregate packages from finished service packages. Aggregates refer to
//! service packages by name and version only; they never touch their shapes.

use crate::builder::{ServiceShapeGraph, ShapeGraphBuilder};
use crate::metadata::MetadataStore;
use crate::normalizer::SelfReferenceNormalizer;
use crate::resolver::{LiteralResolver, OverloadResolver};
use sdk_stubs_builder_common::{
    BotocoreStubsPackage, BuilderConfig, Client, Discriminator, MasterPackage, PackageExport,
    PackageMetadata, PackageReference, Paginator, ProductLibrary, Result, ServiceName,
    ServicePackage, SessionOverload, SharedDeclarations, StubsPackage,
};
use tracing::debug;

/// Modules mirrored by the transport library stubs
const BOTOCORE_MODULES: &[&str] = &[
    "client",
    "config",
    "exceptions",
    "paginate",
    "session",
    "waiter",
];

/// Build, resolve, normalize and assemble one service package
///
/// `service_names` feeds the `ServiceName` literal union.
pub fn parse_service_package(
    store: &dyn MetadataStore,
    service_name: &ServiceName,
    config: &BuilderConfig,
    library: ProductLibrary,
    version: &str,
    service_names: &[ServiceName],
) -> Result<ServicePackage> {
    let mut graph =
        ShapeGraphBuilder::new(store, service_name.clone(), &config.exclusions).build()?;

    let literals = LiteralResolver::new(config.literals.max_cardinality);
    literals.resolve(&mut graph);
    literals.extend_literals(&mut graph, service_names);

    OverloadResolver::new(config.overloads.clone(), config.literals.max_cardinality)
        .resolve(&mut graph);

    let report = SelfReferenceNormalizer::new(config.normalizer.max_depth)
        .normalize(&mut graph.arena);
    debug!(
        service = %service_name,
        self_referential = report.self_referential.len(),
        degraded = report.degraded.len(),
        "Normalized shape graph"
    );

    assemble_service_package(graph, library, version)
}

/// Move a resolved graph into a service package
pub fn assemble_service_package(
    graph: ServiceShapeGraph,
    library: ProductLibrary,
    version: &str,
) -> Result<ServicePackage> {
    let service_name = graph.service_name;
    let metadata = PackageMetadata::new(
        &service_name.pypi_name(library),
        &service_name.package_module_name(library),
        library,
        version,
    );

    let mut exceptions = Vec::new();
    for id in graph.operations.iter().flat_map(|op| op.errors.iter()) {
        if !exceptions.contains(id) {
            exceptions.push(*id);
        }
    }

    let paginators = graph
        .operations
        .iter()
        .filter_map(|op| {
            op.paginator.as_ref().map(|info| Paginator {
                name: format!("{}Paginator", op.name),
                operation_name: op.name.clone(),
                info: info.clone(),
            })
        })
        .collect();

    let client = Client {
        name: service_name.client_name(),
        methods: graph.operations,
        exceptions,
    };

    ServicePackage::from_parts(
        metadata,
        service_name,
        graph.arena,
        client,
        paginators,
        graph.waiters,
        graph.literals,
    )
}

fn reference(service_name: &ServiceName, library: ProductLibrary, version: &str) -> PackageReference {
    PackageReference {
        pypi_name: service_name.pypi_name(library),
        module_name: service_name.package_module_name(library),
        version: version.to_string(),
    }
}

/// Aggregate package re-exporting every service package
pub fn assemble_master_package(
    packages: &[ServicePackage],
    library: ProductLibrary,
    version: &str,
) -> MasterPackage {
    let services = packages.iter().map(|p| p.metadata().reference()).collect();
    let exports = packages
        .iter()
        .flat_map(|p| {
            let module_name = p.metadata().module_name.clone();
            p.surface().into_iter().map(move |name| PackageExport {
                module_name: module_name.clone(),
                name,
            })
        })
        .collect();

    MasterPackage {
        metadata: PackageMetadata::new(
            library.pypi_prefix(),
            library.module_prefix(),
            library,
            version,
        ),
        services,
        exports,
        shared: SharedDeclarations::default(),
    }
}

/// Aggregate typed stubs with `Session.client` overloads
///
/// The lite variant carries no session overloads.
pub fn assemble_stubs_package(
    service_names: &[ServiceName],
    library: ProductLibrary,
    version: &str,
    lite: bool,
    literals: &LiteralResolver,
) -> StubsPackage {
    let pypi_name = if lite {
        library.lite_pypi_name()
    } else {
        library.stubs_pypi_name()
    };

    let session_overloads = if lite {
        Vec::new()
    } else {
        service_names
            .iter()
            .map(|service_name| SessionOverload {
                discriminator: Discriminator {
                    argument: "service_name".to_string(),
                    value: service_name.name().to_string(),
                },
                module_name: service_name.package_module_name(library),
                return_type: service_name.client_name(),
            })
            .collect()
    };

    StubsPackage {
        metadata: PackageMetadata::new(pypi_name, library.stubs_module_name(), library, version),
        service_names: service_names.to_vec(),
        services: service_names
            .iter()
            .map(|s| reference(s, library, version))
            .collect(),
        session_overloads,
        service_literal: literals.literal_union(
            "ServiceName",
            service_names.iter().map(|s| s.name().to_string()).collect(),
            None,
        ),
        shared: SharedDeclarations::default(),
        lite,
    }
}

/// Stub-only package for the transport library
pub fn assemble_botocore_stubs_package(version: &str) -> BotocoreStubsPackage {
    let mut metadata = PackageMetadata::new(
        "botocore-stubs",
        "botocore-stubs",
        ProductLibrary::Boto3,
        version,
    );
    metadata.library_name = "botocore".to_string();

    BotocoreStubsPackage {
        metadata,
        modules: BOTOCORE_MODULES.iter().map(|m| m.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stubs_session_overloads_follow_service_order() {
        let names = vec![ServiceName::new("ec2", "EC2"), ServiceName::new("s3", "S3")];
        let resolver = LiteralResolver::new(200);

        let stubs = assemble_stubs_package(&names, ProductLibrary::Boto3, "1.34.0", false, &resolver);
        assert_eq!(stubs.metadata.pypi_name, "boto3-stubs");
        let values: Vec<&str> = stubs
            .session_overloads
            .iter()
            .map(|o| o.discriminator.value.as_str())
            .collect();
        assert_eq!(values, vec!["ec2", "s3"]);
        assert_eq!(stubs.session_overloads[1].return_type, "S3Client");
        assert_eq!(stubs.services[0].pypi_name, "mypy-boto3-ec2");

        let lite = assemble_stubs_package(&names, ProductLibrary::Boto3, "1.34.0", true, &resolver);
        assert_eq!(lite.metadata.pypi_name, "boto3-stubs-lite");
        assert!(lite.session_overloads.is_empty());
        assert_eq!(lite.service_literal.values, vec!["ec2", "s3"]);
    }

    #[test]
    fn test_botocore_stubs_package() {
        let package = assemble_botocore_stubs_package("1.34.5");
        assert_eq!(package.metadata.library_name, "botocore");
        assert_eq!(package.metadata.min_library_version, "1.34.0");
        assert!(package.modules.contains(&"client".to_string()));
    }
}
