//! Package processors
//!
//! Each processor resolves the version a package is built with, assembles the
//! package and writes it. A processor returns `Ok(None)` when the version
//! policy skips the package.

use crate::version_registry::{VersionPolicy, VersionRegistry};
use crate::writer::PackageWriter;
use rayon::prelude::*;
use sdk_stubs_builder_common::{
    BotocoreStubsPackage, BuilderConfig, MasterPackage, ProductLibrary, Result, ServiceName,
    ServicePackage, StubsPackage,
};
use sdk_stubs_builder_parser::{
    assemble_botocore_stubs_package, assemble_master_package, assemble_stubs_package,
    parse_service_package, LiteralResolver, MetadataStore,
};
use tracing::{debug, info, warn};

/// Everything a processor reads
///
/// Shared by reference across rayon workers, so every member is `Sync`.
pub struct ProcessorContext<'a> {
    pub store: &'a dyn MetadataStore,
    pub config: &'a BuilderConfig,
    pub registry: &'a dyn VersionRegistry,
    pub policy: VersionPolicy,
    pub writer: &'a PackageWriter,
    pub library: ProductLibrary,
    /// Runtime library version the packages are generated against
    pub library_version: String,
    /// Services known to the build, used for `ServiceName` literals
    pub service_names: Vec<ServiceName>,
}

impl ProcessorContext<'_> {
    fn package_version(&self, pypi_name: &str, version: &str) -> Result<Option<String>> {
        let resolved = self
            .policy
            .package_version(self.registry, pypi_name, version)?;
        match &resolved {
            Some(resolved) if resolved != version => {
                debug!(package = pypi_name, version = %resolved, "Bumped package version")
            }
            None => info!(package = pypi_name, version, "Skipping published package"),
            _ => {}
        }
        Ok(resolved)
    }

    fn parse(&self, service_name: &ServiceName) -> Result<ServicePackage> {
        parse_service_package(
            self.store,
            service_name,
            self.config,
            self.library,
            &self.library_version,
            &self.service_names,
        )
    }
}

/// Build and write one service package
pub fn process_service(
    ctx: &ProcessorContext<'_>,
    service_name: &ServiceName,
    version: &str,
) -> Result<Option<ServicePackage>> {
    let pypi_name = service_name.pypi_name(ctx.library);
    let Some(version) = ctx.package_version(&pypi_name, version)? else {
        return Ok(None);
    };

    let mut package = ctx.parse(service_name)?;
    package.set_version(&version);
    ctx.writer.write_service_package(&package)?;

    Ok(Some(package))
}

/// Build and write the master package
///
/// Service packages are parsed in parallel. A service that fails to parse is
/// left out of the master package with a warning.
pub fn process_master(ctx: &ProcessorContext<'_>, version: &str) -> Result<Option<MasterPackage>> {
    let Some(master_version) = ctx.package_version(ctx.library.pypi_prefix(), version)? else {
        return Ok(None);
    };

    let packages: Vec<ServicePackage> = ctx
        .service_names
        .par_iter()
        .filter_map(|service_name| match master_service(ctx, service_name, version) {
            Ok(package) => Some(package),
            Err(err) => {
                warn!(service = %service_name, error = %err, "Leaving service out of master package");
                None
            }
        })
        .collect();

    let mut package = assemble_master_package(&packages, ctx.library, &ctx.library_version);
    package.metadata.version = master_version;
    ctx.writer.write_master_package(&package)?;

    Ok(Some(package))
}

/// Service package as the master package references it
///
/// The service carries the version its own package is built with. A service
/// the policy skips keeps the requested version, which is already published.
fn master_service(
    ctx: &ProcessorContext<'_>,
    service_name: &ServiceName,
    version: &str,
) -> Result<ServicePackage> {
    let pypi_name = service_name.pypi_name(ctx.library);
    let service_version = ctx
        .policy
        .package_version(ctx.registry, &pypi_name, version)?
        .unwrap_or_else(|| version.to_string());

    let mut package = ctx.parse(service_name)?;
    package.set_version(&service_version);
    Ok(package)
}

/// Build and write the aggregate stubs package
pub fn process_stubs(
    ctx: &ProcessorContext<'_>,
    service_names: &[ServiceName],
    version: &str,
) -> Result<Option<StubsPackage>> {
    write_stubs(ctx, service_names, version, false)
}

/// Build and write the lite aggregate stubs package
pub fn process_stubs_lite(
    ctx: &ProcessorContext<'_>,
    service_names: &[ServiceName],
    version: &str,
) -> Result<Option<StubsPackage>> {
    write_stubs(ctx, service_names, version, true)
}

fn write_stubs(
    ctx: &ProcessorContext<'_>,
    service_names: &[ServiceName],
    version: &str,
    lite: bool,
) -> Result<Option<StubsPackage>> {
    let pypi_name = if lite {
        ctx.library.lite_pypi_name()
    } else {
        ctx.library.stubs_pypi_name()
    };
    let Some(version) = ctx.package_version(pypi_name, version)? else {
        return Ok(None);
    };

    let literals = LiteralResolver::new(ctx.config.literals.max_cardinality);
    let mut package = assemble_stubs_package(
        service_names,
        ctx.library,
        &ctx.library_version,
        lite,
        &literals,
    );
    package.metadata.version = version;
    ctx.writer.write_stubs_package(&package)?;

    Ok(Some(package))
}

/// Build and write the transport library stubs
pub fn process_botocore_stubs(
    ctx: &ProcessorContext<'_>,
    version: &str,
) -> Result<Option<BotocoreStubsPackage>> {
    let mut package = assemble_botocore_stubs_package(&ctx.library_version);
    let Some(version) = ctx.package_version(&package.metadata.pypi_name, version)? else {
        return Ok(None);
    };

    package.metadata.version = version;
    ctx.writer.write_botocore_stubs_package(&package)?;

    Ok(Some(package))
}
