//! Product generators
//!
//! A [`StubsGenerator`] drives the processors for one product library. Every
//! package is attempted; failures are collected into a [`GenerationReport`]
//! instead of aborting the remaining packages.

use crate::processors::{
    process_botocore_stubs, process_master, process_service, process_stubs, process_stubs_lite,
    ProcessorContext,
};
use crate::version_registry::{VersionPolicy, VersionRegistry};
use crate::writer::PackageWriter;
use rayon::prelude::*;
use sdk_stubs_builder_common::{BuilderConfig, BuilderError, ProductLibrary, Result, ServiceName};
use sdk_stubs_builder_parser::MetadataStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// Options shared by every package of a run
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub output_path: PathBuf,
    /// Write `pyproject.toml` around each module
    pub generate_setup: bool,
    /// Generating for in-place installation instead of distribution
    pub installed: bool,
    /// Version of the runtime library the stubs describe
    pub library_version: String,
    /// Version packages are published with
    pub build_version: String,
    /// Only selected services get `Session.client` overloads
    pub partial_overload: bool,
    pub skip_published: bool,
    pub disable_smart_version: bool,
}

/// One package that could not be generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub name: String,
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of a generator run
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Generated packages as `pypi_name==version`
    pub generated: Vec<String>,
    /// Packages skipped by the version policy
    pub skipped: Vec<String>,
    pub failures: Vec<GenerationFailure>,
}

impl GenerationReport {
    pub fn merge(&mut self, other: GenerationReport) {
        self.generated.extend(other.generated);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    /// Some package failed and none was generated
    pub fn is_total_failure(&self) -> bool {
        self.generated.is_empty() && !self.failures.is_empty()
    }

    fn record<T, F>(&mut self, name: &str, result: Result<Option<T>>, describe: F)
    where
        F: Fn(&T) -> String,
    {
        match result {
            Ok(Some(package)) => self.generated.push(describe(&package)),
            Ok(None) => self.skipped.push(name.to_string()),
            Err(err) => {
                warn!(package = name, kind = err.kind(), error = %err, "Package generation failed");
                self.failures.push(GenerationFailure {
                    name: name.to_string(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }
}

/// Generator for one product library
pub struct StubsGenerator<'a> {
    library: ProductLibrary,
    options: GeneratorOptions,
    store: &'a dyn MetadataStore,
    config: &'a BuilderConfig,
    registry: &'a dyn VersionRegistry,
    writer: PackageWriter,
    /// Services requested for this run
    selected: Vec<ServiceName>,
    /// Every service the metadata store provides
    available: Vec<ServiceName>,
}

impl<'a> StubsGenerator<'a> {
    pub fn new(
        library: ProductLibrary,
        options: GeneratorOptions,
        store: &'a dyn MetadataStore,
        config: &'a BuilderConfig,
        registry: &'a dyn VersionRegistry,
        selected: Vec<ServiceName>,
        available: Vec<ServiceName>,
    ) -> Result<Self> {
        if options.library_version.is_empty() {
            return Err(BuilderError::Config(format!(
                "No {} version given",
                library.library_name()
            )));
        }

        let writer = PackageWriter::new(&options.output_path, options.generate_setup)?;
        Ok(Self {
            library,
            options,
            store,
            config,
            registry,
            writer,
            selected,
            available,
        })
    }

    pub fn library(&self) -> ProductLibrary {
        self.library
    }

    fn context(&self) -> ProcessorContext<'_> {
        ProcessorContext {
            store: self.store,
            config: self.config,
            registry: self.registry,
            policy: VersionPolicy {
                skip_published: self.options.skip_published,
                disable_smart_version: self.options.disable_smart_version,
                on_unavailable: self.config.version_registry.on_unavailable,
            },
            writer: &self.writer,
            library: self.library,
            library_version: self.options.library_version.clone(),
            service_names: self.available.clone(),
        }
    }

    /// Services that get `Session.client` overloads
    fn overload_services(&self) -> &[ServiceName] {
        if self.options.partial_overload {
            &self.selected
        } else {
            &self.available
        }
    }

    /// Generate the aggregate packages
    ///
    /// The master package is only produced for installed boto3 builds, and
    /// the transport library stubs only for boto3.
    pub fn generate_stubs(&self) -> GenerationReport {
        let ctx = self.context();
        let version = &self.options.build_version;
        let mut report = GenerationReport::default();

        if self.options.installed && self.library == ProductLibrary::Boto3 {
            info!("Generating {} {}", self.library.pypi_prefix(), version);
            report.record(
                self.library.pypi_prefix(),
                process_master(&ctx, version),
                |p| format!("{}=={}", p.metadata.pypi_name, p.metadata.version),
            );
        }

        info!("Generating {} {}", self.library.stubs_pypi_name(), version);
        report.record(
            self.library.stubs_pypi_name(),
            process_stubs(&ctx, self.overload_services(), version),
            |p| format!("{}=={}", p.metadata.pypi_name, p.metadata.version),
        );

        info!("Generating {} {}", self.library.lite_pypi_name(), version);
        report.record(
            self.library.lite_pypi_name(),
            process_stubs_lite(&ctx, self.overload_services(), version),
            |p| format!("{}=={}", p.metadata.pypi_name, p.metadata.version),
        );

        if self.library == ProductLibrary::Boto3 {
            info!("Generating botocore-stubs {}", version);
            report.record(
                "botocore-stubs",
                process_botocore_stubs(&ctx, version),
                |p| format!("{}=={}", p.metadata.pypi_name, p.metadata.version),
            );
        }

        report
    }

    /// Generate one package per selected service, in parallel
    pub fn generate_service_stubs(&self) -> GenerationReport {
        let ctx = self.context();
        let version = &self.options.build_version;
        let total = self.selected.len();

        let results: Vec<GenerationReport> = self
            .selected
            .par_iter()
            .enumerate()
            .map(|(index, service_name)| {
                let pypi_name = service_name.pypi_name(self.library);
                info!(
                    "[{}/{}] Generating {} {}",
                    index + 1,
                    total,
                    service_name.package_module_name(self.library),
                    version
                );

                let mut report = GenerationReport::default();
                report.record(
                    &pypi_name,
                    process_service(&ctx, service_name, version),
                    |p| format!("{}=={}", p.metadata().pypi_name, p.metadata().version),
                );
                report
            })
            .collect();

        let mut report = GenerationReport::default();
        for result in results {
            report.merge(result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_total_failure() {
        let mut report = GenerationReport::default();
        assert!(!report.is_total_failure());

        report.record::<String, _>(
            "mypy-boto3-s3",
            Err(BuilderError::Metadata("missing".to_string())),
            |s| s.clone(),
        );
        assert!(report.is_total_failure());
        assert_eq!(report.failures[0].kind, BuilderError::Metadata(String::new()).kind());

        report.record("mypy-boto3-ec2", Ok(Some("mypy-boto3-ec2==1.0.0".to_string())), |s| {
            s.clone()
        });
        report.record::<String, _>("mypy-boto3-sqs", Ok(None), |s| s.clone());
        assert!(!report.is_total_failure());
        assert_eq!(report.generated, vec!["mypy-boto3-ec2==1.0.0"]);
        assert_eq!(report.skipped, vec!["mypy-boto3-sqs"]);
    }
}
