//! Stub package generation for the SDK Stubs Builder
//!
//! This crate turns assembled packages into Python stub distributions:
//! - [`PackageWriter`] renders packages with tera templates
//! - [`processors`] build, version and write one package each
//! - [`StubsGenerator`] runs the processors for a product library
//! - [`VersionRegistry`] decides which version a package is published with

pub mod processors;
pub mod stubs_generator;
mod templates;
pub mod types;
pub mod version_registry;
pub mod writer;

pub use processors::{
    process_botocore_stubs, process_master, process_service, process_stubs, process_stubs_lite,
    ProcessorContext,
};
pub use stubs_generator::{GenerationFailure, GenerationReport, GeneratorOptions, StubsGenerator};
pub use types::TypeRenderer;
pub use version_registry::{next_post_release, PublishedVersions, VersionPolicy, VersionRegistry};
pub use writer::PackageWriter;
