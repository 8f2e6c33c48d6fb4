//! Service metadata parsing for the SDK Stubs Builder
//!
//! This crate turns botocore-style service metadata into assembled packages:
//!
//! 1. [`ShapeGraphBuilder`] walks one service's metadata into a shape graph
//! 2. [`LiteralResolver`] and [`OverloadResolver`] annotate it
//! 3. [`SelfReferenceNormalizer`] breaks reference cycles
//! 4. the [`assembler`] functions move the result into packages
//!
//! Metadata is read through the [`MetadataStore`] trait, so the pipeline does
//! not depend on where the JSON documents come from.

pub mod assembler;
mod builder;
pub mod metadata;
mod normalizer;
mod resolver;

pub use assembler::{
    assemble_botocore_stubs_package, assemble_master_package, assemble_service_package,
    assemble_stubs_package, parse_service_package,
};
pub use builder::{ServiceShapeGraph, ShapeGraphBuilder};
pub use metadata::{DirectoryMetadataStore, InMemoryMetadataStore, MetadataStore};
pub use normalizer::{NormalizeReport, SelfReferenceNormalizer};
pub use resolver::{LiteralResolver, OverloadResolver};

use sdk_stubs_builder_common::{capitalize, Result, ServiceNameCatalog};
use tracing::warn;

/// Register every service of a store in a catalog
///
/// Class names come from the service metadata; services without naming hints
/// use their capitalized short name. A service whose metadata cannot be read
/// is still registered, so its build fails on its own instead of stopping the
/// listing.
pub fn register_services(store: &dyn MetadataStore, catalog: &ServiceNameCatalog) -> Result<()> {
    for service in store.available_services()? {
        let class_name = match store.service_metadata(&service) {
            Ok(metadata) => metadata.class_name(),
            Err(err) => {
                warn!(service = %service, error = %err, "Failed to read service metadata");
                None
            }
        };
        let class_name = class_name.unwrap_or_else(|| capitalize(&service));
        catalog.add(&service, &class_name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_services() {
        let store = InMemoryMetadataStore::new();
        store
            .add_service_json(
                "sqs",
                r#"{"metadata": {"serviceAbbreviation": "Amazon SQS"}}"#,
            )
            .unwrap();
        store
            .add_service_json("custom", r#"{"metadata": {}}"#)
            .unwrap();

        let catalog = ServiceNameCatalog::new("1.34.0");
        register_services(&store, &catalog).unwrap();

        assert_eq!(catalog.get("sqs").unwrap().class_name(), "SQS");
        assert_eq!(catalog.get("custom").unwrap().class_name(), "Custom");
    }

    #[test]
    fn test_register_services_keeps_unreadable_service() {
        let dir = tempfile::tempdir().unwrap();
        let ec2 = dir.path().join("ec2/2016-11-15");
        let broken = dir.path().join("broken/2020-01-01");
        std::fs::create_dir_all(&ec2).unwrap();
        std::fs::create_dir_all(&broken).unwrap();
        std::fs::write(
            ec2.join("service-2.json"),
            r#"{"metadata": {"serviceAbbreviation": "Amazon EC2"}}"#,
        )
        .unwrap();
        std::fs::write(broken.join("service-2.json"), "{not json").unwrap();

        let store = DirectoryMetadataStore::new(dir.path()).unwrap();
        let catalog = ServiceNameCatalog::new("1.34.0");
        register_services(&store, &catalog).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("ec2").unwrap().class_name(), "EC2");
        assert_eq!(catalog.get("broken").unwrap().class_name(), "Broken");
        assert!(store.service("broken").is_err());
    }
}
