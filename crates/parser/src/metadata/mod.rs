//! Service metadata access
//!
//! Serde types for the botocore data files and the stores that serve them.

mod store;
mod types;

pub use store::{DirectoryMetadataStore, InMemoryMetadataStore, MetadataStore, ServiceEntry};
pub use types::{
    OneOrMany, OperationDescriptor, PaginatorDescriptor, PaginatorsDocument, ServiceMetadata,
    ServiceModel, ShapeDescriptor, ShapeRef, WaiterDescriptor, WaitersDocument,
};
