//! Common types and utilities for the SDK Stubs Builder
//!
//! This crate contains the shape model, operation and package IR, the
//! service name registry, configuration and error types used across the
//! parser, generator, and CLI components.

pub mod config;
pub mod operation;
pub mod package;
pub mod service_name;
pub mod shape;

pub use config::{
    BuilderConfig, ExclusionPolicy, LiteralPolicy, NormalizerPolicy, OverloadRule,
    RegistryFailurePolicy, VersionRegistryPolicy,
};
pub use operation::{
    Argument, Discriminator, LiteralDecision, LiteralUnion, Operation, OverloadSignature,
    PaginatorInfo, Waiter,
};
pub use package::{
    min_build_version, BotocoreStubsPackage, Client, MasterPackage, PackageExport,
    PackageMetadata, PackageReference, Paginator, ServicePackage, SessionOverload,
    SharedDeclarations, StubsPackage,
};
pub use service_name::{ProductLibrary, ServiceName, ServiceNameCatalog};
pub use shape::{
    EnumShape, Field, Reference, Reservation, ScalarKind, SelfReference, Shape, ShapeArena,
    ShapeId, ShapeKind, StructureShape,
};

use thiserror::Error;

/// Errors that can occur while building stub packages
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Unsupported shape kind '{kind}' at {origin}")]
    UnsupportedShapeKind { origin: String, kind: String },

    #[error("Reference cycle from {origin} did not close within {depth} levels")]
    CyclicReferenceOverflow { origin: String, depth: usize },

    #[error("Version registry unavailable: {0}")]
    VersionRegistryUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuilderError {
    /// Short, stable label for the failure report
    pub fn kind(&self) -> &'static str {
        match self {
            BuilderError::Parse(_) => "ParseError",
            BuilderError::Metadata(_) => "MetadataError",
            BuilderError::UnsupportedShapeKind { .. } => "UnsupportedShapeKind",
            BuilderError::CyclicReferenceOverflow { .. } => "CyclicReferenceOverflow",
            BuilderError::VersionRegistryUnavailable(_) => "VersionRegistryUnavailable",
            BuilderError::Generation(_) => "GenerationError",
            BuilderError::Config(_) => "ConfigError",
            BuilderError::Io(_) => "IoError",
            BuilderError::Json(_) => "JsonError",
        }
    }
}

/// Result type for builder operations
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Convert PascalCase to snake_case
///
/// Used for method names (`DescribeInstances` -> `describe_instances`).
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            // HTTPServer -> http_server: split before the last capital of a run
            let should_add_underscore = i > 0
                && (chars[i - 1].is_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (i + 1 < chars.len() && chars[i + 1].is_lowercase()));

            if should_add_underscore && !result.ends_with('_') {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch == ' ' {
            if !result.is_empty() && !result.ends_with('_') {
                result.push('_');
            }
        } else {
            result.push(ch);
        }
    }

    while result.contains("__") {
        result = result.replace("__", "_");
    }

    result.trim_matches('_').to_string()
}

/// Capitalize the first character
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
