//! Service metadata type definitions
//!
//! These types mirror the botocore data files: `service-2.json`,
//! `paginators-1.json` and `waiters-2.json`. Member maps keep the declared
//! order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Root `service-2.json` document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceModel {
    /// Format version (e.g., "2.0")
    #[serde(default)]
    pub version: Option<String>,

    /// Naming hints and protocol information
    pub metadata: ServiceMetadata,

    /// Operations by name
    #[serde(default)]
    pub operations: IndexMap<String, OperationDescriptor>,

    /// Shapes by name
    #[serde(default)]
    pub shapes: IndexMap<String, ShapeDescriptor>,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// Service-level metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub endpoint_prefix: Option<String>,

    #[serde(default)]
    pub protocol: Option<String>,

    /// Short display name, e.g. "Amazon S3"
    #[serde(default)]
    pub service_abbreviation: Option<String>,

    /// Full display name, e.g. "Amazon Simple Storage Service"
    #[serde(default)]
    pub service_full_name: Option<String>,

    #[serde(default)]
    pub service_id: Option<String>,

    /// Regions the service is available in; filled from `endpoints.json`
    #[serde(default)]
    pub regions: Vec<String>,
}

impl ServiceMetadata {
    /// Client class name derived from the display name
    ///
    /// "Amazon Simple Queue Service" with abbreviation "Amazon SQS" -> "SQS"
    pub fn class_name(&self) -> Option<String> {
        let name = self
            .service_abbreviation
            .as_deref()
            .or(self.service_full_name.as_deref())?;
        let name = name.replace("Amazon", "").replace("AWS", "");
        let name: String = name.chars().filter(|c| c.is_alphanumeric()).collect();
        if name.is_empty() {
            return None;
        }
        Some(sdk_stubs_builder_common::capitalize(&name))
    }
}

/// Reference from an operation or member to a named shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeRef {
    /// Target shape name
    pub shape: String,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// Operation definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub name: String,

    #[serde(default)]
    pub input: Option<ShapeRef>,

    #[serde(default)]
    pub output: Option<ShapeRef>,

    #[serde(default)]
    pub errors: Vec<ShapeRef>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// Shape definition
///
/// `type_name` is kept as a raw string so kinds the builder does not know are
/// reported instead of silently dropped during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,

    /// Structure members
    #[serde(default)]
    pub members: IndexMap<String, ShapeRef>,

    /// Required structure members
    #[serde(default)]
    pub required: Vec<String>,

    /// List element
    #[serde(default)]
    pub member: Option<ShapeRef>,

    /// Map key
    #[serde(default)]
    pub key: Option<ShapeRef>,

    /// Map value
    #[serde(default)]
    pub value: Option<ShapeRef>,

    /// String enumeration values
    #[serde(default, rename = "enum")]
    pub enum_values: Vec<String>,

    #[serde(default)]
    pub exception: bool,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// A string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Root `paginators-1.json` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginatorsDocument {
    #[serde(default)]
    pub pagination: IndexMap<String, PaginatorDescriptor>,
}

/// Paginator definition keyed by operation name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatorDescriptor {
    pub input_token: OneOrMany,
    pub output_token: OneOrMany,

    #[serde(default)]
    pub limit_key: Option<String>,

    #[serde(default)]
    pub result_key: Option<OneOrMany>,
}

/// Root `waiters-2.json` document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitersDocument {
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub waiters: IndexMap<String, WaiterDescriptor>,
}

/// Waiter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterDescriptor {
    pub operation: String,
    pub delay: u32,
    pub max_attempts: u32,

    #[serde(default)]
    pub acceptors: Vec<serde_json::Value>,
}
