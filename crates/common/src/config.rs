//! Builder configuration loaded from YAML files
//!
//! Policy values that change between SDK releases (literal cap, exclusion
//! lists, overload rules) live here instead of in code. Every section has a
//! default, so an empty document is a valid configuration.

use crate::{BuilderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Root configuration document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Literal union policy
    pub literals: LiteralPolicy,
    /// Operations and shapes to skip
    pub exclusions: ExclusionPolicy,
    /// Self-reference normalizer limits
    pub normalizer: NormalizerPolicy,
    /// Discriminator rules producing overloaded signatures
    pub overloads: Vec<OverloadRule>,
    /// Behavior when the version registry cannot be reached
    pub version_registry: VersionRegistryPolicy,
}

/// Literal union cap
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LiteralPolicy {
    /// Unions with more values than this degrade to plain strings
    pub max_cardinality: usize,
}

impl Default for LiteralPolicy {
    fn default() -> Self {
        Self {
            max_cardinality: 200,
        }
    }
}

/// Known-unsupported or deprecated operations and shapes
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExclusionPolicy {
    /// Service name -> operation names
    pub operations: HashMap<String, Vec<String>>,
    /// Service name -> shape names
    pub shapes: HashMap<String, Vec<String>>,
    /// Skip operations flagged as deprecated in the metadata
    pub skip_deprecated: bool,
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self {
            operations: HashMap::new(),
            shapes: HashMap::new(),
            skip_deprecated: true,
        }
    }
}

impl ExclusionPolicy {
    pub fn is_operation_excluded(&self, service: &str, operation: &str) -> bool {
        self.operations
            .get(service)
            .is_some_and(|ops| ops.iter().any(|op| op == operation))
    }

    pub fn is_shape_excluded(&self, service: &str, shape: &str) -> bool {
        self.shapes
            .get(service)
            .is_some_and(|shapes| shapes.iter().any(|s| s == shape))
    }
}

/// Normalizer limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizerPolicy {
    /// Maximum traversal depth before a structure is marked degraded
    pub max_depth: usize,
}

impl Default for NormalizerPolicy {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Operation whose signature depends on a discriminator argument value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OverloadRule {
    pub service: String,
    pub operation: String,
    /// Argument whose literal value selects the overload
    pub discriminator: String,
    /// Discriminator value -> arguments that become required for it
    #[serde(default)]
    pub narrowing: BTreeMap<String, Vec<String>>,
}

/// What to do when the version registry fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFailurePolicy {
    /// Treat the requested version as unpublished
    #[default]
    Optimistic,
    /// Fail the package
    Abort,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct VersionRegistryPolicy {
    pub on_unavailable: RegistryFailurePolicy,
}

impl BuilderConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BuilderError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content)
            .map_err(|e| BuilderError::Config(format!("{:?}: {}", path, e)))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| BuilderError::Config(format!("Failed to parse config YAML: {}", e)))
    }

    /// Defaults plus the overload rules shipped with the builder
    pub fn with_builtin_rules() -> Self {
        Self {
            overloads: vec![OverloadRule {
                service: "s3".to_string(),
                operation: "PutObject".to_string(),
                discriminator: "ServerSideEncryption".to_string(),
                narrowing: BTreeMap::from([(
                    "aws:kms".to_string(),
                    vec!["SSEKMSKeyId".to_string()],
                )]),
            }],
            ..Self::default()
        }
    }

    /// Overload rules for one service operation
    pub fn overload_rule(&self, service: &str, operation: &str) -> Option<&OverloadRule> {
        self.overloads
            .iter()
            .find(|rule| rule.service == service && rule.operation == operation)
    }
}
