//! Operations, overload signatures and literal unions

use crate::shape::ShapeId;
use serde::{Deserialize, Serialize};

/// Keyword argument of a client method
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub shape: ShapeId,
    pub required: bool,
    /// Literal value this argument is narrowed to in an overload
    pub narrowed_to: Option<String>,
}

impl Argument {
    pub fn new(name: impl Into<String>, shape: ShapeId, required: bool) -> Self {
        Self {
            name: name.into(),
            shape,
            required,
            narrowed_to: None,
        }
    }
}

/// Discriminator argument and the value selecting one overload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub argument: String,
    pub value: String,
}

/// One alternative signature for a method name
///
/// Signatures are plain data; the renderer decides how to express them.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadSignature {
    /// `None` for the base signature where the discriminator is omitted
    pub discriminator: Option<Discriminator>,
    pub arguments: Vec<Argument>,
    pub output: Option<ShapeId>,
}

/// Pagination metadata from the paginator definitions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginatorInfo {
    pub input_token: Vec<String>,
    pub output_token: Vec<String>,
    pub limit_key: Option<String>,
    pub result_key: Vec<String>,
}

/// Client method
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation name as declared in the metadata, e.g. `DescribeInstances`
    pub name: String,
    /// Python method name, e.g. `describe_instances`
    pub method_name: String,
    pub arguments: Vec<Argument>,
    pub input: Option<ShapeId>,
    pub output: Option<ShapeId>,
    pub errors: Vec<ShapeId>,
    pub deprecated: bool,
    pub documentation: Option<String>,
    pub paginator: Option<PaginatorInfo>,
    /// Empty until the overload resolver runs; then at least one signature
    pub overloads: Vec<OverloadSignature>,
}

impl Operation {
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }

    /// Signature used when no overloads were produced
    pub fn base_signature(&self) -> OverloadSignature {
        OverloadSignature {
            discriminator: None,
            arguments: self.arguments.clone(),
            output: self.output,
        }
    }
}

/// Waiter definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waiter {
    pub name: String,
    /// Name of the operation polled by the waiter
    pub operation: String,
    pub delay: u32,
    pub max_attempts: u32,
}

/// Whether a literal union is rendered as literals or as plain strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralDecision {
    Literal,
    /// Cardinality above the cap; values kept for documentation only
    StringFallback,
}

/// Bounded set of string values usable as a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralUnion {
    /// Type alias name, e.g. `ServerSideEncryptionType`
    pub name: String,
    pub values: Vec<String>,
    pub decision: LiteralDecision,
    /// Enum shape this union was derived from, if any
    pub shape: Option<ShapeId>,
}

impl LiteralUnion {
    pub fn is_literal(&self) -> bool {
        self.decision == LiteralDecision::Literal
    }
}
