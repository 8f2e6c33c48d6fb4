//! Literal and overload resolution
//!
//! [`LiteralResolver`] turns enum shapes into named literal unions, applying
//! the cardinality cap. [`OverloadResolver`] splits operations that have a
//! discriminator argument into one signature per discriminator value.

use crate::builder::ServiceShapeGraph;
use sdk_stubs_builder_common::{
    Argument, Discriminator, LiteralDecision, LiteralUnion, Operation, OverloadRule,
    OverloadSignature, ServiceName, ShapeArena, ShapeId,
};
use tracing::debug;

/// Creates literal unions subject to a cardinality cap
#[derive(Debug, Clone, Copy)]
pub struct LiteralResolver {
    max_cardinality: usize,
}

impl LiteralResolver {
    pub fn new(max_cardinality: usize) -> Self {
        Self { max_cardinality }
    }

    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    /// Build one union, falling back to plain strings above the cap
    ///
    /// Values are kept in declared order either way.
    pub fn literal_union(
        &self,
        name: &str,
        values: Vec<String>,
        shape: Option<ShapeId>,
    ) -> LiteralUnion {
        let decision = if values.len() > self.max_cardinality {
            debug!(
                literal = %name,
                values = values.len(),
                cap = self.max_cardinality,
                "Literal cap exceeded, falling back to str"
            );
            LiteralDecision::StringFallback
        } else {
            LiteralDecision::Literal
        };

        LiteralUnion {
            name: name.to_string(),
            values,
            decision,
            shape,
        }
    }

    /// Add a `<Shape>Type` union for every enum shape in the graph
    pub fn resolve(&self, graph: &mut ServiceShapeGraph) {
        for id in graph.arena.enums() {
            let shape = graph.arena.get(id);
            let name = format!("{}Type", shape.name());
            if graph.literals.iter().any(|l| l.name == name) {
                continue;
            }

            let values = shape
                .as_enum()
                .map(|e| e.values.clone())
                .unwrap_or_default();
            let union = self.literal_union(&name, values, Some(id));
            graph.literals.push(union);
        }
    }

    /// Add the unions that describe the service itself
    ///
    /// `ServiceName` lists every known service, `RegionName` the service's
    /// regions, `PaginatorName` and `WaiterName` the method names accepted by
    /// `get_paginator` and `get_waiter`. Empty unions are not emitted.
    pub fn extend_literals(&self, graph: &mut ServiceShapeGraph, service_names: &[ServiceName]) {
        let paginators: Vec<String> = graph
            .operations
            .iter()
            .filter(|op| op.paginator.is_some())
            .map(|op| op.method_name.clone())
            .collect();
        let waiters: Vec<String> = graph
            .waiters
            .iter()
            .map(|w| sdk_stubs_builder_common::to_snake_case(&w.name))
            .collect();

        let candidates = [
            (
                "ServiceName",
                service_names.iter().map(|s| s.name().to_string()).collect(),
            ),
            ("RegionName", graph.regions.clone()),
            ("PaginatorName", paginators),
            ("WaiterName", waiters),
        ];

        for (name, values) in candidates {
            if values.is_empty() || graph.literals.iter().any(|l| l.name == name) {
                continue;
            }
            let union = self.literal_union(name, values, None);
            graph.literals.push(union);
        }
    }
}

/// Produces overload signatures from discriminator rules
#[derive(Debug, Clone)]
pub struct OverloadResolver {
    rules: Vec<OverloadRule>,
    max_cardinality: usize,
}

impl OverloadResolver {
    pub fn new(rules: Vec<OverloadRule>, max_cardinality: usize) -> Self {
        Self {
            rules,
            max_cardinality,
        }
    }

    /// Fill `overloads` for every operation of the graph
    pub fn resolve(&self, graph: &mut ServiceShapeGraph) {
        let service = graph.service_name.name().to_string();
        for i in 0..graph.operations.len() {
            let overloads = self.signatures(&service, &graph.operations[i], &graph.arena);
            graph.operations[i].overloads = overloads;
        }
    }

    /// Signatures for one operation; never empty
    ///
    /// With a matching rule and an enum-typed discriminator, one signature per
    /// value in declared order, followed by the base signature without the
    /// discriminator when the discriminator is optional.
    pub fn signatures(
        &self,
        service: &str,
        operation: &Operation,
        arena: &ShapeArena,
    ) -> Vec<OverloadSignature> {
        let Some(rule) = self
            .rules
            .iter()
            .find(|r| r.service == service && r.operation == operation.name)
        else {
            return vec![operation.base_signature()];
        };

        let Some(discriminator) = operation.argument(&rule.discriminator) else {
            debug!(
                service,
                operation = %operation.name,
                argument = %rule.discriminator,
                "Overload discriminator is not an argument"
            );
            return vec![operation.base_signature()];
        };

        let values = arena
            .embedded_enum(discriminator.shape)
            .and_then(|id| arena.get(id).as_enum())
            .map(|e| e.values.clone())
            .unwrap_or_default();

        if values.is_empty() || values.len() > self.max_cardinality {
            return vec![operation.base_signature()];
        }

        let mut signatures: Vec<OverloadSignature> = values
            .iter()
            .map(|value| {
                let narrowed = rule.narrowing.get(value);
                let arguments = operation
                    .arguments
                    .iter()
                    .map(|arg| {
                        let mut arg = arg.clone();
                        if arg.name == rule.discriminator {
                            arg.required = true;
                            arg.narrowed_to = Some(value.clone());
                        } else if narrowed.is_some_and(|names| names.contains(&arg.name)) {
                            arg.required = true;
                        }
                        arg
                    })
                    .collect();

                OverloadSignature {
                    discriminator: Some(Discriminator {
                        argument: rule.discriminator.clone(),
                        value: value.clone(),
                    }),
                    arguments,
                    output: operation.output,
                }
            })
            .collect();

        if !discriminator.required {
            let arguments: Vec<Argument> = operation
                .arguments
                .iter()
                .filter(|arg| arg.name != rule.discriminator)
                .cloned()
                .collect();
            signatures.push(OverloadSignature {
                discriminator: None,
                arguments,
                output: operation.output,
            });
        }

        signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk_stubs_builder_common::{EnumShape, ScalarKind, ShapeKind};
    use std::collections::BTreeMap;

    fn values(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v{}", i)).collect()
    }

    #[test]
    fn test_literal_cap() {
        let resolver = LiteralResolver::new(3);

        let union = resolver.literal_union("SmallType", values(3), None);
        assert_eq!(union.decision, LiteralDecision::Literal);
        assert_eq!(union.values, values(3));

        let union = resolver.literal_union("LargeType", values(4), None);
        assert_eq!(union.decision, LiteralDecision::StringFallback);
        assert_eq!(union.values, values(4));
    }

    fn put_object(arena: &mut ShapeArena, required: bool) -> Operation {
        let sse = arena.register(
            "s3/ServerSideEncryption",
            ShapeKind::Enum(EnumShape {
                values: vec!["AES256".to_string(), "aws:kms".to_string()],
            }),
        );
        let string = arena.register("s3/String", ShapeKind::Scalar(ScalarKind::String));

        Operation {
            name: "PutObject".to_string(),
            method_name: "put_object".to_string(),
            arguments: vec![
                Argument::new("Bucket", string, true),
                Argument::new("ServerSideEncryption", sse, required),
                Argument::new("SSEKMSKeyId", string, false),
            ],
            input: None,
            output: None,
            errors: vec![],
            deprecated: false,
            documentation: None,
            paginator: None,
            overloads: vec![],
        }
    }

    fn rule() -> OverloadRule {
        OverloadRule {
            service: "s3".to_string(),
            operation: "PutObject".to_string(),
            discriminator: "ServerSideEncryption".to_string(),
            narrowing: BTreeMap::from([("aws:kms".to_string(), vec!["SSEKMSKeyId".to_string()])]),
        }
    }

    #[test]
    fn test_required_discriminator_has_no_base_signature() {
        let mut arena = ShapeArena::new();
        let op = put_object(&mut arena, true);
        let signatures = OverloadResolver::new(vec![rule()], 200).signatures("s3", &op, &arena);

        assert_eq!(signatures.len(), 2);
        assert!(signatures.iter().all(|s| s.discriminator.is_some()));
    }

    #[test]
    fn test_narrowing_marks_arguments_required() {
        let mut arena = ShapeArena::new();
        let op = put_object(&mut arena, false);
        let signatures = OverloadResolver::new(vec![rule()], 200).signatures("s3", &op, &arena);

        let kms = &signatures[1];
        let key = kms.arguments.iter().find(|a| a.name == "SSEKMSKeyId").unwrap();
        assert!(key.required);

        let aes = &signatures[0];
        let key = aes.arguments.iter().find(|a| a.name == "SSEKMSKeyId").unwrap();
        assert!(!key.required);
    }

    #[test]
    fn test_values_over_cap_yield_single_signature() {
        let mut arena = ShapeArena::new();
        let op = put_object(&mut arena, false);
        let signatures = OverloadResolver::new(vec![rule()], 1).signatures("s3", &op, &arena);

        assert_eq!(signatures, vec![op.base_signature()]);
    }

    #[test]
    fn test_no_rule_yields_base_signature() {
        let mut arena = ShapeArena::new();
        let op = put_object(&mut arena, false);
        let signatures = OverloadResolver::new(vec![], 200).signatures("s3", &op, &arena);

        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].arguments.len(), 3);
    }
}
