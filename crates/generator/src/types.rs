//! Python type annotations for package shapes
//!
//! [`TypeRenderer`] only reads a [`ServicePackage`]. Structures are always
//! referenced by their `TypeDef` name, so rendering never expands a structure
//! inline; forward references are quoted. Exceptions get no `TypeDef`, so a
//! member typed by one renders as an untyped mapping.

use sdk_stubs_builder_common::{
    Field, Reference, ScalarKind, SelfReference, ServicePackage, ShapeId, ShapeKind,
};
use std::collections::HashSet;

/// Annotation used for degraded structures, exceptions used as data and
/// unresolvable shapes
pub const UNTYPED_MAPPING: &str = "Dict[str, Any]";

/// Nested containers deeper than this render as `Any`
const MAX_CONTAINER_DEPTH: usize = 32;

pub struct TypeRenderer<'a> {
    package: &'a ServicePackage,
}

impl<'a> TypeRenderer<'a> {
    pub fn new(package: &'a ServicePackage) -> Self {
        Self { package }
    }

    /// `TypeDef` class name of a structure
    pub fn typed_dict_name(&self, id: ShapeId) -> String {
        format!("{}TypeDef", self.package.shapes().get(id).name())
    }

    /// Annotation for a shape referenced inline
    pub fn annotation(&self, id: ShapeId) -> String {
        self.render(id, false, 0)
    }

    /// Annotation for a discriminator narrowed to one enum value
    ///
    /// A list of enum values narrows its member, giving `List[Literal[...]]`.
    pub fn narrowed_annotation(&self, id: ShapeId, value: &str) -> String {
        let literal = format!("Literal[{}]", quote(value));
        match self.package.shapes().try_get(id).map(|shape| shape.kind()) {
            Some(ShapeKind::List { .. }) => format!("List[{}]", literal),
            _ => literal,
        }
    }

    /// Annotation for a structure field, quoting forward references
    pub fn field_annotation(&self, field: &Field) -> String {
        self.render(field.shape, field.reference == Reference::Forward, 0)
    }

    /// Annotation for an output shape; `None` renders as an empty dict
    pub fn return_annotation(&self, output: Option<ShapeId>) -> String {
        match output {
            Some(id) => self.annotation(id),
            None => "Dict[str, Any]".to_string(),
        }
    }

    fn render(&self, id: ShapeId, forward: bool, depth: usize) -> String {
        if depth > MAX_CONTAINER_DEPTH {
            return "Any".to_string();
        }

        let Some(shape) = self.package.shapes().try_get(id) else {
            return UNTYPED_MAPPING.to_string();
        };

        match shape.kind() {
            ShapeKind::Structure(s)
                if s.is_exception || s.self_reference == SelfReference::Degraded =>
            {
                UNTYPED_MAPPING.to_string()
            }
            ShapeKind::Structure(_) if forward => format!("\"{}\"", self.typed_dict_name(id)),
            ShapeKind::Structure(_) => self.typed_dict_name(id),
            ShapeKind::Enum(_) => match self.package.literal_for(id) {
                Some(literal) if literal.is_literal() => literal.name.clone(),
                _ => "str".to_string(),
            },
            ShapeKind::List { member } => {
                format!("List[{}]", self.render(*member, forward, depth + 1))
            }
            ShapeKind::Map { key, value } => format!(
                "Dict[{}, {}]",
                self.render(*key, forward, depth + 1),
                self.render(*value, forward, depth + 1)
            ),
            ShapeKind::Scalar(scalar) => scalar_annotation(*scalar).to_string(),
            ShapeKind::Pending => "Any".to_string(),
        }
    }

    /// Typed dicts ordered so inline dependencies come first
    ///
    /// Forward references are skipped, which makes the inline graph acyclic
    /// once the normalizer has run.
    pub fn typed_dict_order(&self) -> Vec<ShapeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        for id in self.package.typed_dicts() {
            self.visit(*id, &mut visited, &mut order);
        }
        order
    }

    fn visit(&self, id: ShapeId, visited: &mut HashSet<ShapeId>, order: &mut Vec<ShapeId>) {
        if !visited.insert(id) {
            return;
        }

        let arena = self.package.shapes();
        if let Some(structure) = arena.get(id).as_structure() {
            for field in &structure.fields {
                if field.reference == Reference::Forward {
                    continue;
                }
                for dependency in self.inline_structures(field.shape) {
                    self.visit(dependency, visited, order);
                }
            }
            if !structure.is_exception {
                order.push(id);
            }
        }
    }

    /// Structures a shape embeds through containers
    fn inline_structures(&self, id: ShapeId) -> Vec<ShapeId> {
        let arena = self.package.shapes();
        let mut found = Vec::new();
        let mut stack = vec![(id, 0)];
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_CONTAINER_DEPTH {
                continue;
            }
            match arena.get(id).kind() {
                ShapeKind::Structure(s) if !s.is_exception => found.push(id),
                ShapeKind::List { member } => stack.push((*member, depth + 1)),
                ShapeKind::Map { key, value } => {
                    stack.push((*value, depth + 1));
                    stack.push((*key, depth + 1));
                }
                _ => {}
            }
        }
        found
    }
}

fn scalar_annotation(scalar: ScalarKind) -> &'static str {
    match scalar {
        ScalarKind::String => "str",
        ScalarKind::Integer => "int",
        ScalarKind::Float => "float",
        ScalarKind::Boolean => "bool",
        ScalarKind::Timestamp => "Union[datetime, str]",
        ScalarKind::Binary => "Union[str, bytes, IO[Any]]",
    }
}

/// Python string literal with double quotes
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
