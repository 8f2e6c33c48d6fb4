//! Shape model
//!
//! Shapes are stored in a [`ShapeArena`] and referenced by [`ShapeId`].
//! A field or list member stores the id of the shape it points to, never the
//! shape itself, so recursive structures are representable without boxing or
//! forward declarations. The arena is keyed by origin path and is the only
//! way to create a shape: asking for the same origin twice yields the same id.

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Index of a shape inside its [`ShapeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(usize);

impl ShapeId {
    /// Position in the owning arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Binary,
}

/// How a field points at its shape when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reference {
    /// Embedded directly
    #[default]
    Inline,
    /// Referenced by name; closes a reference cycle
    Forward,
}

/// Structure member
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub shape: ShapeId,
    pub required: bool,
    pub reference: Reference,
    pub documentation: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: ShapeId, required: bool) -> Self {
        Self {
            name: name.into(),
            shape,
            required,
            reference: Reference::Inline,
            documentation: None,
        }
    }
}

/// Self-reference state of a structure, set by the normalizer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelfReference {
    #[default]
    Unvisited,
    Acyclic,
    /// Cycle found; the listed `(structure, field)` pairs were turned into
    /// forward references.
    SelfReferential { closing_fields: Vec<(ShapeId, String)> },
    /// Cycle detection gave up; rendered as an untyped mapping.
    Degraded,
}

/// Structure body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureShape {
    pub fields: Vec<Field>,
    pub is_exception: bool,
    pub self_reference: SelfReference,
}

impl StructureShape {
    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find a field by name for mutation
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Names of required fields, in declaration order
    pub fn required_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_self_referential(&self) -> bool {
        matches!(self.self_reference, SelfReference::SelfReferential { .. })
    }
}

/// Enumeration body; values keep declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumShape {
    pub values: Vec<String>,
}

/// Shape variants
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Registered but not yet populated; never survives a successful build
    Pending,
    Structure(StructureShape),
    Enum(EnumShape),
    List { member: ShapeId },
    Map { key: ShapeId, value: ShapeId },
    Scalar(ScalarKind),
}

impl ShapeKind {
    /// Short kind label for logs and errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            ShapeKind::Pending => "pending",
            ShapeKind::Structure(_) => "structure",
            ShapeKind::Enum(_) => "enum",
            ShapeKind::List { .. } => "list",
            ShapeKind::Map { .. } => "map",
            ShapeKind::Scalar(_) => "scalar",
        }
    }
}

/// A named type definition
///
/// Equality and hashing use the origin path only: two structures with the
/// same body but different origins are different shapes.
#[derive(Debug, Clone)]
pub struct Shape {
    origin: String,
    kind: ShapeKind,
    documentation: Option<String>,
}

impl Shape {
    /// Origin path, e.g. `s3/PutObjectRequest`
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Shape name without the service prefix
    pub fn name(&self) -> &str {
        self.origin
            .rsplit('/')
            .next()
            .unwrap_or(self.origin.as_str())
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    pub fn as_structure(&self) -> Option<&StructureShape> {
        match &self.kind {
            ShapeKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumShape> {
        match &self.kind {
            ShapeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.kind, ShapeKind::Structure(_))
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
    }
}

impl Eq for Shape {}

impl Hash for Shape {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
    }
}

/// Outcome of [`ShapeArena::reserve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Origin was already registered
    Existing(ShapeId),
    /// Origin is new; the caller must [`ShapeArena::complete`] it
    New(ShapeId),
}

impl Reservation {
    pub fn id(self) -> ShapeId {
        match self {
            Reservation::Existing(id) | Reservation::New(id) => id,
        }
    }
}

/// Indexed shape table keyed by origin path
#[derive(Debug, Clone, Default)]
pub struct ShapeArena {
    shapes: Vec<Shape>,
    index: HashMap<String, ShapeId>,
}

impl ShapeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id registered for an origin path
    pub fn lookup(&self, origin: &str) -> Option<ShapeId> {
        self.index.get(origin).copied()
    }

    /// Register an origin if absent
    ///
    /// New shapes start as [`ShapeKind::Pending`] so recursion into their
    /// children can already refer to them.
    pub fn reserve(&mut self, origin: &str) -> Reservation {
        if let Some(id) = self.lookup(origin) {
            return Reservation::Existing(id);
        }

        let id = ShapeId(self.shapes.len());
        self.shapes.push(Shape {
            origin: origin.to_string(),
            kind: ShapeKind::Pending,
            documentation: None,
        });
        self.index.insert(origin.to_string(), id);
        Reservation::New(id)
    }

    /// Register an origin with a known kind, returning the existing id if present
    pub fn register(&mut self, origin: &str, kind: ShapeKind) -> ShapeId {
        match self.reserve(origin) {
            Reservation::Existing(id) => id,
            Reservation::New(id) => {
                self.complete(id, kind);
                id
            }
        }
    }

    /// Populate a reserved shape
    pub fn complete(&mut self, id: ShapeId, kind: ShapeKind) {
        self.shapes[id.0].kind = kind;
    }

    pub fn set_documentation(&mut self, id: ShapeId, documentation: Option<String>) {
        self.shapes[id.0].documentation = documentation;
    }

    /// Shape by id
    ///
    /// Ids are only handed out by this arena, so indexing cannot fail for ids
    /// obtained from it.
    pub fn get(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0]
    }

    pub fn try_get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0)
    }

    /// Structure body for mutation during the build pass
    pub fn structure_mut(&mut self, id: ShapeId) -> Option<&mut StructureShape> {
        match &mut self.shapes[id.0].kind {
            ShapeKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// All shapes in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| (ShapeId(i), shape))
    }

    /// Ids of all structure shapes in registration order
    pub fn structures(&self) -> Vec<ShapeId> {
        self.iter()
            .filter(|(_, shape)| shape.is_structure())
            .map(|(id, _)| id)
            .collect()
    }

    /// Ids of all enum shapes in registration order
    pub fn enums(&self) -> Vec<ShapeId> {
        self.iter()
            .filter(|(_, shape)| matches!(shape.kind, ShapeKind::Enum(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// Origins still pending
    pub fn find_pending(&self) -> Vec<&str> {
        self.shapes
            .iter()
            .filter(|s| matches!(s.kind, ShapeKind::Pending))
            .map(|s| s.origin.as_str())
            .collect()
    }

    /// Direct children of a shape
    pub fn children(&self, id: ShapeId) -> Vec<ShapeId> {
        match &self.get(id).kind {
            ShapeKind::Structure(s) => s.fields.iter().map(|f| f.shape).collect(),
            ShapeKind::List { member } => vec![*member],
            ShapeKind::Map { key, value } => vec![*key, *value],
            ShapeKind::Pending | ShapeKind::Enum(_) | ShapeKind::Scalar(_) => Vec::new(),
        }
    }

    /// Every shape reachable from `roots` (roots included), in discovery order
    pub fn reachable_from(&self, roots: impl IntoIterator<Item = ShapeId>) -> Vec<ShapeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<ShapeId> = roots.into_iter().collect();
        stack.reverse();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }

        order
    }

    /// The enum a shape resolves to, looking through one list level
    pub fn embedded_enum(&self, id: ShapeId) -> Option<ShapeId> {
        match &self.get(id).kind {
            ShapeKind::Enum(_) => Some(id),
            ShapeKind::List { member } => match self.get(*member).kind {
                ShapeKind::Enum(_) => Some(*member),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_returns_same_id() {
        let mut arena = ShapeArena::new();
        let first = arena.reserve("ec2/Filter");
        let second = arena.reserve("ec2/Filter");

        assert!(matches!(first, Reservation::New(_)));
        assert_eq!(second, Reservation::Existing(first.id()));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_equality_uses_origin() {
        let mut arena = ShapeArena::new();
        let a = arena.register("s3/Empty", ShapeKind::Structure(StructureShape::default()));
        let b = arena.register("s3/Other", ShapeKind::Structure(StructureShape::default()));

        assert_ne!(arena.get(a), arena.get(b));
        assert_eq!(arena.get(a).kind(), arena.get(b).kind());
        assert_eq!(arena.get(a).name(), "Empty");
    }

    #[test]
    fn test_reachable_handles_cycles() {
        let mut arena = ShapeArena::new();
        let node = arena.reserve("s3/Node").id();
        let list = arena.register("s3/NodeList", ShapeKind::List { member: node });
        arena.complete(
            node,
            ShapeKind::Structure(StructureShape {
                fields: vec![Field::new("Children", list, false)],
                ..Default::default()
            }),
        );

        assert_eq!(arena.reachable_from([node]), vec![node, list]);
        assert!(arena.find_pending().is_empty());
    }

    #[test]
    fn test_embedded_enum() {
        let mut arena = ShapeArena::new();
        let e = arena.register(
            "s3/Encryption",
            ShapeKind::Enum(EnumShape {
                values: vec!["AES256".to_string()],
            }),
        );
        let list = arena.register("s3/EncryptionList", ShapeKind::List { member: e });
        let s = arena.register("s3/Str", ShapeKind::Scalar(ScalarKind::String));

        assert_eq!(arena.embedded_enum(e), Some(e));
        assert_eq!(arena.embedded_enum(list), Some(e));
        assert_eq!(arena.embedded_enum(s), None);
    }
}
