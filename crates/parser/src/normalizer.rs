//! Self-reference normalizer
//!
//! Finds structures whose field graph leads back to themselves and turns the
//! field that closes each inline cycle into a [`Reference::Forward`], so the
//! renderer can emit a by-name reference instead of expanding the structure
//! forever. Every structure's outcome is recorded in its
//! [`SelfReference`] state; structures that are no longer `Unvisited` are
//! skipped, which makes a second run a no-op.
//!
//! Walks only descend into shapes that can lead back to the origin, so the
//! depth bound applies to cycles and never to long acyclic nesting.

use sdk_stubs_builder_common::{
    BuilderError, Reference, SelfReference, ShapeArena, ShapeId, ShapeKind,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// What one normalizer run changed
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// Structures newly marked self-referential
    pub self_referential: Vec<ShapeId>,
    /// Overflow errors; the structures were marked degraded
    pub degraded: Vec<BuilderError>,
}

impl NormalizeReport {
    pub fn is_empty(&self) -> bool {
        self.self_referential.is_empty() && self.degraded.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SelfReferenceNormalizer {
    max_depth: usize,
}

impl SelfReferenceNormalizer {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Normalize every unvisited structure of the arena
    pub fn normalize(&self, arena: &mut ShapeArena) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        for id in arena.structures() {
            let unvisited = arena
                .get(id)
                .as_structure()
                .is_some_and(|s| s.self_reference == SelfReference::Unvisited);
            if !unvisited {
                continue;
            }

            let state = match self.normalize_structure(arena, id) {
                Ok(state) => state,
                Err(err) => {
                    warn!(error = %err, "Rendering structure as untyped mapping");
                    report.degraded.push(err);
                    SelfReference::Degraded
                }
            };

            if matches!(state, SelfReference::SelfReferential { .. }) {
                debug!(shape = %arena.get(id).origin(), "Structure is self-referential");
                report.self_referential.push(id);
            }

            if let Some(structure) = arena.structure_mut(id) {
                structure.self_reference = state;
            }
        }

        report
    }

    /// Break every all-inline cycle through `origin`, one closing field per walk
    fn normalize_structure(
        &self,
        arena: &mut ShapeArena,
        origin: ShapeId,
    ) -> Result<SelfReference, BuilderError> {
        let reaching = shapes_reaching(arena, origin);
        if !reaching.contains(&origin) {
            return Ok(SelfReference::Acyclic);
        }

        let mut closing_fields = Vec::new();
        let mut found_cycle = false;

        loop {
            let mut walk = Walk {
                arena: &*arena,
                origin,
                max_depth: self.max_depth,
                reaching: &reaching,
                visited: HashSet::new(),
                found_cycle: false,
            };
            let closing = walk.visit(origin, 0, false, None)?;
            found_cycle |= walk.found_cycle;

            let Some((owner, field_name)) = closing else {
                break;
            };

            if let Some(field) = arena
                .structure_mut(owner)
                .and_then(|s| s.field_mut(&field_name))
            {
                field.reference = Reference::Forward;
            }
            closing_fields.push((owner, field_name));
        }

        if found_cycle {
            Ok(SelfReference::SelfReferential { closing_fields })
        } else {
            Ok(SelfReference::Acyclic)
        }
    }
}

/// Shapes with a path back to `origin`, over inline and forward fields alike
fn shapes_reaching(arena: &ShapeArena, origin: ShapeId) -> HashSet<ShapeId> {
    let mut parents: HashMap<ShapeId, Vec<ShapeId>> = HashMap::new();
    for id in arena.reachable_from([origin]) {
        for child in arena.children(id) {
            parents.entry(child).or_default().push(id);
        }
    }

    let mut reaching = HashSet::new();
    let mut stack = vec![origin];
    while let Some(id) = stack.pop() {
        for parent in parents.get(&id).into_iter().flatten() {
            if reaching.insert(*parent) {
                stack.push(*parent);
            }
        }
    }
    reaching
}

/// One depth-first walk from an origin structure
struct Walk<'a> {
    arena: &'a ShapeArena,
    origin: ShapeId,
    max_depth: usize,
    reaching: &'a HashSet<ShapeId>,
    /// `(shape, path crosses a forward field)` pairs already expanded
    visited: HashSet<(ShapeId, bool)>,
    found_cycle: bool,
}

impl<'a> Walk<'a> {
    /// Returns the closing field of the first all-inline cycle found
    fn visit(
        &mut self,
        id: ShapeId,
        depth: usize,
        crossed_forward: bool,
        last_field: Option<(ShapeId, &'a str)>,
    ) -> Result<Option<(ShapeId, String)>, BuilderError> {
        if id == self.origin && depth > 0 {
            self.found_cycle = true;
            if crossed_forward {
                return Ok(None);
            }
            return Ok(last_field.map(|(owner, name)| (owner, name.to_string())));
        }

        if !self.reaching.contains(&id) {
            return Ok(None);
        }

        if depth > self.max_depth {
            return Err(BuilderError::CyclicReferenceOverflow {
                origin: self.arena.get(self.origin).origin().to_string(),
                depth: self.max_depth,
            });
        }

        if !self.visited.insert((id, crossed_forward)) {
            return Ok(None);
        }

        let arena = self.arena;
        match arena.get(id).kind() {
            ShapeKind::Structure(structure) => {
                for field in &structure.fields {
                    let crossed = crossed_forward || field.reference == Reference::Forward;
                    let last = Some((id, field.name.as_str()));
                    let closing = self.visit(field.shape, depth + 1, crossed, last)?;
                    if closing.is_some() {
                        return Ok(closing);
                    }
                }
                Ok(None)
            }
            ShapeKind::List { member } => {
                self.visit(*member, depth + 1, crossed_forward, last_field)
            }
            ShapeKind::Map { key, value } => {
                let closing = self.visit(*key, depth + 1, crossed_forward, last_field)?;
                if closing.is_some() {
                    return Ok(closing);
                }
                self.visit(*value, depth + 1, crossed_forward, last_field)
            }
            ShapeKind::Pending | ShapeKind::Enum(_) | ShapeKind::Scalar(_) => Ok(None),
        }
    }
}
