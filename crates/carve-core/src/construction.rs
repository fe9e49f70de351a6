//! Construction nodes: union, intersection and difference
//!
//! Children are compiled first, in order, then folded left to right into a
//! chain of binary operations. A construction whose children all vanish
//! vanishes too; with a single survivor it is a pass-through.

use crate::aabb::Aabb;
use crate::compiler::Emitter;
use crate::gpu::{OpKind, Operation};
use crate::node::{ChildLink, NodeKind};
use crate::Result;
use glam::Mat4;

impl Emitter<'_> {
    /// Left-fold `results` with `kind`, skipping repeated indices
    pub(crate) fn fold(&mut self, kind: OpKind, results: &[u32]) -> Option<u32> {
        let mut unique: Vec<u32> = Vec::with_capacity(results.len());
        for &r in results {
            if !unique.contains(&r) {
                unique.push(r);
            }
        }
        let (&first, rest) = unique.split_first()?;
        Some(
            rest.iter()
                .fold(first, |acc, &next| self.emit(Operation::new(kind, acc, next))),
        )
    }

    /// Union or intersection over all children
    pub(crate) fn compile_combination(
        &mut self,
        children: &[ChildLink],
        world: &Mat4,
        kind: OpKind,
    ) -> Result<Option<u32>> {
        let mut results = Vec::with_capacity(children.len());
        for link in children {
            if let Some(index) = self.compile_node(link.id, world)? {
                results.push(index);
            }
        }
        Ok(self.fold(kind, &results))
    }

    /// Base children minus subtract children.
    ///
    /// Without any base result the node renders nothing, and everything
    /// emitted for its subtract children is dropped again.
    pub(crate) fn compile_difference(
        &mut self,
        children: &[ChildLink],
        world: &Mat4,
    ) -> Result<Option<u32>> {
        let mark = self.operations.len();
        let mut base = Vec::new();
        let mut subtract = Vec::new();
        for link in children {
            if let Some(index) = self.compile_node(link.id, world)? {
                if link.subtract {
                    subtract.push(index);
                } else {
                    base.push(index);
                }
            }
        }

        let Some(base) = self.fold(OpKind::Union, &base) else {
            self.operations.truncate(mark);
            return Ok(None);
        };
        match self.fold(OpKind::Union, &subtract) {
            Some(subtract) => Ok(Some(
                self.emit(Operation::new(OpKind::Difference, base, subtract)),
            )),
            None => Ok(Some(base)),
        }
    }
}

/// Bound of a construction from the bounds of its non-degenerate children.
///
/// Difference is bounded by its base children alone; subtracting can only
/// remove volume.
pub fn combine_bounds<I>(kind: &NodeKind, children: I) -> Aabb
where
    I: IntoIterator<Item = (ChildLink, Aabb)>,
{
    match kind {
        NodeKind::Intersection => {
            let mut bound: Option<Aabb> = None;
            for (_, child) in children {
                bound = Some(match bound {
                    Some(acc) => acc.intersection(&child),
                    None => child,
                });
            }
            bound.unwrap_or_default()
        }
        NodeKind::Difference => children
            .into_iter()
            .filter(|(link, _)| !link.subtract)
            .fold(Aabb::EMPTY, |acc, (_, child)| acc.union(&child)),
        _ => children
            .into_iter()
            .fold(Aabb::EMPTY, |acc, (_, child)| acc.union(&child)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use glam::Vec3;

    fn link(id: u32, subtract: bool) -> ChildLink {
        ChildLink {
            id: NodeId(id),
            subtract,
        }
    }

    fn unit_at(x: f32) -> Aabb {
        Aabb::new(Vec3::new(x - 1.0, -1.0, -1.0), Vec3::new(x + 1.0, 1.0, 1.0))
    }

    #[test]
    fn union_bound_covers_all_children() {
        let b = combine_bounds(
            &NodeKind::Union,
            [(link(1, false), unit_at(0.0)), (link(2, false), unit_at(4.0))],
        );
        assert_eq!(b.min.x, -1.0);
        assert_eq!(b.max.x, 5.0);
    }

    #[test]
    fn intersection_bound_is_overlap() {
        let b = combine_bounds(
            &NodeKind::Intersection,
            [(link(1, false), unit_at(0.0)), (link(2, false), unit_at(1.0))],
        );
        assert_eq!(b.min.x, 0.0);
        assert_eq!(b.max.x, 1.0);

        let disjoint = combine_bounds(
            &NodeKind::Intersection,
            [(link(1, false), unit_at(0.0)), (link(2, false), unit_at(9.0))],
        );
        assert!(disjoint.is_empty());
    }

    #[test]
    fn difference_bound_ignores_subtract_children() {
        let b = combine_bounds(
            &NodeKind::Difference,
            [(link(1, false), unit_at(0.0)), (link(2, true), unit_at(10.0))],
        );
        assert_eq!(b.max.x, 1.0);
    }

    #[test]
    fn no_children_no_bound() {
        assert!(combine_bounds(&NodeKind::Intersection, []).is_empty());
        assert!(combine_bounds(&NodeKind::Union, []).is_empty());
    }
}
