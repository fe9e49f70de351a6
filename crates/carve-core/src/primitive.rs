//! Primitive leaves
//!
//! All primitives are unit shapes centered at the origin. A node's scale
//! carries the absolute size, so the descriptor only holds shape ratios and
//! every sphere in a scene shares a single table entry.

use crate::aabb::Aabb;
use crate::compiler::Emitter;
use crate::gpu::{Operation, PrimitiveDesc, TransformDesc, lookup};
use crate::node::{Node, NodeId, NodeKind};
use crate::transform::has_uniform_scale;
use crate::{Error, Result, Table};
use glam::{Mat4, Vec3};

/// Half-length used to bound the infinite cylinder along its axis
pub const CYLINDER_HALF_LENGTH: f32 = 1000.0;

/// Shape discriminant shared with the shader
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Sphere = 0,
    Box = 1,
    /// params[0] = ring radius / major radius
    Torus = 2,
    /// params[0] = half height / radius
    Line = 3,
    Cylinder = 4,
}

impl PrimitiveKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => PrimitiveKind::Sphere,
            1 => PrimitiveKind::Box,
            2 => PrimitiveKind::Torus,
            3 => PrimitiveKind::Line,
            4 => PrimitiveKind::Cylinder,
            _ => return None,
        })
    }
}

/// The table entry a primitive node interns to
pub fn descriptor(node: &Node) -> Option<PrimitiveDesc> {
    let (kind, params) = node.kind.primitive()?;
    Some(PrimitiveDesc::new(kind, params, node.material))
}

/// Local-space half extents enclosing the unit shape
fn local_half_extents(kind: &NodeKind) -> Option<Vec3> {
    match *kind {
        NodeKind::Sphere | NodeKind::Box => Some(Vec3::ONE),
        NodeKind::Torus { ring_ratio } => {
            let r = ring_ratio.abs();
            Some(Vec3::new(1.0 + r, r, 1.0 + r))
        }
        NodeKind::Line { half_height_ratio } => {
            Some(Vec3::new(1.0, half_height_ratio.abs() + 1.0, 1.0))
        }
        NodeKind::Cylinder => Some(Vec3::new(1.0, CYLINDER_HALF_LENGTH, 1.0)),
        NodeKind::Root | NodeKind::Union | NodeKind::Intersection | NodeKind::Difference => None,
    }
}

/// World-space bound of a primitive leaf under `world`.
///
/// Extremal points of the unit shape are pushed through the full matrix.
/// A uniformly scaled sphere is bounded from its center and radius instead,
/// since its bound does not depend on rotation.
pub fn world_aabb(kind: &NodeKind, world: &Mat4) -> Aabb {
    if *kind == NodeKind::Sphere && has_uniform_scale(world) {
        let center = world.transform_point3(Vec3::ZERO);
        let radius = Vec3::splat(world.x_axis.truncate().length());
        return Aabb::new(center - radius, center + radius);
    }
    match local_half_extents(kind) {
        Some(half) => Aabb::new(-half, half).transformed(world),
        None => Aabb::EMPTY,
    }
}

impl Emitter<'_> {
    /// `Transform` for the node's world matrix, then `Identity` on top of it
    pub(crate) fn compile_primitive(
        &mut self,
        id: NodeId,
        node: &Node,
        world: &Mat4,
    ) -> Result<Option<u32>> {
        let Some(desc) = descriptor(node) else {
            return Ok(None);
        };
        let primitive = lookup(self.primitives, &desc)
            .ok_or(Error::MissingDescriptor(Table::Primitives, id))?;
        let transform = lookup(self.transforms, &TransformDesc::from_world(world))
            .ok_or(Error::MissingDescriptor(Table::Transforms, id))?;

        let transform_op = self.emit(Operation::transform(transform));
        Ok(Some(self.emit(Operation::identity(primitive, transform_op))))
    }
}
