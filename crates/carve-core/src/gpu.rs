//! GPU-facing records: primitive descriptors, transform descriptors, operations
//!
//! These are plain `#[repr(C)]` values copied verbatim into the shader's
//! uniform block. Equality for interning is bitwise over their bytes.

use crate::primitive::PrimitiveKind;
use crate::transform::min_axis_scale;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// One shape in the primitive table
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PrimitiveDesc {
    pub kind: u32,
    pub material: u32,
    pub params: [f32; 2],
}

impl PrimitiveDesc {
    pub fn new(kind: PrimitiveKind, params: [f32; 2], material: u32) -> Self {
        Self {
            kind: kind as u32,
            material,
            params,
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_u32(self.kind)
    }
}

/// One entry in the transform table
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformDesc {
    /// World-to-local matrix
    pub inverse: [[f32; 4]; 4],
    /// Smallest basis length of the world matrix, scales marching steps
    pub min_scale: f32,
    pub _pad: [f32; 3],
}

impl TransformDesc {
    pub fn from_world(world: &Mat4) -> Self {
        Self {
            inverse: world.inverse().to_cols_array_2d(),
            min_scale: min_axis_scale(world),
            _pad: [0.0; 3],
        }
    }
}

/// Operation discriminant
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Evaluate primitive `i` in the space of Transform op `j`
    Identity = 0,
    /// Load transform `i`
    Transform = 1,
    Union = 2,
    Intersection = 3,
    Difference = 4,
    /// Emit op `i` as a visible result
    Render = 5,
}

impl OpKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => OpKind::Identity,
            1 => OpKind::Transform,
            2 => OpKind::Union,
            3 => OpKind::Intersection,
            4 => OpKind::Difference,
            5 => OpKind::Render,
            _ => return None,
        })
    }

    /// Union, intersection or difference
    pub fn is_combine(self) -> bool {
        matches!(
            self,
            OpKind::Union | OpKind::Intersection | OpKind::Difference
        )
    }
}

/// One instruction of the flat operation list
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Operation {
    pub kind: u32,
    pub i: u32,
    pub j: u32,
    pub _pad: u32,
}

impl Operation {
    pub fn new(kind: OpKind, i: u32, j: u32) -> Self {
        Self {
            kind: kind as u32,
            i,
            j,
            _pad: 0,
        }
    }

    pub fn transform(transform: u32) -> Self {
        Self::new(OpKind::Transform, transform, 0)
    }

    pub fn identity(primitive: u32, transform_op: u32) -> Self {
        Self::new(OpKind::Identity, primitive, transform_op)
    }

    pub fn render(op: u32) -> Self {
        Self::new(OpKind::Render, op, 0)
    }

    pub fn op_kind(&self) -> Option<OpKind> {
        OpKind::from_u32(self.kind)
    }
}

/// Index of `value` in `table`, comparing raw bytes
pub fn lookup<T: Pod>(table: &[T], value: &T) -> Option<u32> {
    let needle = bytemuck::bytes_of(value);
    table
        .iter()
        .position(|entry| bytemuck::bytes_of(entry) == needle)
        .map(|i| i as u32)
}

/// Index of `value` in `table`, appending it first if absent
pub fn intern<T: Pod>(table: &mut Vec<T>, value: T) -> u32 {
    if let Some(index) = lookup(table, &value) {
        return index;
    }
    table.push(value);
    (table.len() - 1) as u32
}
