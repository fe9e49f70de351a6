//! Scene nodes
//!
//! A [`Node`] is a transformed primitive leaf, a boolean construction over its
//! children, or the synthetic root. Nodes live in a [`SceneTree`](crate::tree::SceneTree)
//! arena and refer to each other by [`NodeId`].

use crate::primitive::PrimitiveKind;
use crate::transform::{LocalTransform, Rotation};
use glam::Vec3;
use std::fmt;

/// Stable index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is.
///
/// Primitive kinds carry only shape *ratios*; absolute size is part of the
/// node's scale so that differently sized copies share one descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// The single synthetic top node
    Root,
    /// Unit sphere
    Sphere,
    /// Box with half-extent 1
    Box,
    /// Torus in the XZ plane with major radius 1
    Torus { ring_ratio: f32 },
    /// Capsule along Y with radius 1
    Line { half_height_ratio: f32 },
    /// Infinite cylinder along Y with radius 1
    Cylinder,
    Union,
    Intersection,
    Difference,
}

impl NodeKind {
    /// The primitive shape and its parameters, for leaf kinds
    pub fn primitive(&self) -> Option<(PrimitiveKind, [f32; 2])> {
        match *self {
            NodeKind::Sphere => Some((PrimitiveKind::Sphere, [0.0; 2])),
            NodeKind::Box => Some((PrimitiveKind::Box, [0.0; 2])),
            NodeKind::Torus { ring_ratio } => Some((PrimitiveKind::Torus, [ring_ratio, 0.0])),
            NodeKind::Line { half_height_ratio } => {
                Some((PrimitiveKind::Line, [half_height_ratio, 0.0]))
            }
            NodeKind::Cylinder => Some((PrimitiveKind::Cylinder, [0.0; 2])),
            NodeKind::Root | NodeKind::Union | NodeKind::Intersection | NodeKind::Difference => {
                None
            }
        }
    }

    /// Whether nodes of this kind may own children
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::Root | NodeKind::Union | NodeKind::Intersection | NodeKind::Difference
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Sphere => "sphere",
            NodeKind::Box => "box",
            NodeKind::Torus { .. } => "torus",
            NodeKind::Line { .. } => "line",
            NodeKind::Cylinder => "cylinder",
            NodeKind::Union => "union",
            NodeKind::Intersection => "intersection",
            NodeKind::Difference => "difference",
        }
    }
}

/// A parent's reference to one child.
///
/// `subtract` only has meaning when the parent is a difference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLink {
    pub id: NodeId,
    pub subtract: bool,
}

/// A node in the scene tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub(crate) kind: NodeKind,
    pub transform: LocalTransform,
    pub hidden: bool,
    pub material: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<ChildLink>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            kind,
            transform: LocalTransform::IDENTITY,
            hidden: false,
            material: 0,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(NodeKind::Sphere).scaled(Vec3::splat(radius))
    }

    /// Box with the given half-extents
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(NodeKind::Box).scaled(half_extents)
    }

    /// Torus lying in the XZ plane
    pub fn torus(major_radius: f32, ring_radius: f32) -> Self {
        let ring_ratio = if major_radius == 0.0 {
            0.0
        } else {
            ring_radius / major_radius
        };
        Self::new(NodeKind::Torus { ring_ratio }).scaled(Vec3::splat(major_radius))
    }

    /// Capsule along Y; `height` is the length of the core segment
    pub fn line(height: f32, radius: f32) -> Self {
        let half_height_ratio = if radius == 0.0 {
            0.0
        } else {
            height * 0.5 / radius
        };
        Self::new(NodeKind::Line { half_height_ratio }).scaled(Vec3::splat(radius))
    }

    /// Infinite cylinder along Y
    pub fn cylinder(radius: f32) -> Self {
        Self::new(NodeKind::Cylinder).scaled(Vec3::splat(radius))
    }

    pub fn union() -> Self {
        Self::new(NodeKind::Union)
    }

    pub fn intersection() -> Self {
        Self::new(NodeKind::Intersection)
    }

    pub fn difference() -> Self {
        Self::new(NodeKind::Difference)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn translated(mut self, offset: Vec3) -> Self {
        self.transform.translation += offset;
        self
    }

    /// Multiply the current scale per axis
    pub fn scaled(mut self, factor: Vec3) -> Self {
        self.transform.scale *= factor;
        self
    }

    /// Compose a rotation (degrees) after the current one
    pub fn rotated(mut self, angle: f32, axis: Vec3) -> Self {
        self.transform.rotation = self.transform.rotation.then(Rotation::new(angle, axis));
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_material(mut self, material: u32) -> Self {
        self.material = material;
        self
    }

    /// Change through [`SceneTree::set_kind`](crate::tree::SceneTree::set_kind)
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[ChildLink] {
        &self.children
    }

    pub fn is_primitive(&self) -> bool {
        self.kind.primitive().is_some()
    }
}
