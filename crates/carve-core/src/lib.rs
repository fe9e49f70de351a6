//! # Carve Core
//!
//! Scene-graph compiler for signed-distance-field ray marching.
//!
//! A ray-marching shader cannot walk a tree. It consumes flat, fixed-capacity
//! tables: a primitive table, a transform table and an operation list that
//! only ever references earlier entries. This crate owns the editable scene
//! tree and turns it into those tables.
//!
//! ## Example
//!
//! ```rust
//! use carve_core::prelude::*;
//!
//! let mut tree = SceneTree::new();
//! let cut = tree.add_child(tree.root(), Node::difference()).unwrap();
//! tree.add_child(cut, Node::cuboid(Vec3::splat(1.0))).unwrap();
//! let hole = tree.add_child(cut, Node::sphere(1.3)).unwrap();
//! tree.set_subtract(hole, true).unwrap();
//!
//! let compiled = SceneCompiler::default().compile(&tree).unwrap();
//! assert_eq!(compiled.primitives.len(), 2);
//! assert!(compiled.verify_ordering().is_ok());
//! ```
//!
//! ## Conventions
//!
//! - **Angles**: node rotations are stored in **degrees**
//! - **Sizes**: primitives are unit shapes, absolute size lives in the node scale
//! - **Coordinate system**: Right-handed, Y-up

pub mod aabb;
pub mod compiler;
pub mod construction;
pub mod gpu;
pub mod node;
pub mod primitive;
pub mod transform;
pub mod tree;
pub mod uniforms;

mod error;

pub use error::{Error, Result, Table};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aabb::Aabb;
    pub use crate::compiler::{CompiledScene, CompilerConfig, SceneCompiler};
    pub use crate::gpu::{OpKind, Operation, PrimitiveDesc, TransformDesc};
    pub use crate::node::{ChildLink, Node, NodeId, NodeKind};
    pub use crate::primitive::PrimitiveKind;
    pub use crate::transform::{LocalTransform, Rotation};
    pub use crate::tree::SceneTree;
    pub use crate::uniforms::{Camera, SceneUniforms};

    // Math (re-export glam)
    pub use glam::{Mat4, Quat, Vec3};

    // Error handling
    pub use crate::{Error, Result};
}
