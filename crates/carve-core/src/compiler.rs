//! Scene compiler
//!
//! Flattens a [`SceneTree`] into the three tables the ray-marching shader
//! reads:
//!
//! - a deduplicated primitive table
//! - a deduplicated transform table
//! - an operation list in which every operation only refers to earlier ones
//!
//! Compilation is a pure function of the tree. Any edit makes a previously
//! compiled scene stale.

use crate::gpu::{OpKind, Operation, PrimitiveDesc, TransformDesc, intern};
use crate::node::{Node, NodeId, NodeKind};
use crate::primitive::descriptor;
use crate::tree::{SceneTree, child_world, is_degenerate};
use crate::{Error, Result, Table};
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Historical size of every shader table
pub const DEFAULT_CAPACITY: usize = 100;

/// Table capacities enforced by [`SceneCompiler::compile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub max_primitives: usize,
    pub max_transforms: usize,
    pub max_operations: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_primitives: DEFAULT_CAPACITY,
            max_transforms: DEFAULT_CAPACITY,
            max_operations: DEFAULT_CAPACITY,
        }
    }
}

/// The flat tables produced from one compile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledScene {
    pub primitives: Vec<PrimitiveDesc>,
    pub transforms: Vec<TransformDesc>,
    pub operations: Vec<Operation>,
}

impl CompiledScene {
    /// Number of `Render` operations, i.e. visible top-level results
    pub fn render_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.op_kind() == Some(OpKind::Render))
            .count()
    }

    /// Check that the operation list runs as a straight-line program.
    ///
    /// Combine and render operations may only read earlier results that are
    /// not `Transform` loads; `Identity` must sit on an earlier `Transform`;
    /// table indices must be in range. Returns the index of the first
    /// offending operation.
    pub fn verify_ordering(&self) -> std::result::Result<(), usize> {
        let kind_at = |index: u32| {
            self.operations
                .get(index as usize)
                .and_then(Operation::op_kind)
        };
        for (k, op) in self.operations.iter().enumerate() {
            let before = |index: u32| (index as usize) < k;
            let readable = |index: u32| {
                before(index) && !matches!(kind_at(index), Some(OpKind::Transform) | None)
            };
            let ok = match op.op_kind() {
                Some(OpKind::Transform) => (op.i as usize) < self.transforms.len(),
                Some(OpKind::Identity) => {
                    (op.i as usize) < self.primitives.len()
                        && before(op.j)
                        && kind_at(op.j) == Some(OpKind::Transform)
                }
                Some(OpKind::Union | OpKind::Intersection | OpKind::Difference) => {
                    readable(op.i) && readable(op.j)
                }
                Some(OpKind::Render) => readable(op.i),
                None => false,
            };
            if !ok {
                return Err(k);
            }
        }
        Ok(())
    }
}

/// Compiles scene trees under a fixed set of capacities
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneCompiler {
    config: CompilerConfig,
}

impl SceneCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Build all three tables for `tree`, appending a `Render` per
    /// surviving top-level node.
    pub fn compile(&self, tree: &SceneTree) -> Result<CompiledScene> {
        let root = tree.root();
        let primitives = extract_primitives(tree, root);
        let transforms = extract_transforms(tree, root);

        let mut emitter = Emitter {
            tree,
            primitives: &primitives,
            transforms: &transforms,
            operations: Vec::new(),
        };
        for link in tree.children(root) {
            if let Some(result) = emitter.compile_node(link.id, &Mat4::IDENTITY)? {
                emitter.operations.push(Operation::render(result));
            }
        }
        let operations = emitter.operations;

        self.check(Table::Primitives, primitives.len(), self.config.max_primitives)?;
        self.check(Table::Transforms, transforms.len(), self.config.max_transforms)?;
        self.check(Table::Operations, operations.len(), self.config.max_operations)?;

        tracing::debug!(
            "Compiled scene: {} primitives, {} transforms, {} operations",
            primitives.len(),
            transforms.len(),
            operations.len()
        );

        Ok(CompiledScene {
            primitives,
            transforms,
            operations,
        })
    }

    fn check(&self, table: Table, count: usize, capacity: usize) -> Result<()> {
        if count > capacity {
            tracing::warn!("{} table overflow: {} > {}", table, count, capacity);
            return Err(Error::CapacityExceeded {
                table,
                count,
                capacity,
            });
        }
        Ok(())
    }
}

/// Distinct primitive descriptors of the non-degenerate part of a subtree,
/// in discovery order
pub fn extract_primitives(tree: &SceneTree, id: NodeId) -> Vec<PrimitiveDesc> {
    let mut table = Vec::new();
    tree.walk_visible(id, &mut |node: &Node, _: &Mat4| {
        if let Some(desc) = descriptor(node) {
            intern(&mut table, desc);
        }
    });
    table
}

/// Distinct world transforms of the primitive leaves of a subtree, in
/// discovery order
pub fn extract_transforms(tree: &SceneTree, id: NodeId) -> Vec<TransformDesc> {
    let mut table = Vec::new();
    tree.walk_visible(id, &mut |node: &Node, world: &Mat4| {
        if node.is_primitive() {
            intern(&mut table, TransformDesc::from_world(world));
        }
    });
    table
}

/// Compile the subtree at `id` on its own.
///
/// Tables are extracted from that subtree only and no `Render` is
/// appended. The second value is the index of the operation evaluating the
/// subtree, `None` when it renders nothing. Capacities are not checked.
pub fn compile_operations(tree: &SceneTree, id: NodeId) -> Result<(CompiledScene, Option<u32>)> {
    let primitives = extract_primitives(tree, id);
    let transforms = extract_transforms(tree, id);
    let parent_world = tree
        .parent(id)
        .map_or(Mat4::IDENTITY, |parent| tree.world_matrix(parent));

    let mut emitter = Emitter {
        tree,
        primitives: &primitives,
        transforms: &transforms,
        operations: Vec::new(),
    };
    let result = emitter.compile_node(id, &parent_world)?;
    let operations = emitter.operations;
    Ok((
        CompiledScene {
            primitives,
            transforms,
            operations,
        },
        result,
    ))
}

/// Recursive operation emitter over interned tables
pub(crate) struct Emitter<'a> {
    pub(crate) tree: &'a SceneTree,
    pub(crate) primitives: &'a [PrimitiveDesc],
    pub(crate) transforms: &'a [TransformDesc],
    pub(crate) operations: Vec<Operation>,
}

impl Emitter<'_> {
    /// Append `op` unless an identical operation already exists
    pub(crate) fn emit(&mut self, op: Operation) -> u32 {
        intern(&mut self.operations, op)
    }

    /// Index of the operation evaluating `id`'s subtree, or `None` when the
    /// subtree renders nothing
    pub(crate) fn compile_node(&mut self, id: NodeId, parent_world: &Mat4) -> Result<Option<u32>> {
        let tree = self.tree;
        let node = tree.node(id)?;
        let world = child_world(parent_world, node);
        if is_degenerate(node, &world) {
            return Ok(None);
        }
        match node.kind {
            NodeKind::Sphere
            | NodeKind::Box
            | NodeKind::Torus { .. }
            | NodeKind::Line { .. }
            | NodeKind::Cylinder => self.compile_primitive(id, node, &world),
            NodeKind::Union | NodeKind::Root => {
                self.compile_combination(&node.children, &world, OpKind::Union)
            }
            NodeKind::Intersection => {
                self.compile_combination(&node.children, &world, OpKind::Intersection)
            }
            NodeKind::Difference => self.compile_difference(&node.children, &world),
        }
    }
}
