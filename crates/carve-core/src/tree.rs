//! The scene tree
//!
//! An arena owns every node; parent and child relations are plain
//! [`NodeId`] links. Slots of removed nodes are never reused, so a stale id
//! resolves to nothing instead of to a different node.

use crate::aabb::Aabb;
use crate::construction::combine_bounds;
use crate::node::{ChildLink, Node, NodeId, NodeKind};
use crate::primitive;
use crate::{Error, Result};
use glam::Mat4;

/// Arena-backed scene hierarchy with a single synthetic root
#[derive(Debug, Clone)]
pub struct SceneTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Root).named("Root"))],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// True when only the root is left
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access for editing name, transform, material and flags.
    ///
    /// Links and the kind are not reachable from here; use
    /// [`reparent`](Self::reparent), [`set_kind`](Self::set_kind) and friends
    /// to change the shape of the tree.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(Error::UnknownNode(id))
    }

    /// Ordered child links; empty for unknown ids
    pub fn children(&self, id: NodeId) -> &[ChildLink] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Append `node` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        self.ensure_container(parent)?;
        let id = NodeId(self.nodes.len() as u32);
        node.parent = None;
        node.children.clear();
        self.nodes.push(Some(node));
        self.attach(id, parent)?;
        Ok(id)
    }

    /// Delete a node together with its whole subtree
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(Error::RootImmutable);
        }
        self.node(id)?;
        self.detach(id)?;
        for doomed in self.descendants(id) {
            if let Some(slot) = self.nodes.get_mut(doomed.index()) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Move `id` to the end of `new_parent`'s children.
    ///
    /// When `new_parent` lies inside `id`'s subtree it is first hoisted up
    /// under `id`'s old parent, so the move never creates a cycle.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<()> {
        if id == self.root {
            return Err(Error::RootImmutable);
        }
        if id == new_parent {
            return Err(Error::SelfParent(id));
        }
        self.ensure_container(new_parent)?;
        let old_parent = self.node(id)?.parent.ok_or(Error::UnknownNode(id))?;

        if self.is_ancestor(id, new_parent) {
            tracing::debug!(
                "Hoisting {} under {} before moving {} into it",
                new_parent,
                old_parent,
                id
            );
            self.detach(new_parent)?;
            self.attach(new_parent, old_parent)?;
        }

        self.detach(id)?;
        self.attach(id, new_parent)
    }

    /// Replace a node's kind.
    ///
    /// Nodes with children may only switch between constructions. Subtract
    /// flags on the children are cleared once the node is no longer a
    /// difference.
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) -> Result<()> {
        if id == self.root || kind == NodeKind::Root {
            return Err(Error::KindChange(id, kind.label()));
        }
        let node = self.node_mut(id)?;
        if !kind.is_container() && !node.children.is_empty() {
            return Err(Error::KindChange(id, kind.label()));
        }
        node.kind = kind;
        if kind != NodeKind::Difference {
            for link in &mut node.children {
                link.subtract = false;
            }
        }
        Ok(())
    }

    /// Mark a child of a difference node as subtracted (or as base)
    pub fn set_subtract(&mut self, child: NodeId, subtract: bool) -> Result<()> {
        let parent = self.parent(child).ok_or(Error::NotDifferenceChild(child))?;
        let parent_node = self.node_mut(parent)?;
        if parent_node.kind != NodeKind::Difference {
            return Err(Error::NotDifferenceChild(child));
        }
        for link in &mut parent_node.children {
            if link.id == child {
                link.subtract = subtract;
            }
        }
        Ok(())
    }

    pub fn is_subtract(&self, child: NodeId) -> bool {
        self.parent(child).is_some_and(|parent| {
            self.children(parent)
                .iter()
                .any(|link| link.id == child && link.subtract)
        })
    }

    fn ensure_container(&self, id: NodeId) -> Result<()> {
        if self.node(id)?.kind.is_container() {
            Ok(())
        } else {
            Err(Error::NotAContainer(id))
        }
    }

    fn attach(&mut self, id: NodeId, parent: NodeId) -> Result<()> {
        self.node_mut(parent)?.children.push(ChildLink {
            id,
            subtract: false,
        });
        self.node_mut(id)?.parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) -> Result<()> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|link| link.id != id);
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// True if `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = self.parent(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// `id` and everything below it, in pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.get(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().map(|link| link.id));
        }
        out
    }

    /// First node in pre-order whose name matches
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.get(id).is_some_and(|n| n.name == name))
    }

    /// Root-to-node product of local transforms; identity for the root.
    ///
    /// The product is accumulated top-down exactly like the compiler's walk,
    /// so transforms computed here and during compilation compare bitwise.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                break;
            }
            chain.push(current);
            cursor = self.parent(current);
        }
        chain.iter().rev().fold(Mat4::IDENTITY, |world, &current| {
            self.get(current)
                .map_or(world, |n| child_world(&world, n))
        })
    }

    /// Hidden, or collapsed to zero volume by its world transform
    pub fn is_degenerate(&self, id: NodeId) -> bool {
        match self.get(id) {
            Some(node) => is_degenerate(node, &self.world_matrix(id)),
            None => true,
        }
    }

    /// World-space bound of a node's subtree; empty for the root and for
    /// degenerate nodes
    pub fn generate_aabb(&self, id: NodeId) -> Aabb {
        if id == self.root {
            return Aabb::EMPTY;
        }
        self.bound(id, &self.world_matrix(id)).unwrap_or_default()
    }

    /// Union of the bounds of all top-level nodes
    pub fn scene_aabb(&self) -> Aabb {
        self.children(self.root)
            .iter()
            .filter_map(|link| {
                let node = self.get(link.id)?;
                self.bound(link.id, &child_world(&Mat4::IDENTITY, node))
            })
            .fold(Aabb::EMPTY, |acc, b| acc.union(&b))
    }

    /// `None` exactly when the compiler emits nothing for the node: it is
    /// degenerate, a construction with no surviving child, or a difference
    /// with no surviving base child
    fn bound(&self, id: NodeId, world: &Mat4) -> Option<Aabb> {
        let node = self.get(id)?;
        if is_degenerate(node, world) {
            return None;
        }
        if node.is_primitive() {
            return Some(primitive::world_aabb(&node.kind, world));
        }
        let children: Vec<(ChildLink, Aabb)> = node
            .children
            .iter()
            .filter_map(|link| {
                let child = self.get(link.id)?;
                Some((*link, self.bound(link.id, &child_world(world, child))?))
            })
            .collect();
        let renders = match node.kind {
            NodeKind::Difference => children.iter().any(|(link, _)| !link.subtract),
            _ => !children.is_empty(),
        };
        renders.then(|| combine_bounds(&node.kind, children))
    }

    /// Non-degenerate nodes of a subtree in pre-order, with their world matrices
    pub(crate) fn walk_visible(&self, id: NodeId, visit: &mut impl FnMut(&Node, &Mat4)) {
        let Some(node) = self.get(id) else {
            return;
        };
        let world = if id == self.root {
            Mat4::IDENTITY
        } else {
            self.world_matrix(id)
        };
        self.walk_from(node, &world, visit);
    }

    fn walk_from(&self, node: &Node, world: &Mat4, visit: &mut impl FnMut(&Node, &Mat4)) {
        if node.kind != NodeKind::Root && is_degenerate(node, world) {
            return;
        }
        visit(node, world);
        for link in &node.children {
            if let Some(child) = self.get(link.id) {
                self.walk_from(child, &child_world(world, child), visit);
            }
        }
    }
}

/// World matrix of `node` below a parent whose world matrix is `parent_world`
pub(crate) fn child_world(parent_world: &Mat4, node: &Node) -> Mat4 {
    *parent_world * node.transform.matrix()
}

pub(crate) fn is_degenerate(node: &Node, world: &Mat4) -> bool {
    node.hidden || world.determinant() == 0.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn new_tree_has_only_root() {
        let tree = SceneTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.world_matrix(tree.root()), Mat4::IDENTITY);
        assert!(tree.generate_aabb(tree.root()).is_empty());
    }

    #[test]
    fn primitives_cannot_own_children() {
        let mut tree = SceneTree::new();
        let ball = tree.add_child(tree.root(), Node::sphere(1.0)).unwrap();
        assert_eq!(
            tree.add_child(ball, Node::sphere(1.0)),
            Err(Error::NotAContainer(ball))
        );
    }

    #[test]
    fn world_matrix_composes_ancestors() {
        let mut tree = SceneTree::new();
        let group = tree
            .add_child(tree.root(), Node::union().translated(Vec3::X).scaled(Vec3::splat(2.0)))
            .unwrap();
        let ball = tree
            .add_child(group, Node::sphere(1.0).translated(Vec3::Y))
            .unwrap();

        let p = tree.world_matrix(ball).transform_point3(Vec3::ZERO);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_scale_is_degenerate() {
        let mut tree = SceneTree::new();
        let flat = tree
            .add_child(tree.root(), Node::union().scaled(Vec3::new(1.0, 0.0, 1.0)))
            .unwrap();
        let child = tree.add_child(flat, Node::sphere(1.0)).unwrap();
        assert!(tree.is_degenerate(flat));
        assert!(tree.is_degenerate(child));
        assert!(tree.generate_aabb(flat).is_empty());
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = SceneTree::new();
        let group = tree.add_child(tree.root(), Node::union()).unwrap();
        let ball = tree.add_child(group, Node::sphere(1.0)).unwrap();
        tree.remove(group).unwrap();

        assert!(tree.get(group).is_none());
        assert!(tree.get(ball).is_none());
        assert!(tree.children(tree.root()).is_empty());
        assert_eq!(tree.remove(tree.root()), Err(Error::RootImmutable));
    }

    #[test]
    fn reparent_moves_and_clears_subtract() {
        let mut tree = SceneTree::new();
        let cut = tree.add_child(tree.root(), Node::difference()).unwrap();
        let other = tree.add_child(tree.root(), Node::union()).unwrap();
        let hole = tree.add_child(cut, Node::sphere(1.0)).unwrap();
        tree.set_subtract(hole, true).unwrap();
        assert!(tree.is_subtract(hole));

        tree.reparent(hole, other).unwrap();
        assert_eq!(tree.parent(hole), Some(other));
        assert!(tree.children(cut).is_empty());
        assert!(!tree.is_subtract(hole));
        assert_eq!(tree.set_subtract(hole, true), Err(Error::NotDifferenceChild(hole)));
    }

    #[test]
    fn set_kind_keeps_links_consistent() {
        let mut tree = SceneTree::new();
        let cut = tree.add_child(tree.root(), Node::difference()).unwrap();
        let ball = tree.add_child(cut, Node::sphere(1.0)).unwrap();
        let hole = tree.add_child(cut, Node::sphere(0.5)).unwrap();
        tree.set_subtract(hole, true).unwrap();

        tree.set_kind(cut, NodeKind::Union).unwrap();
        assert_eq!(tree.node(cut).unwrap().kind(), NodeKind::Union);
        assert!(!tree.is_subtract(hole));
        assert_eq!(tree.set_subtract(hole, true), Err(Error::NotDifferenceChild(hole)));

        assert_eq!(
            tree.set_kind(cut, NodeKind::Sphere),
            Err(Error::KindChange(cut, NodeKind::Sphere.label()))
        );
        assert_eq!(tree.node(cut).unwrap().kind(), NodeKind::Union);

        tree.set_kind(ball, NodeKind::Cylinder).unwrap();
        assert_eq!(tree.node(ball).unwrap().kind(), NodeKind::Cylinder);

        assert!(tree.set_kind(tree.root(), NodeKind::Union).is_err());
        assert!(tree.set_kind(ball, NodeKind::Root).is_err());
    }

    #[test]
    fn reparent_into_descendant_hoists_target() {
        // root -> a -> b -> c ; move a under c
        let mut tree = SceneTree::new();
        let a = tree.add_child(tree.root(), Node::union().named("a")).unwrap();
        let b = tree.add_child(a, Node::union().named("b")).unwrap();
        let c = tree.add_child(b, Node::union().named("c")).unwrap();

        tree.reparent(a, c).unwrap();

        // c was hoisted under a's old parent, then a moved under c
        assert_eq!(tree.parent(c), Some(tree.root()));
        assert_eq!(tree.parent(a), Some(c));
        assert_eq!(tree.parent(b), Some(a));
        assert!(!tree.is_ancestor(a, c));
        assert_eq!(tree.descendants(tree.root()).len(), 4);
    }

    #[test]
    fn deep_drag_and_drop_keeps_tree_acyclic() {
        // The hoist is asymmetric: dragging a parent onto its grandchild and
        // then back does not restore the original shape.
        let mut tree = SceneTree::new();
        let a = tree.add_child(tree.root(), Node::union()).unwrap();
        let b = tree.add_child(a, Node::intersection()).unwrap();
        let c = tree.add_child(b, Node::difference()).unwrap();
        let leaf = tree.add_child(c, Node::sphere(1.0)).unwrap();

        tree.reparent(a, c).unwrap();
        tree.reparent(c, b).unwrap();

        for id in [a, b, c, leaf] {
            assert!(!tree.is_ancestor(id, id));
            assert!(tree.is_ancestor(tree.root(), id));
        }
        assert_eq!(tree.parent(c), Some(b));
        assert_eq!(tree.parent(b), Some(tree.root()));
        assert_eq!(tree.parent(a), Some(c));
    }

    #[test]
    fn reparent_refuses_invalid_moves() {
        let mut tree = SceneTree::new();
        let group = tree.add_child(tree.root(), Node::union()).unwrap();
        let ball = tree.add_child(group, Node::sphere(1.0)).unwrap();
        assert_eq!(tree.reparent(tree.root(), group), Err(Error::RootImmutable));
        assert_eq!(tree.reparent(group, group), Err(Error::SelfParent(group)));
        assert_eq!(tree.reparent(group, ball), Err(Error::NotAContainer(ball)));
    }

    #[test]
    fn find_by_name_searches_preorder() {
        let mut tree = SceneTree::new();
        let group = tree.add_child(tree.root(), Node::union().named("group")).unwrap();
        let ball = tree.add_child(group, Node::sphere(1.0).named("ball")).unwrap();
        assert_eq!(tree.find_by_name("ball"), Some(ball));
        assert_eq!(tree.find_by_name("missing"), None);
    }

    #[test]
    fn hidden_child_leaves_union_bound() {
        let mut tree = SceneTree::new();
        let group = tree.add_child(tree.root(), Node::union()).unwrap();
        tree.add_child(group, Node::sphere(1.0)).unwrap();
        let far = tree
            .add_child(group, Node::sphere(1.0).translated(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        assert_relative_eq!(tree.generate_aabb(group).max.x, 11.0, epsilon = 1e-5);

        tree.get_mut(far).unwrap().hidden = true;
        assert_relative_eq!(tree.generate_aabb(group).max.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(tree.scene_aabb().max.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn intersection_bound_skips_hidden_children() {
        let mut tree = SceneTree::new();
        let both = tree.add_child(tree.root(), Node::intersection()).unwrap();
        tree.add_child(both, Node::cuboid(Vec3::ONE)).unwrap();
        tree.add_child(both, Node::cuboid(Vec3::ONE).translated(Vec3::X).with_hidden(true))
            .unwrap();
        let b = tree.generate_aabb(both);
        assert_relative_eq!(b.min.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(b.max.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn intersection_bound_ignores_children_that_render_nothing() {
        let mut tree = SceneTree::new();
        let both = tree.add_child(tree.root(), Node::intersection()).unwrap();
        tree.add_child(both, Node::sphere(1.0)).unwrap();
        tree.add_child(both, Node::union()).unwrap();

        let b = tree.generate_aabb(both);
        assert!(!b.is_empty());
        assert_relative_eq!(b.max.x, 1.0, epsilon = 1e-5);

        let cut = tree.add_child(both, Node::difference()).unwrap();
        let hole = tree
            .add_child(cut, Node::cuboid(Vec3::splat(5.0)).translated(Vec3::X * 20.0))
            .unwrap();
        tree.set_subtract(hole, true).unwrap();
        assert!(tree.generate_aabb(cut).is_empty());

        let b = tree.generate_aabb(both);
        assert_relative_eq!(b.min.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(b.max.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn bound_is_empty_exactly_when_nothing_compiles() {
        use crate::compiler::SceneCompiler;

        let mut tree = SceneTree::new();
        let both = tree.add_child(tree.root(), Node::intersection()).unwrap();
        let empty = tree.add_child(both, Node::union()).unwrap();
        assert!(tree.generate_aabb(both).is_empty());
        assert_eq!(SceneCompiler::default().compile(&tree).unwrap().render_count(), 0);

        tree.add_child(empty, Node::sphere(1.0)).unwrap();
        assert!(!tree.generate_aabb(both).is_empty());
        assert_eq!(SceneCompiler::default().compile(&tree).unwrap().render_count(), 1);
    }
}
