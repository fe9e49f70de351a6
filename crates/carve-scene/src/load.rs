//! Scene import
//!
//! Loading happens in three passes: parse and validate the document, splice
//! in every `ref`, then build nodes. Only the last pass touches the tree.

use crate::schema::{Extent, NodeDoc, NodeType, RotationDoc, TransformDoc, parse_document};
use crate::{Result, SceneError};
use carve_core::node::{Node, NodeId};
use carve_core::transform::Rotation;
use carve_core::tree::SceneTree;
use glam::Vec3;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Load a scene file into a fresh tree
pub fn load_file(path: impl AsRef<Path>) -> Result<SceneTree> {
    let mut resolver = Resolver::default();
    let docs = resolver.load_docs(path.as_ref())?;
    let mut tree = SceneTree::new();
    let root = tree.root();
    build_all(&mut tree, root, &docs)?;
    Ok(tree)
}

/// Load a scene from a JSON string; `ref` paths resolve against `base_dir`
pub fn load_str(json: &str, base_dir: impl AsRef<Path>) -> Result<SceneTree> {
    let mut tree = SceneTree::new();
    let root = tree.root();
    import_into(&mut tree, root, json, base_dir)?;
    Ok(tree)
}

/// Append the nodes of a JSON document under `parent`.
///
/// Returns the ids of the new top-level nodes. On error the tree is left
/// untouched.
pub fn import_into(
    tree: &mut SceneTree,
    parent: NodeId,
    json: &str,
    base_dir: impl AsRef<Path>,
) -> Result<Vec<NodeId>> {
    let value: Value = serde_json::from_str(json)?;
    let mut resolver = Resolver::default();
    let docs = parse_document(value)?
        .into_iter()
        .map(|doc| resolver.resolve(doc, base_dir.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    if !tree.node(parent)?.kind().is_container() {
        return Err(carve_core::Error::NotAContainer(parent).into());
    }
    build_all(tree, parent, &docs)
}

/// Tracks the files currently being spliced to catch reference cycles
#[derive(Default)]
struct Resolver {
    stack: Vec<PathBuf>,
}

impl Resolver {
    fn load_docs(&mut self, path: &Path) -> Result<Vec<NodeDoc>> {
        let io_error = |source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        };
        let canonical = fs::canonicalize(path).map_err(io_error)?;
        if self.stack.contains(&canonical) {
            return Err(SceneError::RefCycle(canonical));
        }
        let text = fs::read_to_string(&canonical).map_err(io_error)?;
        let docs = parse_document(serde_json::from_str(&text)?)?;

        let base = canonical.parent().map(Path::to_path_buf).unwrap_or_default();
        self.stack.push(canonical);
        let resolved = docs
            .into_iter()
            .map(|doc| self.resolve(doc, &base))
            .collect::<Result<Vec<_>>>();
        if let Some(done) = self.stack.pop() {
            tracing::info!("Loaded scene file {}", done.display());
        }
        resolved
    }

    /// Replace every `ref` in `doc` by the content it points to
    fn resolve(&mut self, mut doc: NodeDoc, base: &Path) -> Result<NodeDoc> {
        if doc.kind != NodeType::Ref {
            doc.children = std::mem::take(&mut doc.children)
                .into_iter()
                .map(|child| self.resolve(child, base))
                .collect::<Result<Vec<_>>>()?;
            return Ok(doc);
        }

        let target = base.join(doc.path.as_deref().unwrap_or_default());
        let mut docs = self.load_docs(&target)?;
        let mut spliced = if docs.len() == 1 {
            docs.remove(0)
        } else {
            let mut union = NodeDoc::new(NodeType::Union);
            union.children = docs;
            union
        };

        if doc.name.is_some() {
            spliced.name = doc.name;
        }
        spliced.hidden |= doc.hidden;
        if let Some(outer) = doc.transform {
            spliced.transform = Some(compose(spliced.transform.unwrap_or_default(), &outer));
        }
        Ok(spliced)
    }
}

/// Layer `outer` on top of `inner`: positions add, scales multiply,
/// rotations apply inner first
fn compose(inner: TransformDoc, outer: &TransformDoc) -> TransformDoc {
    let position = match (inner.position, outer.position) {
        (Some(a), Some(b)) => Some((Vec3::from_array(a) + Vec3::from_array(b)).to_array()),
        (a, b) => a.or(b),
    };
    let scale = match (inner.scale, outer.scale) {
        (Some(a), Some(b)) => Some(Extent::from_vec3(a.to_vec3() * b.to_vec3())),
        (a, b) => a.or(b),
    };
    let rotation = match (inner.rotation, outer.rotation) {
        (Some(a), Some(b)) => {
            let combined = rotation_of(a).then(rotation_of(b));
            Some(RotationDoc {
                angle: combined.angle,
                axis: combined.axis.to_array(),
            })
        }
        (a, b) => a.or(b),
    };
    TransformDoc {
        position,
        scale,
        rotation,
    }
}

fn rotation_of(doc: RotationDoc) -> Rotation {
    Rotation::new(doc.angle, Vec3::from_array(doc.axis))
}

fn build_all(tree: &mut SceneTree, parent: NodeId, docs: &[NodeDoc]) -> Result<Vec<NodeId>> {
    docs.iter().map(|doc| build(tree, parent, doc)).collect()
}

fn build(tree: &mut SceneTree, parent: NodeId, doc: &NodeDoc) -> Result<NodeId> {
    let radius = doc.radius.unwrap_or(1.0);
    let mut node = match doc.kind {
        NodeType::Sphere => Node::sphere(radius),
        NodeType::Box => Node::cuboid(doc.size.map_or(Vec3::ONE, |s| s.to_vec3() * 0.5)),
        NodeType::Torus => Node::torus(
            doc.major_radius.unwrap_or(1.0),
            doc.ring_radius.unwrap_or_default(),
        ),
        NodeType::Line => Node::line(doc.height.unwrap_or_default(), radius),
        NodeType::Cylinder => Node::cylinder(radius),
        NodeType::Union => Node::union(),
        NodeType::Intersection => Node::intersection(),
        NodeType::Difference => Node::difference(),
        NodeType::Ref => {
            return Err(SceneError::schema("", "unresolved ref node"));
        }
    };

    if let Some(name) = &doc.name {
        node = node.named(name.clone());
    }
    node = node
        .with_hidden(doc.hidden)
        .with_material(doc.material.unwrap_or_default());
    if let Some(transform) = &doc.transform {
        if let Some(position) = transform.position {
            node = node.translated(Vec3::from_array(position));
        }
        if let Some(scale) = transform.scale {
            node = node.scaled(scale.to_vec3());
        }
        if let Some(rotation) = transform.rotation {
            node = node.rotated(rotation.angle, Vec3::from_array(rotation.axis));
        }
    }

    let id = tree.add_child(parent, node)?;
    for (i, child) in doc.children.iter().enumerate() {
        let child_id = build(tree, id, child)?;
        if doc.subtract_indices.contains(&i) {
            tree.set_subtract(child_id, true)?;
        }
    }
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use carve_core::node::NodeKind;

    #[test]
    fn shape_sizes_fold_into_scale() {
        let tree = load_str(
            r#"[
                { "type": "sphere", "radius": 2.0, "name": "ball" },
                { "type": "box", "size": [2.0, 4.0, 6.0], "name": "crate" },
                { "type": "torus", "majorRadius": 2.0, "ringRadius": 0.5, "name": "ring" },
                { "type": "line", "height": 3.0, "radius": 0.5, "name": "rod" }
            ]"#,
            ".",
        )
        .unwrap();

        let ball = tree.node(tree.find_by_name("ball").unwrap()).unwrap();
        assert_eq!(ball.transform.scale, Vec3::splat(2.0));

        let crate_node = tree.node(tree.find_by_name("crate").unwrap()).unwrap();
        assert_eq!(crate_node.transform.scale, Vec3::new(1.0, 2.0, 3.0));

        let ring = tree.node(tree.find_by_name("ring").unwrap()).unwrap();
        assert_eq!(ring.kind(), NodeKind::Torus { ring_ratio: 0.25 });

        let rod = tree.node(tree.find_by_name("rod").unwrap()).unwrap();
        assert_eq!(rod.kind(), NodeKind::Line { half_height_ratio: 3.0 });
    }

    #[test]
    fn transform_is_applied_on_top_of_shape() {
        let tree = load_str(
            r#"{
                "type": "sphere",
                "radius": 2.0,
                "transform": {
                    "position": [0, 0, 5],
                    "scale": [1, 2, 1],
                    "rotation": { "angle": 90, "axis": [0, 1, 0] }
                }
            }"#,
            ".",
        )
        .unwrap();
        let id = tree.children(tree.root())[0].id;
        let node = tree.node(id).unwrap();
        assert_eq!(node.transform.translation, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(node.transform.scale, Vec3::new(2.0, 4.0, 2.0));
        assert_relative_eq!(node.transform.rotation.angle, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn subtract_indices_mark_children() {
        let tree = load_str(
            r#"{
                "type": "difference",
                "subtractIndices": [0],
                "children": [
                    { "type": "cylinder", "radius": 0.2 },
                    { "type": "box", "size": 1 }
                ]
            }"#,
            ".",
        )
        .unwrap();
        let cut = tree.children(tree.root())[0].id;
        let links = tree.children(cut);
        assert!(links[0].subtract);
        assert!(!links[1].subtract);
    }

    #[test]
    fn failed_import_leaves_tree_untouched() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        import_into(&mut tree, root, r#"{ "type": "sphere", "radius": 1 }"#, ".").unwrap();

        let bad = r#"[
            { "type": "sphere", "radius": 1 },
            { "type": "box" }
        ]"#;
        assert!(import_into(&mut tree, root, bad, ".").is_err());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn syntax_errors_are_json_errors() {
        assert!(matches!(
            load_str("{ not json", "."),
            Err(SceneError::Json(_))
        ));
    }

    #[test]
    fn compose_layers_outer_transform() {
        let inner = TransformDoc {
            position: Some([1.0, 0.0, 0.0]),
            scale: Some(Extent::Uniform(2.0)),
            rotation: None,
        };
        let outer = TransformDoc {
            position: Some([0.0, 1.0, 0.0]),
            scale: Some(Extent::PerAxis([1.0, 3.0, 1.0])),
            rotation: Some(RotationDoc {
                angle: 45.0,
                axis: [0.0, 0.0, 1.0],
            }),
        };
        let combined = compose(inner, &outer);
        assert_eq!(combined.position, Some([1.0, 1.0, 0.0]));
        assert_eq!(combined.scale, Some(Extent::PerAxis([2.0, 6.0, 2.0])));
        assert_eq!(combined.rotation, outer.rotation);
    }
}
