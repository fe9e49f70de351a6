//! Scene export
//!
//! Primitives are written at unit size with every absolute dimension carried
//! by `transform.scale`, which is exactly how the tree stores them.

use crate::schema::{Extent, NodeDoc, NodeType, RotationDoc, TransformDoc};
use crate::{Result, SceneError};
use carve_core::node::{NodeId, NodeKind};
use carve_core::transform::{LocalTransform, Rotation};
use carve_core::tree::SceneTree;
use glam::Vec3;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Rotations closer than this to zero degrees are left out
const ANGLE_EPSILON: f32 = 1e-5;

/// Convert one node and its subtree. `None` for the root or an unknown id.
pub fn export_node(tree: &SceneTree, id: NodeId) -> Option<NodeDoc> {
    let node = tree.get(id)?;
    let mut doc = match node.kind() {
        NodeKind::Root => return None,
        NodeKind::Sphere => NodeDoc {
            radius: Some(1.0),
            ..NodeDoc::new(NodeType::Sphere)
        },
        NodeKind::Box => NodeDoc {
            size: Some(Extent::Uniform(2.0)),
            ..NodeDoc::new(NodeType::Box)
        },
        NodeKind::Torus { ring_ratio } => NodeDoc {
            major_radius: Some(1.0),
            ring_radius: Some(ring_ratio),
            ..NodeDoc::new(NodeType::Torus)
        },
        NodeKind::Line { half_height_ratio } => NodeDoc {
            radius: Some(1.0),
            height: Some(half_height_ratio * 2.0),
            ..NodeDoc::new(NodeType::Line)
        },
        NodeKind::Cylinder => NodeDoc {
            radius: Some(1.0),
            ..NodeDoc::new(NodeType::Cylinder)
        },
        NodeKind::Union => NodeDoc::new(NodeType::Union),
        NodeKind::Intersection => NodeDoc::new(NodeType::Intersection),
        NodeKind::Difference => NodeDoc::new(NodeType::Difference),
    };

    if !node.name.is_empty() {
        doc.name = Some(node.name.clone());
    }
    doc.hidden = node.hidden;
    if node.is_primitive() && node.material != 0 {
        doc.material = Some(node.material);
    }
    let transform = export_transform(&node.transform);
    if !transform.is_identity() {
        doc.transform = Some(transform);
    }

    let is_difference = node.kind() == NodeKind::Difference;
    for link in node.children() {
        if let Some(child) = export_node(tree, link.id) {
            if is_difference && link.subtract {
                doc.subtract_indices.push(doc.children.len());
            }
            doc.children.push(child);
        }
    }
    Some(doc)
}

fn export_transform(transform: &LocalTransform) -> TransformDoc {
    let position = (transform.translation != Vec3::ZERO).then(|| transform.translation.to_array());
    let scale = (transform.scale != Vec3::ONE).then(|| Extent::from_vec3(transform.scale));
    let rotation = Rotation::from_quat(transform.rotation.to_quat());
    let rotation = (rotation.angle.abs() > ANGLE_EPSILON).then(|| RotationDoc {
        angle: rotation.angle,
        axis: rotation.axis.to_array(),
    });
    TransformDoc {
        position,
        scale,
        rotation,
    }
}

/// The whole tree as a JSON document: a single object when the root has
/// one child, an array otherwise
pub fn export_document(tree: &SceneTree) -> Result<Value> {
    let mut docs: Vec<NodeDoc> = tree
        .children(tree.root())
        .iter()
        .filter_map(|link| export_node(tree, link.id))
        .collect();

    let value = match docs.pop() {
        Some(single) if docs.is_empty() => serde_json::to_value(single)?,
        Some(last) => {
            docs.push(last);
            serde_json::to_value(docs)?
        }
        None => Value::Array(Vec::new()),
    };
    Ok(value)
}

pub fn to_json_string(tree: &SceneTree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export_document(tree)?)?)
}

/// Write the tree to `path` as pretty-printed JSON
pub fn save_file(tree: &SceneTree, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = to_json_string(tree)?;
    fs::write(path, json).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved scene to {}", path.display());
    Ok(())
}
