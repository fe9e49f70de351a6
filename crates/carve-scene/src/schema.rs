//! Scene document schema
//!
//! Serde types mirror the on-disk JSON one to one. Serde rejects unknown
//! keys and wrong value types; [`NodeDoc::validate`] then checks the rules a
//! type system cannot express (which fields belong to which node type,
//! subtract indices in range, non-negative sizes).

use crate::{Result, SceneError};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Sphere,
    Box,
    Torus,
    Line,
    Cylinder,
    Union,
    Intersection,
    Difference,
    Ref,
}

impl NodeType {
    fn is_primitive(self) -> bool {
        matches!(
            self,
            NodeType::Sphere | NodeType::Box | NodeType::Torus | NodeType::Line | NodeType::Cylinder
        )
    }

    fn is_construction(self) -> bool {
        matches!(
            self,
            NodeType::Union | NodeType::Intersection | NodeType::Difference
        )
    }

    /// Shape fields this type requires; no other shape field is allowed
    fn shape_fields(self) -> &'static [&'static str] {
        match self {
            NodeType::Sphere | NodeType::Cylinder => &["radius"],
            NodeType::Box => &["size"],
            NodeType::Torus => &["ringRadius", "majorRadius"],
            NodeType::Line => &["height", "radius"],
            NodeType::Ref => &["path"],
            NodeType::Union | NodeType::Intersection | NodeType::Difference => &[],
        }
    }
}

/// A scalar applied to all three axes, or one value per axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extent {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl Extent {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Extent::Uniform(v) => Vec3::splat(v),
            Extent::PerAxis(v) => Vec3::from_array(v),
        }
    }

    /// The compact form: a scalar when all axes agree
    pub fn from_vec3(v: Vec3) -> Self {
        if v.x == v.y && v.x == v.z {
            Extent::Uniform(v.x)
        } else {
            Extent::PerAxis(v.to_array())
        }
    }

    fn values(self) -> Vec<f32> {
        match self {
            Extent::Uniform(v) => vec![v],
            Extent::PerAxis(v) => v.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationDoc {
    /// Degrees
    pub angle: f32,
    pub axis: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Extent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationDoc>,
}

impl TransformDoc {
    pub fn is_identity(&self) -> bool {
        self.position.is_none() && self.scale.is_none() && self.rotation.is_none()
    }
}

/// One node of a scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodeDoc {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Extent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ring_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtract_indices: Vec<usize>,
}

impl NodeDoc {
    pub fn new(kind: NodeType) -> Self {
        Self {
            kind,
            name: None,
            hidden: false,
            material: None,
            radius: None,
            size: None,
            ring_radius: None,
            major_radius: None,
            height: None,
            path: None,
            transform: None,
            children: Vec::new(),
            subtract_indices: Vec::new(),
        }
    }

    /// Check everything serde cannot, recursively.
    ///
    /// `pointer` is the JSON pointer of this node, used in error messages.
    pub fn validate(&self, pointer: &str) -> Result<()> {
        let present = [
            ("radius", self.radius.is_some()),
            ("size", self.size.is_some()),
            ("ringRadius", self.ring_radius.is_some()),
            ("majorRadius", self.major_radius.is_some()),
            ("height", self.height.is_some()),
            ("path", self.path.is_some()),
        ];
        let required = self.kind.shape_fields();
        for (field, is_present) in present {
            let wanted = required.contains(&field);
            if is_present && !wanted {
                return Err(SceneError::schema(
                    &format!("{pointer}/{field}"),
                    format!("field not allowed on a {:?} node", self.kind),
                ));
            }
            if !is_present && wanted {
                return Err(SceneError::schema(
                    pointer,
                    format!("missing required field '{field}'"),
                ));
            }
        }

        for (field, value) in [
            ("radius", self.radius),
            ("ringRadius", self.ring_radius),
            ("majorRadius", self.major_radius),
            ("height", self.height),
        ] {
            if let Some(v) = value {
                non_negative(&format!("{pointer}/{field}"), v)?;
            }
        }
        if let Some(size) = self.size {
            for v in size.values() {
                non_negative(&format!("{pointer}/size"), v)?;
            }
        }

        if self.material.is_some() && !self.kind.is_primitive() {
            return Err(SceneError::schema(
                &format!("{pointer}/material"),
                "material is only allowed on primitives",
            ));
        }
        if !self.children.is_empty() && !self.kind.is_construction() {
            return Err(SceneError::schema(
                &format!("{pointer}/children"),
                format!("a {:?} node cannot have children", self.kind),
            ));
        }
        if !self.subtract_indices.is_empty() && self.kind != NodeType::Difference {
            return Err(SceneError::schema(
                &format!("{pointer}/subtractIndices"),
                "subtractIndices is only allowed on difference nodes",
            ));
        }
        for (i, &index) in self.subtract_indices.iter().enumerate() {
            if index >= self.children.len() {
                return Err(SceneError::schema(
                    &format!("{pointer}/subtractIndices/{i}"),
                    format!("index {index} out of range for {} children", self.children.len()),
                ));
            }
        }

        if let Some(transform) = &self.transform {
            transform.validate(&format!("{pointer}/transform"))?;
        }

        for (i, child) in self.children.iter().enumerate() {
            child.validate(&format!("{pointer}/children/{i}"))?;
        }
        Ok(())
    }
}

impl TransformDoc {
    fn validate(&self, pointer: &str) -> Result<()> {
        if let Some(position) = self.position {
            finite(&format!("{pointer}/position"), &position)?;
        }
        if let Some(scale) = self.scale {
            finite(&format!("{pointer}/scale"), &scale.values())?;
        }
        if let Some(rotation) = self.rotation {
            finite(&format!("{pointer}/rotation/angle"), &[rotation.angle])?;
            finite(&format!("{pointer}/rotation/axis"), &rotation.axis)?;
        }
        Ok(())
    }
}

fn finite(pointer: &str, values: &[f32]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SceneError::schema(pointer, "value must be finite"))
    }
}

fn non_negative(pointer: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SceneError::schema(pointer, "value must be a finite number >= 0"))
    }
}

/// Split a parsed JSON value into its top-level node documents and validate
/// each of them
pub fn parse_document(value: Value) -> Result<Vec<NodeDoc>> {
    let docs = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| parse_node(item, &format!("/{i}")))
            .collect::<Result<Vec<_>>>()?,
        Value::Object(_) => vec![parse_node(value, "")?],
        _ => {
            return Err(SceneError::schema(
                "",
                "document must be a node object or an array of node objects",
            ));
        }
    };
    Ok(docs)
}

fn parse_node(value: Value, pointer: &str) -> Result<NodeDoc> {
    let doc = deserialize_node(value, pointer)?;
    doc.validate(pointer)?;
    Ok(doc)
}

/// Deserialize one level at a time so serde errors carry the pointer of the
/// node they occur in
fn deserialize_node(mut value: Value, pointer: &str) -> Result<NodeDoc> {
    let children = match value.as_object_mut().and_then(|map| map.remove("children")) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(SceneError::schema(
                &format!("{pointer}/children"),
                format!("expected an array, found {other}"),
            ));
        }
        None => Vec::new(),
    };

    let mut doc: NodeDoc =
        serde_json::from_value(value).map_err(|e| SceneError::schema(pointer, e.to_string()))?;
    doc.children = children
        .into_iter()
        .enumerate()
        .map(|(i, child)| deserialize_node(child, &format!("{pointer}/children/{i}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(doc)
}
