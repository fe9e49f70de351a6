//! Per-frame uniform block consumed by the ray-marching shader

use crate::compiler::CompiledScene;
use crate::gpu::{Operation, PrimitiveDesc, TransformDesc};
use crate::{Error, Result, Table};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Primitive slots in the uniform block
pub const MAX_PRIMITIVES: usize = 100;
/// Transform slots in the uniform block
pub const MAX_TRANSFORMS: usize = 100;
/// Operation slots in the uniform block
pub const MAX_OPERATIONS: usize = 100;

/// Pinhole camera parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    /// Width over height
    pub aspect_ratio: f32,
    pub focal_length: f32,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -5.0),
            direction: Vec3::Z,
            up: Vec3::Y,
            aspect_ratio: 16.0 / 9.0,
            focal_length: 1.0,
            zoom: 1.0,
        }
    }
}

/// Uniform buffer data sent to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SceneUniforms {
    pub camera_pos: [f32; 3],
    pub aspect_ratio: f32,
    pub camera_dir: [f32; 3],
    pub focal_length: f32,
    pub camera_up: [f32; 3],
    pub inverse_zoom: f32,
    pub primitives: [PrimitiveDesc; MAX_PRIMITIVES],
    pub transforms: [TransformDesc; MAX_TRANSFORMS],
    pub operations: [Operation; MAX_OPERATIONS],
    pub operation_count: u32,
    pub _pad: [u32; 3],
}

impl SceneUniforms {
    /// Copy a compiled scene verbatim into a fresh block
    pub fn from_compiled(camera: &Camera, scene: &CompiledScene) -> Result<Self> {
        fits(Table::Primitives, scene.primitives.len(), MAX_PRIMITIVES)?;
        fits(Table::Transforms, scene.transforms.len(), MAX_TRANSFORMS)?;
        fits(Table::Operations, scene.operations.len(), MAX_OPERATIONS)?;

        let mut uniforms = Self::zeroed();
        uniforms.set_camera(camera);
        uniforms.primitives[..scene.primitives.len()].copy_from_slice(&scene.primitives);
        uniforms.transforms[..scene.transforms.len()].copy_from_slice(&scene.transforms);
        uniforms.operations[..scene.operations.len()].copy_from_slice(&scene.operations);
        uniforms.operation_count = scene.operations.len() as u32;
        Ok(uniforms)
    }

    /// Update only the camera fields, keeping the scene tables
    pub fn set_camera(&mut self, camera: &Camera) {
        self.camera_pos = camera.position.to_array();
        self.camera_dir = camera.direction.normalize_or_zero().to_array();
        self.camera_up = camera.up.normalize_or_zero().to_array();
        self.aspect_ratio = camera.aspect_ratio;
        self.focal_length = camera.focal_length;
        self.inverse_zoom = if camera.zoom == 0.0 {
            1.0
        } else {
            camera.zoom.recip()
        };
    }

    /// Raw bytes ready for a buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

fn fits(table: Table, count: usize, capacity: usize) -> Result<()> {
    if count > capacity {
        return Err(Error::UniformOverflow {
            table,
            count,
            capacity,
        });
    }
    Ok(())
}
