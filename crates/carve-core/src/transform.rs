//! Node-local transforms: translation, rotation (degrees about an axis), scale

use glam::{Mat4, Quat, Vec3};

/// Rotation as an angle in degrees about an axis.
///
/// The axis is normalized on use; a zero-length axis means no rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub angle: f32,
    pub axis: Vec3,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        angle: 0.0,
        axis: Vec3::Y,
    };

    pub fn new(angle: f32, axis: Vec3) -> Self {
        Self { angle, axis }
    }

    pub fn to_quat(self) -> Quat {
        match self.axis.try_normalize() {
            Some(axis) => Quat::from_axis_angle(axis, self.angle.to_radians()),
            None => Quat::IDENTITY,
        }
    }

    pub fn from_quat(q: Quat) -> Self {
        let (axis, angle) = q.normalize().to_axis_angle();
        Self {
            angle: angle.to_degrees(),
            axis,
        }
    }

    /// Apply `self` first, then `next`
    pub fn then(self, next: Rotation) -> Self {
        Self::from_quat(next.to_quat() * self.to_quat())
    }

    /// True when both describe the same orientation (q and -q included)
    pub fn approx_eq(self, other: Rotation, epsilon: f32) -> bool {
        self.to_quat().dot(other.to_quat()).abs() >= 1.0 - epsilon
    }
}

/// A node's transform relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub scale: Vec3,
    pub rotation: Rotation,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
        rotation: Rotation::IDENTITY,
    };

    /// translate · rotate · scale
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            self.rotation.to_quat(),
            self.translation,
        )
    }
}

/// Length of the shortest basis vector of `m`, the most a unit step can shrink
pub fn min_axis_scale(m: &Mat4) -> f32 {
    m.x_axis
        .truncate()
        .length()
        .min(m.y_axis.truncate().length())
        .min(m.z_axis.truncate().length())
}

/// True when all three basis vectors of `m` have the same length
pub fn has_uniform_scale(m: &Mat4) -> bool {
    let x = m.x_axis.truncate().length();
    let y = m.y_axis.truncate().length();
    let z = m.z_axis.truncate().length();
    let tolerance = 1e-5 * x.max(y).max(z).max(1.0);
    (x - y).abs() <= tolerance && (x - z).abs() <= tolerance
}
