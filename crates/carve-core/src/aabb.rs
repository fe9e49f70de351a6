//! Axis-Aligned Bounding Box
//!
//! A box that has not seen any point yet is *empty* and stores NaN bounds.
//! Every operator treats an empty box as "no volume": unioning it changes
//! nothing, intersecting with it yields nothing.

use glam::{Mat4, Vec3};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// The box that contains nothing
    pub const EMPTY: Self = Self {
        min: Vec3::NAN,
        max: Vec3::NAN,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Degenerate box around a single point
    pub fn from_point(p: Vec3) -> Self {
        Self::new(p, p)
    }

    /// Smallest box containing all points (empty for no points)
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    /// Transform local-space points by `matrix`, then bound them
    pub fn from_local_points<I: IntoIterator<Item = Vec3>>(points: I, matrix: &Mat4) -> Self {
        Self::from_points(points.into_iter().map(|p| matrix.transform_point3(p)))
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_nan() || self.max.is_nan()
    }

    /// Grow the box to contain `p`
    pub fn add_point(&mut self, p: Vec3) {
        if self.is_empty() {
            *self = Self::from_point(p);
        } else {
            self.min = self.min.min(p);
            self.max = self.max.max(p);
        }
    }

    /// Grow the box to contain `other`; an empty `other` is a no-op
    pub fn union_with(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
        } else {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Shrink the box to the overlap with `other`.
    ///
    /// Disjoint ranges on any axis, or an empty operand, leave the box empty.
    pub fn intersect_with(&mut self, other: &Aabb) {
        if self.is_empty() || other.is_empty() {
            *self = Self::EMPTY;
            return;
        }
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min.cmpgt(max).any() {
            *self = Self::EMPTY;
        } else {
            self.min = min;
            self.max = max;
        }
    }

    /// Re-bound the eight corners pushed through `matrix`.
    ///
    /// Transforming `min`/`max` directly is wrong as soon as the matrix rotates.
    pub fn apply_transform(&mut self, matrix: &Mat4) {
        if self.is_empty() {
            return;
        }
        *self = Self::from_local_points(self.corners(), matrix);
    }

    pub fn union(mut self, other: &Aabb) -> Self {
        self.union_with(other);
        self
    }

    pub fn intersection(mut self, other: &Aabb) -> Self {
        self.intersect_with(other);
        self
    }

    pub fn transformed(mut self, matrix: &Mat4) -> Self {
        self.apply_transform(matrix);
        self
    }

    /// The eight corners, ordered by bit pattern (x = bit 0, y = bit 1, z = bit 2)
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        !self.is_empty() && p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Get the size of the bounding box (zero when empty)
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Get the center of the bounding box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
