//! Primitive collision shapes and intersection algorithms
//!
//! Axis-aligned boxes, rays and triangles. Pure math, no state.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Axis-aligned bounding box in world space
///
/// `min <= max` holds on every axis. Translation keeps the invariant
/// because both corners move by the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a new box from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "bounding box corners out of order: {min:?} > {max:?}"
        );
        Self { min, max }
    }

    /// Create the smallest box containing two arbitrary corner points
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// Create a box centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self::from_points(center - extents, center + extents)
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full size along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if this box contains a point (inclusive)
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Overlap test on all three axes
    ///
    /// Comparisons are strict, so boxes that only share a face do not
    /// collide. A controller standing on a floor touches it without
    /// overlapping it.
    pub fn test(&self, other: &BoundingBox) -> bool {
        self.min.x < other.max.x && self.max.x > other.min.x &&
        self.min.y < other.max.y && self.max.y > other.min.y &&
        self.min.z < other.max.z && self.max.z > other.min.z
    }

    /// Shift both corners by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.min += offset;
        self.max += offset;
    }

    /// Copy of this box shifted by `offset`
    pub fn translated(&self, offset: Vec3) -> Self {
        let mut moved = *self;
        moved.translate(offset);
        moved
    }

    /// Transform both corners by `matrix` and re-derive min/max
    ///
    /// Only exact for translation (and axis-aligned scale) matrices. A
    /// rotation is not applied as a true box transform, the two corners are
    /// transformed and re-sorted. No caller in this crate passes anything
    /// but a translation.
    pub fn translate_by_matrix(&mut self, matrix: &Mat4) {
        let a = matrix.transform_point(&Point3::from(self.min)).coords;
        let b = matrix.transform_point(&Point3::from(self.max)).coords;
        *self = Self::from_points(a, b);
    }

    /// Box grown by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        let pad = Vec3::repeat(margin);
        Self::from_points(self.min - pad, self.max + pad)
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Test ray intersection with this box using the slab method
    ///
    /// Returns (distance, hit_point, face_normal) for the entry face. A ray
    /// starting inside the box reports no hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        const PARALLEL_EPSILON: f32 = 1e-8;

        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut entry_axis = None;
        let mut entry_sign = 0.0;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];

            if direction.abs() < PARALLEL_EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            // Entering through the min face means the face normal points down the axis
            let mut sign = -1.0;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
                sign = 1.0;
            }

            if t0 > t_near {
                t_near = t0;
                entry_axis = Some(axis);
                entry_sign = sign;
            }
            t_far = t_far.min(t1);

            if t_near > t_far {
                return None;
            }
        }

        let axis = entry_axis?;
        if t_near < 0.0 {
            return None;
        }

        let mut point = ray.point_at(t_near);
        let mut normal = Vec3::zeros();
        normal[axis] = entry_sign;
        // Pin the hit exactly onto the face plane
        point[axis] = if entry_sign > 0.0 { self.max[axis] } else { self.min[axis] };

        Some((t_near, point, normal))
    }
}

/// A ray for ray casting and probing
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A triangle for ray casts against meshes
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None
        }
    }
}

/// Push-out between the controller and one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the entity toward the controller
    pub normal: Vec3,
    /// Distance to move along `normal` to separate, never negative
    pub penetration: f32,
}
