//! Collision shapes attached to world entities
//!
//! Every shape lives in world space and moves by translation only.

use std::sync::Arc;

use crate::foundation::math::Vec3;
use super::cylinder::Cylinder;
use super::mesh::ConvexMesh;
use super::primitives::{BoundingBox, Ray};
use super::slope::Slope;
use super::GeometryError;

/// Shape kind, used to pick the narrow-phase test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Axis-aligned box
    Box,
    /// Inclined plane
    Slope,
    /// General convex mesh
    Mesh,
    /// Upright cylinder (the controller)
    Cylinder,
}

/// World-space collision shape
#[derive(Debug, Clone)]
pub enum CollisionShape {
    /// Axis-aligned box, tested with cylinder-vs-box
    Box(BoundingBox),
    /// Inclined plane over a box footprint
    Slope(Slope),
    /// Shared convex mesh placed by translation, tested with GJK
    Mesh {
        /// Model-space geometry
        mesh: Arc<ConvexMesh>,
        /// World translation of the model origin
        position: Vec3,
    },
    /// Upright cylinder
    Cylinder(Cylinder),
}

impl CollisionShape {
    /// Shape kind discriminant
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Box(_) => ShapeKind::Box,
            Self::Slope(_) => ShapeKind::Slope,
            Self::Mesh { .. } => ShapeKind::Mesh,
            Self::Cylinder(_) => ShapeKind::Cylinder,
        }
    }

    /// World-space bounds
    ///
    /// An empty mesh collapses to a zero-size box at its position so it can
    /// still be indexed; it never produces a contact.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Self::Box(b) => *b,
            Self::Slope(s) => s.bounds,
            Self::Mesh { mesh, position } => mesh
                .local_bounds()
                .map(|b| b.translated(*position))
                .unwrap_or_else(|| BoundingBox::from_points(*position, *position)),
            Self::Cylinder(c) => c.bounding_box(),
        }
    }

    /// Moves the shape by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        match self {
            Self::Box(b) => b.translate(offset),
            Self::Slope(s) => s.translate(offset),
            Self::Mesh { position, .. } => *position += offset,
            Self::Cylinder(c) => c.translate(offset),
        }
    }

    /// Ray test returning (distance, hit_point, normal)
    ///
    /// Cylinders are never ray targets; only level geometry is probed.
    pub fn intersect_ray(&self, ray: &Ray) -> Result<Option<(f32, Vec3, Vec3)>, GeometryError> {
        match self {
            Self::Box(b) => Ok(b.intersect_ray(ray)),
            Self::Slope(s) => s.intersect_ray(ray),
            Self::Mesh { mesh, position } => Ok(mesh.intersect_ray(ray, *position)),
            Self::Cylinder(_) => Ok(None),
        }
    }
}
