//! Convex mesh geometry
//!
//! Meshes are stored in model space and placed in the world by a
//! translation only. They are immutable once built and shared through
//! `Arc` by the asset cache.

use crate::foundation::math::Vec3;
use super::primitives::{BoundingBox, Ray, Triangle};

/// Immutable convex vertex set with a triangle index list
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Option<BoundingBox>,
}

impl ConvexMesh {
    /// Creates a mesh from MODEL SPACE vertices and triangle indices
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            bounds: None,
        }
    }

    /// Attaches a precomputed bounding box, computing it when `bounds` is `None`
    pub fn with_bounds(mut self, bounds: Option<BoundingBox>) -> Self {
        self.bounds = bounds.or_else(|| Self::compute_bounds(&self.vertices));
        self
    }

    /// Axis-aligned cuboid centred on the model origin
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        // Counter-clockwise from outside
        let indices = vec![
            0, 3, 2, 0, 2, 1, // -Z
            4, 5, 6, 4, 6, 7, // +Z
            0, 4, 7, 0, 7, 3, // -X
            1, 2, 6, 1, 6, 5, // +X
            0, 1, 5, 0, 5, 4, // -Y
            3, 7, 6, 3, 6, 2, // +Y
        ];
        Self::new(vertices, indices).with_bounds(None)
    }

    /// Model-space vertices
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle index list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// True when the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Model-space triangles; index triples referring past the vertex list are skipped
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            let v0 = *self.vertices.get(tri[0] as usize)?;
            let v1 = *self.vertices.get(tri[1] as usize)?;
            let v2 = *self.vertices.get(tri[2] as usize)?;
            Some(Triangle::new(v0, v1, v2))
        })
    }

    /// Model-space bounds, precomputed or derived from the vertices
    pub fn local_bounds(&self) -> Option<BoundingBox> {
        self.bounds.or_else(|| Self::compute_bounds(&self.vertices))
    }

    fn compute_bounds(vertices: &[Vec3]) -> Option<BoundingBox> {
        let first = *vertices.first()?;
        Some(vertices.iter().fold(
            BoundingBox::from_points(first, first),
            |acc, v| BoundingBox::from_points(acc.min.inf(v), acc.max.sup(v)),
        ))
    }

    /// Closest ray hit against the mesh placed at `offset`
    /// Returns (t, hit_point, normal)
    pub fn intersect_ray(&self, ray: &Ray, offset: Vec3) -> Option<(f32, Vec3, Vec3)> {
        let bounds = self.local_bounds()?.translated(offset);
        // Cheap reject before testing every triangle
        if !bounds.contains_point(ray.origin) && bounds.intersect_ray(ray).is_none() {
            return None;
        }

        let local = Ray::new(ray.origin - offset, ray.direction);
        self.triangles()
            .filter_map(|tri| tri.intersect_ray(&local).map(|(t, _, _)| (t, tri)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, tri)| (t, ray.point_at(t), tri.normal()))
    }

    /// Places the mesh in the world for a GJK query
    pub fn placed(&self, offset: Vec3) -> ConvexSet<'_> {
        ConvexSet::new(&self.vertices, offset)
    }
}

/// A borrowed convex vertex set translated into world space
#[derive(Debug, Clone, Copy)]
pub struct ConvexSet<'a> {
    /// Model-space vertices
    pub vertices: &'a [Vec3],
    /// World translation applied to every vertex
    pub offset: Vec3,
}

impl<'a> ConvexSet<'a> {
    /// Creates a placed vertex set
    pub fn new(vertices: &'a [Vec3], offset: Vec3) -> Self {
        Self { vertices, offset }
    }

    /// Vertex furthest along `direction`, or `None` for an empty set
    pub fn furthest_point(&self, direction: &Vec3) -> Option<Vec3> {
        self.vertices
            .iter()
            .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
            .map(|v| v + self.offset)
    }
}
