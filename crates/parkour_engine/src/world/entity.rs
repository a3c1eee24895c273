//! Entity records stored in the world arena

use std::sync::Arc;

use slotmap::new_key_type;

use crate::foundation::math::Vec3;
use crate::physics::collision::{
    BoundingBox, CollisionShape, ConvexMesh, Cylinder, ShapeKind, Slope,
};
use crate::spatial::SpatialRecord;

new_key_type! {
    /// Generation-checked handle to a world entity
    pub struct EntityKey;
}

/// A piece of level geometry or the controller
///
/// Shape, bounds and spatial record change together through the world,
/// never individually.
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) shape: CollisionShape,
    pub(crate) bounds: BoundingBox,
    pub(crate) slidable: bool,
    pub(crate) spatial: SpatialRecord,
}

impl Entity {
    /// Display name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World-space collision shape
    pub fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    /// Cached world-space bounds of the shape
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Whether slopes on this entity slide the controller
    pub fn is_slidable(&self) -> bool {
        self.slidable
    }

    /// Chunks the entity is indexed in
    pub fn spatial(&self) -> &SpatialRecord {
        &self.spatial
    }

    /// Shape kind
    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// True for the cylinder controller
    pub fn is_controller(&self) -> bool {
        self.kind() == ShapeKind::Cylinder
    }
}

/// Builder for a new entity
#[derive(Debug, Clone)]
pub struct EntityDesc {
    name: Option<String>,
    shape: CollisionShape,
    slidable: bool,
}

impl EntityDesc {
    fn with_shape(shape: CollisionShape) -> Self {
        Self {
            name: None,
            shape,
            slidable: false,
        }
    }

    /// Axis-aligned box
    pub fn boxed(bounds: BoundingBox) -> Self {
        Self::with_shape(CollisionShape::Box(bounds))
    }

    /// Inclined plane
    pub fn slope(slope: Slope) -> Self {
        Self::with_shape(CollisionShape::Slope(slope))
    }

    /// Shared convex mesh placed at `position`
    pub fn mesh(mesh: Arc<ConvexMesh>, position: Vec3) -> Self {
        Self::with_shape(CollisionShape::Mesh { mesh, position })
    }

    /// The player's cylinder
    pub fn controller(cylinder: Cylinder) -> Self {
        Self::with_shape(CollisionShape::Cylinder(cylinder)).named("controller")
    }

    /// Marks the entity's surfaces as slidable
    pub fn slidable(mut self) -> Self {
        self.slidable = true;
        self
    }

    /// Sets the diagnostic name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn build(self) -> Entity {
        let bounds = self.shape.bounding_box();
        let name = self
            .name
            .unwrap_or_else(|| format!("{:?}", self.shape.kind()).to_lowercase());
        Entity {
            name,
            shape: self.shape,
            bounds,
            slidable: self.slidable,
            spatial: SpatialRecord::default(),
        }
    }
}

/// Closest hit of a world ray cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Entity that was hit
    pub entity: EntityKey,
    /// Distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
}
