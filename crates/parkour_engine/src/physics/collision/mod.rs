//! Collision geometry and narrow-phase tests
//!
//! # Module Organization
//!
//! - [`primitives`] - Boxes, rays, triangles and contacts
//! - [`cylinder`] - The controller's upright cylinder and cylinder-vs-box
//! - [`slope`] - Inclined planes and cylinder-vs-slope
//! - [`mesh`] - Immutable convex meshes placed by translation
//! - [`gjk`] - Convex-vs-convex intersection
//! - [`shape`] - The shape enum attached to world entities

pub mod cylinder;
pub mod gjk;
pub mod mesh;
pub mod primitives;
pub mod shape;
pub mod slope;

pub use cylinder::Cylinder;
pub use gjk::{gjk_intersect, gjk_intersect_with_direction, support, GjkResult, Simplex};
pub use mesh::{ConvexMesh, ConvexSet};
pub use primitives::{BoundingBox, Contact, Ray, Triangle};
pub use shape::{CollisionShape, ShapeKind};
pub use slope::{Slope, SlopeAxis};

use thiserror::Error;

/// Malformed geometry. Always fatal for the tick that meets it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Ascent does not name exactly one of the X or Z axes
    #[error("slope ascent {ascent:?} does not name exactly one horizontal axis")]
    MalformedSlope {
        /// The offending ascent vector
        ascent: [f32; 3],
    },

    /// Footprint has no length along the inclination axis
    #[error("slope with ascent {ascent:?} has zero run along its inclination axis")]
    DegenerateSlope {
        /// The ascent vector of the degenerate slope
        ascent: [f32; 3],
    },
}
