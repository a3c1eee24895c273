//! Upright cylinder used as the controller's collision volume

use crate::foundation::math::{Vec3, UP};
use super::primitives::{BoundingBox, Contact};

/// Squared distance under which the cylinder axis counts as inside a box footprint
const FOOTPRINT_EPSILON: f32 = 1e-10;

/// Vertical cylinder anchored at the centre of its bottom disk (the feet)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    /// Centre of the bottom disk
    pub base: Vec3,
    /// Horizontal radius
    pub radius: f32,
    /// Height above `base`
    pub height: f32,
}

impl Cylinder {
    /// Creates a cylinder standing on `base`
    pub fn new(base: Vec3, radius: f32, height: f32) -> Self {
        Self { base, radius, height }
    }

    /// World height of the top disk
    pub fn top(&self) -> f32 {
        self.base.y + self.height
    }

    /// Centre of the cylinder's volume
    pub fn center(&self) -> Vec3 {
        self.base + UP * (self.height * 0.5)
    }

    /// Tight axis-aligned box around the cylinder
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            Vec3::new(self.base.x - self.radius, self.base.y, self.base.z - self.radius),
            Vec3::new(self.base.x + self.radius, self.top(), self.base.z + self.radius),
        )
    }

    /// Moves the cylinder by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.base += offset;
    }

    /// Vertices of a prism approximating the cylinder, for GJK
    ///
    /// `segments` points on the bottom ring followed by the same ring raised
    /// to the top. At least three segments are always produced.
    pub fn hull_points(&self, segments: usize) -> Vec<Vec3> {
        let segments = segments.max(3);
        let step = std::f32::consts::TAU / segments as f32;
        let ring: Vec<Vec3> = (0..segments)
            .map(|i| {
                let angle = step * i as f32;
                self.base + Vec3::new(angle.cos() * self.radius, 0.0, angle.sin() * self.radius)
            })
            .collect();

        let lift = UP * self.height;
        ring.iter()
            .copied()
            .chain(ring.iter().map(|p| p + lift))
            .collect()
    }

    /// Cheap height-range pre-cull against a box
    pub fn overlaps_vertically(&self, bounds: &BoundingBox) -> bool {
        self.base.y < bounds.max.y && self.top() > bounds.min.y
    }

    /// True when the cylinder axis passes through the box footprint
    pub fn axis_inside_footprint(&self, bounds: &BoundingBox) -> bool {
        self.footprint_distance_sq(bounds) <= FOOTPRINT_EPSILON
    }

    /// Squared horizontal distance from the axis to a box footprint
    pub fn footprint_distance_sq(&self, bounds: &BoundingBox) -> f32 {
        let (dx, dz) = self.footprint_offset(bounds);
        dx * dx + dz * dz
    }

    fn footprint_offset(&self, bounds: &BoundingBox) -> (f32, f32) {
        let closest_x = self.base.x.clamp(bounds.min.x, bounds.max.x);
        let closest_z = self.base.z.clamp(bounds.min.z, bounds.max.z);
        (self.base.x - closest_x, self.base.z - closest_z)
    }

    /// Closest-point test against a box, returning the minimum push-out
    ///
    /// The horizontal push is always a candidate. Up and down pushes are
    /// only candidates while the axis is inside the box footprint, so a
    /// controller clipping the edge of a box slides off its side instead of
    /// popping on top of it. `step_up` widens that: any box whose top is at
    /// most `step_up` above the feet resolves upward.
    pub fn test_box(&self, bounds: &BoundingBox, step_up: Option<f32>) -> Option<Contact> {
        if !self.overlaps_vertically(bounds) {
            return None;
        }

        let (dx, dz) = self.footprint_offset(bounds);
        let dist_sq = dx * dx + dz * dz;
        if dist_sq >= self.radius * self.radius {
            return None;
        }

        let inside = dist_sq <= FOOTPRINT_EPSILON;
        let mut best = if inside {
            // Cheapest exit through one of the four side faces
            let exits = [
                (Vec3::new(-1.0, 0.0, 0.0), self.base.x - bounds.min.x + self.radius),
                (Vec3::new(1.0, 0.0, 0.0), bounds.max.x - self.base.x + self.radius),
                (Vec3::new(0.0, 0.0, -1.0), self.base.z - bounds.min.z + self.radius),
                (Vec3::new(0.0, 0.0, 1.0), bounds.max.z - self.base.z + self.radius),
            ];
            exits
                .iter()
                .fold(None::<Contact>, |best, &(normal, penetration)| match best {
                    Some(b) if b.penetration <= penetration => Some(b),
                    _ => Some(Contact { normal, penetration }),
                })?
        } else {
            let dist = dist_sq.sqrt();
            Contact {
                normal: Vec3::new(dx / dist, 0.0, dz / dist),
                penetration: self.radius - dist,
            }
        };

        let up = bounds.max.y - self.base.y;
        let down = self.top() - bounds.min.y;

        if inside {
            if up < best.penetration {
                best = Contact { normal: UP, penetration: up };
            }
            if down < best.penetration {
                best = Contact { normal: -UP, penetration: down };
            }
        }

        if let Some(allowance) = step_up {
            if up <= allowance {
                best = Contact { normal: UP, penetration: up };
            }
        }

        Some(best)
    }
}
