//! Inclined plane bounded to a rectangular footprint
//!
//! A slope is a solid wedge: its footprint is `bounds` projected onto XZ,
//! its low edge sits at `bounds.min.y` and its high edge at `bounds.max.y`.
//! The height rises linearly along exactly one horizontal axis.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use super::cylinder::Cylinder;
use super::primitives::{BoundingBox, Contact, Ray};
use super::GeometryError;

const AXIS_EPSILON: f32 = 1e-6;

/// Horizontal direction in which a slope rises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlopeAxis {
    /// Rises toward +X
    PosX,
    /// Rises toward -X
    NegX,
    /// Rises toward +Z
    PosZ,
    /// Rises toward -Z
    NegZ,
}

impl SlopeAxis {
    /// Unit horizontal vector pointing uphill
    pub fn uphill(self) -> Vec3 {
        match self {
            Self::PosX => Vec3::new(1.0, 0.0, 0.0),
            Self::NegX => Vec3::new(-1.0, 0.0, 0.0),
            Self::PosZ => Vec3::new(0.0, 0.0, 1.0),
            Self::NegZ => Vec3::new(0.0, 0.0, -1.0),
        }
    }

    fn along_x(self) -> bool {
        matches!(self, Self::PosX | Self::NegX)
    }
}

/// Inclined plane over a box footprint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slope {
    /// World-space extent of the wedge
    pub bounds: BoundingBox,
    /// Uphill direction; exactly one of the X or Z components may be non-zero
    pub ascent: Vec3,
}

impl Slope {
    /// Creates a slope; the ascent is validated lazily by every query
    pub fn new(bounds: BoundingBox, ascent: Vec3) -> Self {
        Self { bounds, ascent }
    }

    /// Determines the single horizontal axis the slope rises along
    pub fn inclination_axis(&self) -> Result<SlopeAxis, GeometryError> {
        let on_x = self.ascent.x.abs() > AXIS_EPSILON;
        let on_z = self.ascent.z.abs() > AXIS_EPSILON;

        let axis = match (on_x, on_z) {
            (true, false) if self.ascent.x > 0.0 => SlopeAxis::PosX,
            (true, false) => SlopeAxis::NegX,
            (false, true) if self.ascent.z > 0.0 => SlopeAxis::PosZ,
            (false, true) => SlopeAxis::NegZ,
            _ => {
                return Err(GeometryError::MalformedSlope {
                    ascent: self.ascent.into(),
                })
            }
        };

        if self.run(axis) <= AXIS_EPSILON {
            return Err(GeometryError::DegenerateSlope {
                ascent: self.ascent.into(),
            });
        }
        Ok(axis)
    }

    /// Horizontal length of the footprint along `axis`
    fn run(&self, axis: SlopeAxis) -> f32 {
        let size = self.bounds.size();
        if axis.along_x() { size.x } else { size.z }
    }

    /// Height difference between the low and high edges
    pub fn rise(&self) -> f32 {
        self.bounds.max.y - self.bounds.min.y
    }

    /// Fraction of the way uphill for a world (x, z), clamped to the footprint
    fn uphill_fraction(&self, axis: SlopeAxis, x: f32, z: f32) -> f32 {
        let b = &self.bounds;
        let run = self.run(axis);
        let t = match axis {
            SlopeAxis::PosX => (x - b.min.x) / run,
            SlopeAxis::NegX => (b.max.x - x) / run,
            SlopeAxis::PosZ => (z - b.min.z) / run,
            SlopeAxis::NegZ => (b.max.z - z) / run,
        };
        t.clamp(0.0, 1.0)
    }

    /// Surface height above world (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> Result<f32, GeometryError> {
        let axis = self.inclination_axis()?;
        Ok(self.bounds.min.y + self.uphill_fraction(axis, x, z) * self.rise())
    }

    /// Unit surface normal, always with a positive Y component
    pub fn normal(&self) -> Result<Vec3, GeometryError> {
        let axis = self.inclination_axis()?;
        let run = self.run(axis);
        let uphill = axis.uphill();
        Ok((Vec3::new(0.0, run, 0.0) - uphill * self.rise()).normalize())
    }

    /// Angle between the surface and the horizontal, in radians
    pub fn inclination(&self) -> Result<f32, GeometryError> {
        let axis = self.inclination_axis()?;
        Ok(self.rise().atan2(self.run(axis)))
    }

    /// Moves the slope by `offset`
    pub fn translate(&mut self, offset: Vec3) {
        self.bounds.translate(offset);
    }

    /// Ray test against the inclined upper surface
    ///
    /// Only rays travelling against the surface normal (from above) hit.
    /// Returns (distance, hit_point, normal).
    pub fn intersect_ray(&self, ray: &Ray) -> Result<Option<(f32, Vec3, Vec3)>, GeometryError> {
        let normal = self.normal()?;
        let denom = normal.dot(&ray.direction);
        if denom >= -AXIS_EPSILON {
            return Ok(None);
        }

        // Any point on the low edge lies on the plane
        let low_edge = match self.inclination_axis()? {
            SlopeAxis::PosX | SlopeAxis::PosZ => self.bounds.min,
            SlopeAxis::NegX => Vec3::new(self.bounds.max.x, self.bounds.min.y, self.bounds.min.z),
            SlopeAxis::NegZ => Vec3::new(self.bounds.min.x, self.bounds.min.y, self.bounds.max.z),
        };

        let t = normal.dot(&(low_edge - ray.origin)) / denom;
        if t < 0.0 {
            return Ok(None);
        }

        let mut point = ray.point_at(t);
        let b = &self.bounds;
        if point.x < b.min.x || point.x > b.max.x || point.z < b.min.z || point.z > b.max.z {
            return Ok(None);
        }
        point.y = self.height_at(point.x, point.z)?;

        Ok(Some((t, point, normal)))
    }

    /// Contact between the controller cylinder and the wedge
    ///
    /// While the axis is over the footprint the deepest point of the bottom
    /// disk (the point furthest uphill) is tested against the plane and the
    /// push-out runs along the surface normal. Beside the footprint, or past
    /// its high edge, the wedge behaves as a vertical wall.
    pub fn test_cylinder(&self, cylinder: &Cylinder) -> Result<Option<Contact>, GeometryError> {
        let axis = self.inclination_axis()?;
        let normal = self.normal()?;

        if !cylinder.overlaps_vertically(&self.bounds)
            || cylinder.footprint_distance_sq(&self.bounds) >= cylinder.radius * cylinder.radius
        {
            return Ok(None);
        }

        if !cylinder.axis_inside_footprint(&self.bounds) {
            let uphill = self.uphill_fraction(axis, cylinder.base.x, cylinder.base.z);
            let lateral_inside = if axis.along_x() {
                cylinder.base.z >= self.bounds.min.z && cylinder.base.z <= self.bounds.max.z
            } else {
                cylinder.base.x >= self.bounds.min.x && cylinder.base.x <= self.bounds.max.x
            };
            // Off the low edge the disk may still reach the surface; anything
            // else is the wedge's vertical side or back.
            if !(lateral_inside && uphill <= 0.0) {
                return Ok(cylinder.test_box(&self.bounds, None));
            }
        }

        let deepest = cylinder.base + axis.uphill() * cylinder.radius;
        let b = &self.bounds;
        let x = deepest.x.clamp(b.min.x, b.max.x);
        let z = deepest.z.clamp(b.min.z, b.max.z);
        let surface = self.bounds.min.y + self.uphill_fraction(axis, x, z) * self.rise();

        let gap = surface - cylinder.base.y;
        if gap <= 0.0 {
            return Ok(None);
        }

        Ok(Some(Contact {
            normal,
            penetration: gap * normal.y,
        }))
    }
}
