//! Gilbert-Johnson-Keerthi intersection test for convex vertex sets
//!
//! Builds a simplex inside the Minkowski difference A - B and reports a
//! collision once the simplex encloses the origin.
//!
//! Touching counts as intersecting. Every support point taken during the
//! search is pushed out by [`CONTACT_MARGIN`] along the search direction, so
//! the loop works on A - B grown by that margin. Sets whose surfaces meet
//! exactly, on any axis, leave the origin strictly inside the grown
//! difference and are always reported as colliding. Sets further apart than
//! the margin are always separated.
//!
//! Region tests that evaluate to exactly zero count as "not outside", and a
//! search direction that collapses to zero means the origin lies on the
//! current simplex. Both are collisions.

use crate::foundation::math::Vec3;
use super::mesh::ConvexSet;

/// Upper bound on simplex refinement steps
pub const MAX_ITERATIONS: usize = 64;

/// Gap below which two sets are treated as touching
pub const CONTACT_MARGIN: f32 = 1e-4;

const EPSILON: f32 = 1e-10;

/// Point, segment, triangle or tetrahedron in Minkowski space
///
/// The most recently added point is always at index 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            points: [Vec3::zeros(); 4],
            len: 0,
        }
    }
}

impl Simplex {
    fn push_front(&mut self, point: Vec3) {
        self.points = [point, self.points[0], self.points[1], self.points[2]];
        self.len = (self.len + 1).min(4);
    }

    fn set(&mut self, points: &[Vec3]) {
        self.len = points.len().min(4);
        self.points[..self.len].copy_from_slice(&points[..self.len]);
    }

    /// Active points, newest first
    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }

    /// Number of active points
    pub fn len(&self) -> usize {
        self.len
    }

    /// True before the first support point is added
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Outcome of a GJK query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GjkResult {
    /// Whether the two sets intersect
    pub colliding: bool,
    /// Final simplex, a seed for penetration-depth refinement
    pub simplex: Simplex,
}

impl GjkResult {
    fn separated(simplex: Simplex) -> Self {
        Self { colliding: false, simplex }
    }

    fn hit(simplex: Simplex) -> Self {
        Self { colliding: true, simplex }
    }
}

/// Minkowski support point of A - B along `direction`
///
/// Returns `None` when either set is empty.
pub fn support(a: &ConvexSet<'_>, b: &ConvexSet<'_>, direction: &Vec3) -> Option<Vec3> {
    let pa = a.furthest_point(direction)?;
    let pb = b.furthest_point(&-direction)?;
    Some(pa - pb)
}

/// Support point of A - B grown by [`CONTACT_MARGIN`]
///
/// `direction` must be non-zero.
fn grown_support(a: &ConvexSet<'_>, b: &ConvexSet<'_>, direction: &Vec3) -> Option<Vec3> {
    support(a, b, direction).map(|point| point + direction.normalize() * CONTACT_MARGIN)
}

/// Intersection test seeded with the direction between the set offsets
pub fn gjk_intersect(a: &ConvexSet<'_>, b: &ConvexSet<'_>) -> GjkResult {
    gjk_intersect_with_direction(a, b, a.offset - b.offset)
}

/// Intersection test from an explicit initial search direction
///
/// A zero initial direction falls back to +X.
pub fn gjk_intersect_with_direction(
    a: &ConvexSet<'_>,
    b: &ConvexSet<'_>,
    initial_direction: Vec3,
) -> GjkResult {
    let mut simplex = Simplex::default();
    let mut direction = if initial_direction.norm_squared() <= EPSILON {
        Vec3::x()
    } else {
        initial_direction
    };

    let Some(first) = grown_support(a, b, &direction) else {
        return GjkResult::separated(simplex);
    };
    simplex.push_front(first);
    direction = -first;

    for _ in 0..MAX_ITERATIONS {
        if direction.norm_squared() <= EPSILON {
            // Origin sits on the simplex
            return GjkResult::hit(simplex);
        }

        let Some(point) = grown_support(a, b, &direction) else {
            return GjkResult::separated(simplex);
        };
        if point.dot(&direction) <= 0.0 {
            return GjkResult::separated(simplex);
        }

        simplex.push_front(point);
        if next_simplex(&mut simplex, &mut direction) {
            return GjkResult::hit(simplex);
        }
    }

    log::trace!("GJK hit iteration cap with {} simplex points", simplex.len());
    GjkResult::separated(simplex)
}

fn same_direction(direction: &Vec3, ao: &Vec3) -> bool {
    direction.dot(ao) > 0.0
}

fn next_simplex(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    match simplex.len() {
        2 => line(simplex, direction),
        3 => triangle(simplex, direction),
        4 => tetrahedron(simplex, direction),
        _ => false,
    }
}

fn line(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let ab = b - a;
    let ao = -a;

    if same_direction(&ab, &ao) {
        *direction = ab.cross(&ao).cross(&ab);
    } else {
        simplex.set(&[a]);
        *direction = ao;
    }
    false
}

fn triangle(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let c = simplex.points[2];
    let ab = b - a;
    let ac = c - a;
    let ao = -a;
    let abc = ab.cross(&ac);

    if same_direction(&abc.cross(&ac), &ao) {
        if same_direction(&ac, &ao) {
            simplex.set(&[a, c]);
            *direction = ac.cross(&ao).cross(&ac);
        } else {
            simplex.set(&[a, b]);
            return line(simplex, direction);
        }
    } else if same_direction(&ab.cross(&abc), &ao) {
        simplex.set(&[a, b]);
        return line(simplex, direction);
    } else if same_direction(&abc, &ao) {
        *direction = abc;
    } else {
        // Keep the winding so the origin is always above `abc`
        simplex.set(&[a, c, b]);
        *direction = -abc;
    }
    false
}

fn tetrahedron(simplex: &mut Simplex, direction: &mut Vec3) -> bool {
    let a = simplex.points[0];
    let b = simplex.points[1];
    let c = simplex.points[2];
    let d = simplex.points[3];
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let ao = -a;

    let abc = ab.cross(&ac);
    let acd = ac.cross(&ad);
    let adb = ad.cross(&ab);

    if same_direction(&abc, &ao) {
        simplex.set(&[a, b, c]);
        return triangle(simplex, direction);
    }
    if same_direction(&acd, &ao) {
        simplex.set(&[a, c, d]);
        return triangle(simplex, direction);
    }
    if same_direction(&adb, &ao) {
        simplex.set(&[a, d, b]);
        return triangle(simplex, direction);
    }
    true
}
