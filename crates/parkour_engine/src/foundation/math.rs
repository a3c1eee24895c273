//! Math utilities and types
//!
//! Fundamental math types for the collision core. The world is Y-up and
//! right-handed; controller positions are measured at the feet.

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type (RGBA colors for debug drawing)
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// World up axis
pub const UP: Vec3 = Vec3::new(0.0, 1.0, 0.0);

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }


    /// Wrap an angle into `(-PI, PI]`
    pub fn wrap_angle(angle: f32) -> f32 {
        let wrapped = (angle + constants::PI).rem_euclid(constants::TAU) - constants::PI;
        if wrapped <= -constants::PI {
            wrapped + constants::TAU
        } else {
            wrapped
        }
    }

    /// Rotate `current` toward `target` along the shortest arc by at most `max_step`
    pub fn approach_angle(current: f32, target: f32, max_step: f32) -> f32 {
        let delta = wrap_angle(target - current);
        if delta.abs() <= max_step {
            target
        } else {
            wrap_angle(current + max_step * delta.signum())
        }
    }

    /// Drop the vertical component of a vector
    pub fn horizontal(v: Vec3) -> Vec3 {
        Vec3::new(v.x, 0.0, v.z)
    }

    /// Yaw angle (radians around +Y) of a horizontal direction; 0 faces +Z
    pub fn yaw_of(direction: Vec3) -> f32 {
        direction.x.atan2(direction.z)
    }

    /// Unit horizontal direction for a yaw angle
    pub fn forward_from_yaw(yaw: f32) -> Vec3 {
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_angle_stays_in_range() {
        assert_relative_eq!(wrap_angle(3.0 * constants::PI), constants::PI, epsilon = 1e-5);
        assert_relative_eq!(wrap_angle(-0.5), -0.5, epsilon = 1e-6);
        assert_relative_eq!(wrap_angle(constants::TAU + 0.25), 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_approach_angle_takes_short_arc() {
        // From just below +PI to just above -PI is a short step across the seam
        let current = constants::PI - 0.1;
        let target = -constants::PI + 0.1;
        let next = approach_angle(current, target, 0.05);
        assert_relative_eq!(wrap_angle(next - current), 0.05, epsilon = 1e-5);

        assert_relative_eq!(approach_angle(0.0, 0.2, 1.0), 0.2);
    }

    #[test]
    fn test_yaw_roundtrip() {
        let dir = Vec3::new(1.0, 0.0, 1.0).normalize();
        let yaw = yaw_of(dir);
        assert_relative_eq!(forward_from_yaw(yaw), dir, epsilon = 1e-6);
        assert_relative_eq!(horizontal(Vec3::new(1.0, 5.0, 2.0)), Vec3::new(1.0, 0.0, 2.0));
    }
}
