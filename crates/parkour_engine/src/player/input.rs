//! Pre-decoded per-tick input
//!
//! Key bindings are resolved upstream; the controller only sees a movement
//! intent and a handful of action flags.

use crate::foundation::math::{utils, Vec3};

bitflags::bitflags! {
    /// Action buttons held this tick
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ActionFlags: u8 {
        /// Jump / vault
        const JUMP = 1 << 0;
        /// Dash speed modifier
        const DASH = 1 << 1;
        /// Walk speed modifier
        const WALK = 1 << 2;
        /// Ledge grab / vault intent
        const GRAB = 1 << 3;
    }
}

/// Input for one simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Movement intent relative to the camera: x strafes right, z moves forward
    pub movement: Vec3,
    /// Buttons held
    pub actions: ActionFlags,
    /// Camera yaw change requested this tick, radians
    pub yaw_delta: f32,
}

impl PlayerInput {
    /// Input moving along the camera-relative `movement` with `actions` held
    pub fn new(movement: Vec3, actions: ActionFlags) -> Self {
        Self {
            movement,
            actions,
            yaw_delta: 0.0,
        }
    }

    /// No movement and no buttons
    pub fn idle() -> Self {
        Self::default()
    }

    /// Whether `flag` is held
    pub fn held(&self, flag: ActionFlags) -> bool {
        self.actions.contains(flag)
    }

    /// Unit world-space intent for a camera facing `yaw`, or zero without intent
    pub fn world_direction(&self, yaw: f32) -> Vec3 {
        let local = utils::horizontal(self.movement);
        if local.norm_squared() <= f32::EPSILON {
            return Vec3::zeros();
        }
        let forward = utils::forward_from_yaw(yaw);
        // Right-handed, Y-up: right is forward rotated -90 degrees about Y
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        (forward * local.z + right * local.x).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flags_combine() {
        let input = PlayerInput::new(Vec3::zeros(), ActionFlags::JUMP | ActionFlags::DASH);
        assert!(input.held(ActionFlags::JUMP));
        assert!(input.held(ActionFlags::DASH));
        assert!(!input.held(ActionFlags::GRAB));
    }

    #[test]
    fn test_world_direction_follows_yaw() {
        let forward = PlayerInput::new(Vec3::new(0.0, 0.0, 1.0), ActionFlags::empty());
        assert_relative_eq!(forward.world_direction(0.0), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(
            forward.world_direction(std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 0.0, 0.0),
            epsilon = 1e-6
        );
        assert_eq!(PlayerInput::idle().world_direction(1.0), Vec3::zeros());
    }
}
