//! Controller state carried between ticks

use crate::foundation::math::{Vec3, UP};
use crate::player::events::VaultPath;
use crate::world::EntityKey;

/// Discrete movement states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementState {
    /// On walkable ground, glued by the stepover probe
    Standing,
    /// Rising after a jump
    Jumping,
    /// Airborne and under player air control
    Falling,
    /// Sliding down a steep slidable surface
    Sliding,
    /// Airborne after leaving a slide, keeping its momentum
    SlideFalling,
    /// Hanging from a ledge
    Grabbing,
    /// Scripted climb onto a ledge or obstacle
    Vaulting,
}

impl MovementState {
    /// Every state, in declaration order
    pub const ALL: [MovementState; 7] = [
        Self::Standing,
        Self::Jumping,
        Self::Falling,
        Self::Sliding,
        Self::SlideFalling,
        Self::Grabbing,
        Self::Vaulting,
    ];

    /// States integrated with gravity and air physics
    pub fn is_airborne(self) -> bool {
        matches!(self, Self::Jumping | Self::Falling | Self::SlideFalling)
    }
}

/// Slope the controller is sliding on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideData {
    /// Slope entity
    pub entity: EntityKey,
    /// Surface normal
    pub normal: Vec3,
}

impl SlideData {
    /// Unit tangent pointing straight downhill
    pub fn downhill(&self) -> Vec3 {
        let tangent = -UP + self.normal * self.normal.y;
        if tangent.norm_squared() <= f32::EPSILON {
            Vec3::zeros()
        } else {
            tangent.normalize()
        }
    }

    /// Sine of the surface inclination
    pub fn sin_inclination(&self) -> f32 {
        (1.0 - self.normal.y * self.normal.y).max(0.0).sqrt()
    }
}

/// Ledge the controller is hanging from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabData {
    /// Entity owning the ledge
    pub entity: EntityKey,
    /// World height of the ledge top
    pub ledge_height: f32,
    /// Wall normal, pointing away from the ledge
    pub wall_normal: Vec3,
}

/// Everything the state machine knows about the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Feet position
    pub position: Vec3,
    /// Velocity in units per second
    pub velocity: Vec3,
    /// Unit world-space movement intent from the last tick
    pub intent: Vec3,
    /// Current movement state
    pub state: MovementState,
    /// Camera yaw, radians; 0 faces +Z
    pub yaw: f32,
    /// Normal of the last terrain contact
    pub terrain_normal: Vec3,
    /// Point where the controller last touched terrain
    pub last_contact: Vec3,
    /// Entity under the feet while standing
    pub standing_on: Option<EntityKey>,
    /// Set while sliding
    pub slide: Option<SlideData>,
    /// Set while grabbing
    pub grab: Option<GrabData>,
    /// Set while vaulting
    pub vault: Option<VaultPath>,
    spawn: Vec3,
    spawn_yaw: f32,
}

impl PlayerState {
    /// Standing player at `spawn` facing `yaw`
    pub fn new(spawn: Vec3, yaw: f32) -> Self {
        Self {
            position: spawn,
            velocity: Vec3::zeros(),
            intent: Vec3::zeros(),
            state: MovementState::Standing,
            yaw,
            terrain_normal: UP,
            last_contact: spawn,
            standing_on: None,
            slide: None,
            grab: None,
            vault: None,
            spawn,
            spawn_yaw: yaw,
        }
    }

    /// Spawn point used by [`PlayerState::reset`]
    pub fn spawn(&self) -> Vec3 {
        self.spawn
    }

    /// Moves the spawn point
    pub fn set_spawn(&mut self, spawn: Vec3, yaw: f32) {
        self.spawn = spawn;
        self.spawn_yaw = yaw;
    }

    /// Back to the spawn point, standing still
    pub fn reset(&mut self) {
        *self = Self::new(self.spawn, self.spawn_yaw);
    }

    /// Horizontal speed
    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).norm()
    }
}
