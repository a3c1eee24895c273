//! # Unified Configuration System
//!
//! Simulation constants for the chunk grid and the character controller.
//! Both are plain serde structs so they can live in TOML or RON files next
//! to the level data; [`EngineConfig`] bundles them for the [`Config`] loader.
//!
//! Every struct has a `validate` pass. Loading never validates implicitly,
//! callers decide when a bad file is fatal.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Vec3};

pub use crate::config::{Config, ConfigError};

/// # World Configuration
///
/// Fixed layout of the chunk grid that covers the playable volume.
/// Chunks outside `dimensions` do not exist; coordinates that map outside
/// the grid are rejected rather than clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World-space position of the grid's minimum corner
    pub origin: Vec3,
    /// Side length of one cubic chunk
    pub chunk_size: f32,
    /// Number of chunks along X, Y and Z
    pub dimensions: [u32; 3],
    /// Maximum number of chunks a single entity may overlap
    pub max_chunks_per_entity: usize,
    /// Maximum number of entities registered in one chunk
    pub chunk_capacity: usize,
    /// Controller is respawned when its feet drop below this height
    pub kill_height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::new(-256.0, -64.0, -256.0),
            chunk_size: 8.0,
            dimensions: [64, 16, 64],
            max_chunks_per_entity: 64,
            chunk_capacity: 256,
            kill_height: -56.0,
        }
    }
}

impl WorldConfig {
    /// World-space position of the grid's maximum corner
    pub fn max_corner(&self) -> Vec3 {
        self.origin
            + Vec3::new(
                self.dimensions[0] as f32,
                self.dimensions[1] as f32,
                self.dimensions[2] as f32,
            ) * self.chunk_size
    }

    /// Total number of chunks in the grid
    pub fn chunk_count(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.chunk_size > 0.0) || !self.chunk_size.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.dimensions.iter().any(|&d| d == 0) {
            return Err(ConfigError::Invalid(format!(
                "grid dimensions must be non-zero, got {:?}",
                self.dimensions
            )));
        }
        if self.dimensions.iter().any(|&d| d > i32::MAX as u32) {
            return Err(ConfigError::Invalid("grid dimensions overflow i32".to_string()));
        }
        if self.max_chunks_per_entity == 0 {
            return Err(ConfigError::Invalid("max_chunks_per_entity must be at least 1".to_string()));
        }
        if self.chunk_capacity == 0 {
            return Err(ConfigError::Invalid("chunk_capacity must be at least 1".to_string()));
        }
        if self.kill_height < self.origin.y || self.kill_height >= self.max_corner().y {
            return Err(ConfigError::Invalid(format!(
                "kill_height {} must lie inside the grid's vertical extent",
                self.kill_height
            )));
        }
        Ok(())
    }
}

/// # Controller Configuration
///
/// Tuning for the cylinder-shaped player controller. Distances are in world
/// units, speeds in units per second, angles in degrees unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Cylinder radius
    pub radius: f32,
    /// Cylinder height, measured up from the feet
    pub height: f32,

    /// Ground speed with the walk modifier held
    pub walk_speed: f32,
    /// Default ground speed
    pub run_speed: f32,
    /// Ground speed with the dash modifier held
    pub dash_speed: f32,

    /// Initial upward velocity of a jump
    pub jump_speed: f32,
    /// Minimum horizontal jump thrust while walking
    pub walk_jump_thrust: f32,
    /// Minimum horizontal jump thrust while running
    pub run_jump_thrust: f32,
    /// Minimum horizontal jump thrust while dashing
    pub dash_jump_thrust: f32,

    /// Downward acceleration in airborne and sliding states
    pub gravity: f32,
    /// Maximum falling speed
    pub terminal_velocity: f32,
    /// Horizontal acceleration available while airborne
    pub air_control: f32,

    /// Highest step the stepover probe snaps up onto
    pub step_up: f32,
    /// Deepest drop the stepover probe snaps down onto
    pub step_down: f32,
    /// Probe/resolve iterations per standing tick
    pub stepover_iterations: usize,

    /// Slidable surfaces steeper than this slide
    pub slide_angle: f32,
    /// Minimum `dot(normal, up)` for a slidable surface to count as a slope (`slope_min_angle`)
    pub slope_min_dot: f32,
    /// Speed cap along a slope
    pub max_slide_speed: f32,

    /// How far above the head a ledge can still be grabbed
    pub grab_reach: f32,
    /// Tallest obstacle that can be vaulted from standing
    pub vault_max_height: f32,
    /// Speed of the scripted vault motion
    pub vault_speed: f32,
    /// Camera turn rate during a vault, radians per second
    pub vault_turn_speed: f32,
    /// Vault completes once the position is this close to the target
    pub vault_position_tolerance: f32,
    /// Vault completes once the camera yaw is this close to the target, radians
    pub vault_angle_tolerance: f32,

    /// Upper bound on resolver passes per resolve call
    pub max_resolve_passes: usize,
    /// Extra distance added to every push-out
    pub contact_skin: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            radius: 0.35,
            height: 1.8,

            walk_speed: 2.0,
            run_speed: 5.0,
            dash_speed: 8.0,

            jump_speed: 5.5,
            walk_jump_thrust: 1.5,
            run_jump_thrust: 4.0,
            dash_jump_thrust: 7.0,

            gravity: 15.0,
            terminal_velocity: 40.0,
            air_control: 4.0,

            step_up: 0.3,
            step_down: 0.3,
            stepover_iterations: 2,

            slide_angle: 30.0,
            slope_min_dot: 0.2,
            max_slide_speed: 12.0,

            grab_reach: 0.4,
            vault_max_height: 1.2,
            vault_speed: 4.0,
            vault_turn_speed: 8.0,
            vault_position_tolerance: 0.02,
            vault_angle_tolerance: 0.01,

            max_resolve_passes: 32,
            contact_skin: 1e-4,
        }
    }
}

impl ControllerConfig {
    /// Slide threshold in radians
    pub fn slide_angle_rad(&self) -> f32 {
        utils::deg_to_rad(self.slide_angle)
    }

    /// Ground speed for the given modifiers; dash wins over walk
    pub fn ground_speed(&self, dash: bool, walk: bool) -> f32 {
        if dash {
            self.dash_speed
        } else if walk {
            self.walk_speed
        } else {
            self.run_speed
        }
    }

    /// Minimum horizontal jump thrust for the given modifiers
    pub fn jump_thrust(&self, dash: bool, walk: bool) -> f32 {
        if dash {
            self.dash_jump_thrust
        } else if walk {
            self.walk_jump_thrust
        } else {
            self.run_jump_thrust
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("radius", self.radius),
            ("height", self.height),
            ("gravity", self.gravity),
            ("terminal_velocity", self.terminal_velocity),
            ("vault_speed", self.vault_speed),
            ("vault_turn_speed", self.vault_turn_speed),
            ("max_slide_speed", self.max_slide_speed),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }

        let non_negative = [
            ("walk_speed", self.walk_speed),
            ("run_speed", self.run_speed),
            ("dash_speed", self.dash_speed),
            ("jump_speed", self.jump_speed),
            ("air_control", self.air_control),
            ("step_up", self.step_up),
            ("step_down", self.step_down),
            ("grab_reach", self.grab_reach),
            ("vault_max_height", self.vault_max_height),
            ("vault_position_tolerance", self.vault_position_tolerance),
            ("vault_angle_tolerance", self.vault_angle_tolerance),
            ("contact_skin", self.contact_skin),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must not be negative, got {value}")));
            }
        }

        if self.step_up >= self.height {
            return Err(ConfigError::Invalid("step_up must be lower than the controller height".to_string()));
        }
        if !(0.0..90.0).contains(&self.slide_angle) {
            return Err(ConfigError::Invalid(format!(
                "slide_angle must be in [0, 90) degrees, got {}",
                self.slide_angle
            )));
        }
        if !(0.0..=1.0).contains(&self.slope_min_dot) {
            return Err(ConfigError::Invalid(format!(
                "slope_min_dot must be in [0, 1], got {}",
                self.slope_min_dot
            )));
        }
        if self.stepover_iterations == 0 || self.max_resolve_passes == 0 {
            return Err(ConfigError::Invalid("iteration caps must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// # Engine Configuration
///
/// Everything the simulation needs at start-up, loadable from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Chunk grid layout
    pub world: WorldConfig,
    /// Controller tuning
    pub controller: ControllerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            world: WorldConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.controller.validate()?;

        let cell = self.world.chunk_size;
        if self.controller.height > cell * self.world.max_chunks_per_entity as f32 {
            return Err(ConfigError::Invalid(
                "controller is taller than max_chunks_per_entity chunks".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config for EngineConfig {}
