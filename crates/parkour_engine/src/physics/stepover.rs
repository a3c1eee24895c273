//! Stepover ray probe
//!
//! A single downward ray keeps a standing controller glued to terrain
//! across small steps up and down.

use crate::core::config::ControllerConfig;
use crate::debug::{colors, DebugDraw};
use crate::foundation::math::{Vec3, UP};
use crate::physics::collision::Ray;
use crate::simulation::SimulationError;
use crate::world::{EntityKey, RayHit, World};

/// What the probe found under the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// Ground within the step tolerances
    Floor(RayHit),
    /// Nothing to stand on; the controller should start falling
    NoFloor,
}

/// Cast the stepover ray for a controller whose feet are at `feet`
///
/// The ray starts `step_up` above the last terrain contact height, straight
/// above the feet, and reaches `step_down` below that contact. A hit counts
/// as floor only if it lies within `[-step_down, step_up]` of the feet.
pub fn probe(
    world: &World,
    controller: EntityKey,
    feet: Vec3,
    contact_height: f32,
    config: &ControllerConfig,
    debug: &mut dyn DebugDraw,
) -> Result<ProbeOutcome, SimulationError> {
    let start = Vec3::new(feet.x, contact_height + config.step_up, feet.z);
    let reach = config.step_up + config.step_down;
    let ray = Ray::new(start, -UP);

    let hit = world.raycast(&ray, reach, Some(controller))?;
    let outcome = match hit {
        Some(hit) if (-config.step_down..=config.step_up).contains(&(hit.point.y - feet.y)) => {
            debug.draw_line(start, hit.point, colors::PROBE_HIT, 0.0);
            ProbeOutcome::Floor(hit)
        }
        _ => {
            debug.draw_line(start, ray.point_at(reach), colors::PROBE_MISS, 0.0);
            ProbeOutcome::NoFloor
        }
    };

    log::trace!("Stepover probe from {:?}: {:?}", start, outcome);
    Ok(outcome)
}
