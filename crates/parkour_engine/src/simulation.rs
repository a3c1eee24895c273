//! # Simulation
//!
//! Explicit context for one controller in one world. Nothing is global: the
//! frame loop owns a [`Simulation`] and calls [`Simulation::tick`] once per
//! frame with the decoded input, a clock and a debug sink.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::config::EngineConfig;
use crate::debug::DebugDraw;
use crate::foundation::math::{utils, Vec3};
use crate::foundation::time::FrameClock;
use crate::physics::collision::Cylinder;
use crate::physics::{CollisionBuffer, CollisionResult, Resolver};
use crate::player::controller::{enter_state, tick_state, MovementContext, StepOutcome};
use crate::player::{transition, EventKind, MovementEvent, MovementState, PlayerInput, PlayerState};
use crate::spatial::SpatialError;
use crate::world::{EntityDesc, EntityKey, MalformedEntity, World};

/// Fatal simulation errors
///
/// None of these are retried; the tick that returns one must not be
/// continued with the same world.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Malformed collision geometry
    #[error("Geometry error: {0}")]
    Geometry(#[from] MalformedEntity),

    /// Spatial index rejected an update
    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),

    /// The transition table has no entry for this pair
    #[error("Undefined transition from {state:?} on {event:?}")]
    UndefinedTransition {
        /// State the player was in
        state: MovementState,
        /// Event that had no edge
        event: EventKind,
    },

    /// The controller entity is gone from the world
    #[error("Controller entity {0:?} is missing from the world")]
    MissingController(EntityKey),

    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// What one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// State before the tick
    pub previous: MovementState,
    /// State after the tick
    pub current: MovementState,
    /// Event fed to the transition table, if any
    pub event: Option<MovementEvent>,
    /// Contacts resolved during the tick
    pub contacts: Vec<CollisionResult>,
    /// The player fell below the kill height and was respawned
    pub respawned: bool,
}

impl TickReport {
    /// Whether the movement state changed
    pub fn transitioned(&self) -> bool {
        self.previous != self.current
    }
}

/// World, player and the collision machinery that connects them
pub struct Simulation {
    world: World,
    player: PlayerState,
    controller: EntityKey,
    buffer: CollisionBuffer,
    resolver: Resolver,
    config: EngineConfig,
}

impl Simulation {
    /// Spawns the controller at `spawn` and validates `config`
    pub fn new(mut world: World, config: EngineConfig, spawn: Vec3) -> Result<Self, SimulationError> {
        config.validate()?;

        let c = &config.controller;
        let controller = world.spawn(EntityDesc::controller(Cylinder::new(spawn, c.radius, c.height)))?;
        log::info!(
            "Simulation started: {} entities, controller {:?} at {:?}",
            world.len(),
            controller,
            spawn
        );

        Ok(Self {
            world,
            player: PlayerState::new(spawn, 0.0),
            controller,
            buffer: CollisionBuffer::new(),
            resolver: Resolver::default(),
            config,
        })
    }

    /// Read-only world access
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for level edits between ticks
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Player state
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Mutable player state, e.g. to aim the camera before the first tick
    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    /// Controller entity key
    pub fn controller(&self) -> EntityKey {
        self.controller
    }

    /// Candidate buffer, for diagnostics
    pub fn buffer(&self) -> &CollisionBuffer {
        &self.buffer
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Advances the simulation by one tick of `clock.tick_seconds()`
    pub fn tick(
        &mut self,
        input: &PlayerInput,
        clock: &impl FrameClock,
        debug: &mut dyn DebugDraw,
    ) -> Result<TickReport, SimulationError> {
        if self.world.get(self.controller).is_none() {
            log::error!("Controller {:?} is missing from the world", self.controller);
            return Err(SimulationError::MissingController(self.controller));
        }

        let dt = clock.tick_seconds();
        let kill_height = self.world.config().kill_height;
        let previous = self.player.state;
        if previous != MovementState::Vaulting {
            self.player.yaw = utils::wrap_angle(self.player.yaw + input.yaw_delta);
        }

        let mut ctx = MovementContext {
            world: &mut self.world,
            buffer: &mut self.buffer,
            resolver: &self.resolver,
            controller: self.controller,
            config: &self.config.controller,
            debug,
        };

        let outcome = match tick_state(&mut self.player, input, &mut ctx, dt) {
            Ok(outcome) => outcome,
            // Dropped out of the bottom of the grid before the kill plane check
            Err(SimulationError::Spatial(SpatialError::OutOfBounds { .. }))
                if self.player.position.y < kill_height =>
            {
                log::debug!("Controller left the grid below the kill height");
                StepOutcome::default()
            }
            Err(err) => return Err(err),
        };
        let mut current = previous;
        if let Some(event) = outcome.event {
            current = transition(previous, event.kind()).map_err(|err| {
                log::error!("Undefined transition from {:?} on {:?}", previous, event);
                err
            })?;
            if current != previous {
                enter_state(&mut self.player, current, &event, input, &mut ctx)?;
                log::debug!("{:?} -> {:?} on {:?}", previous, current, event.kind());
            }
            self.player.state = current;
        }

        let mut respawned = false;
        if self.player.position.y < kill_height {
            log::warn!(
                "Controller fell below the kill height at {:?}, respawning",
                self.player.position
            );
            self.respawn()?;
            respawned = true;
            current = self.player.state;
        }

        Ok(TickReport {
            previous,
            current,
            event: outcome.event,
            contacts: outcome.contacts,
            respawned,
        })
    }

    /// Resets the player to its spawn point, standing
    pub fn respawn(&mut self) -> Result<(), SimulationError> {
        self.player.reset();
        self.world.place_controller(self.controller, self.player.position)?;
        self.buffer.invalidate();
        log::info!("Controller respawned at {:?}", self.player.position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{colors, DebugDrawSystem, NullDebugDraw};
    use crate::foundation::time::FixedTimestep;
    use crate::physics::collision::{BoundingBox, Slope};
    use crate::player::ActionFlags;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn clock() -> FixedTimestep {
        FixedTimestep::from_hz(60.0)
    }

    fn floor() -> EntityDesc {
        EntityDesc::boxed(BoundingBox::new(Vec3::new(-4.0, -1.0, -4.0), Vec3::new(4.0, 0.0, 4.0))).named("floor")
    }

    fn sim_at(spawn: Vec3) -> Simulation {
        let config = EngineConfig::default();
        let mut world = World::new(config.world.clone());
        world.spawn(floor()).unwrap();
        Simulation::new(world, config, spawn).unwrap()
    }

    /// Facing +X
    fn face_east(sim: &mut Simulation) {
        sim.player_mut().yaw = FRAC_PI_2;
    }

    fn forward(actions: ActionFlags) -> PlayerInput {
        PlayerInput::new(Vec3::new(0.0, 0.0, 1.0), actions)
    }

    fn run(sim: &mut Simulation, input: PlayerInput, ticks: usize) -> Vec<TickReport> {
        let clock = clock();
        (0..ticks)
            .map(|_| sim.tick(&input, &clock, &mut NullDebugDraw).unwrap())
            .collect()
    }

    #[test]
    fn test_idle_player_stays_on_floor() {
        let mut sim = sim_at(Vec3::zeros());
        let reports = run(&mut sim, PlayerInput::idle(), 10);
        assert!(reports.iter().all(|r| r.current == MovementState::Standing));
        assert_relative_eq!(sim.player().position.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_step_up_snaps_to_higher_floor() {
        let mut sim = sim_at(Vec3::zeros());
        run(&mut sim, PlayerInput::idle(), 1);

        let step = BoundingBox::new(Vec3::new(-2.0, -1.0, -2.0), Vec3::new(2.0, 0.05, 2.0));
        sim.world_mut().spawn(EntityDesc::boxed(step).named("step")).unwrap();

        let report = run(&mut sim, PlayerInput::idle(), 1).remove(0);
        assert_eq!(report.current, MovementState::Standing);
        assert_relative_eq!(sim.player().position.y, 0.05, epsilon = 1e-5);
    }

    #[test]
    fn test_walking_off_an_edge_starts_falling() {
        let mut sim = sim_at(Vec3::new(3.9, 0.0, 0.0));
        face_east(&mut sim);

        let clock = clock();
        let input = forward(ActionFlags::empty());
        let mut fell = false;
        for _ in 0..10 {
            let report = sim.tick(&input, &clock, &mut NullDebugDraw).unwrap();
            if report.current == MovementState::Falling {
                assert_eq!(report.event, Some(MovementEvent::FloorLost));
                assert_controller_synced(&sim);
                fell = true;
                break;
            }
        }
        assert!(fell);

        let report = sim.tick(&input, &clock, &mut NullDebugDraw).unwrap();
        assert_eq!(report.current, MovementState::Falling);
        assert!(sim.player().velocity.y < 0.0);
    }

    #[test]
    fn test_falling_player_lands() {
        let mut sim = sim_at(Vec3::new(0.0, 2.0, 0.0));
        let reports = run(&mut sim, PlayerInput::idle(), 120);

        assert_eq!(reports[0].current, MovementState::Falling);
        let landing = reports
            .iter()
            .find(|r| r.previous == MovementState::Falling && r.current == MovementState::Standing)
            .expect("player never landed");
        assert!(matches!(landing.event, Some(MovementEvent::FloorContact { .. })));
        assert_eq!(sim.player().state, MovementState::Standing);
        assert_relative_eq!(sim.player().position.y, 0.0, epsilon = 1e-3);
        assert_relative_eq!(sim.player().velocity.y, 0.0);
    }

    #[test]
    fn test_jump_rises_then_falls_then_lands() {
        let mut sim = sim_at(Vec3::zeros());
        let config = sim.config().controller.clone();

        let report = run(&mut sim, PlayerInput::new(Vec3::zeros(), ActionFlags::JUMP), 1).remove(0);
        assert_eq!(report.current, MovementState::Jumping);
        assert_relative_eq!(sim.player().velocity.y, config.jump_speed);
        // No movement intent: no horizontal thrust
        assert_relative_eq!(sim.player().horizontal_speed(), 0.0);

        let reports = run(&mut sim, PlayerInput::idle(), 120);
        let states: Vec<_> = reports.iter().filter(|r| r.transitioned()).map(|r| r.current).collect();
        assert_eq!(states, vec![MovementState::Falling, MovementState::Standing]);
        assert_relative_eq!(sim.player().position.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_running_jump_gets_minimum_thrust() {
        let mut sim = sim_at(Vec3::zeros());
        face_east(&mut sim);
        let config = sim.config().controller.clone();

        run(&mut sim, forward(ActionFlags::JUMP | ActionFlags::WALK), 1);
        assert_eq!(sim.player().state, MovementState::Jumping);
        assert_relative_eq!(sim.player().velocity.x, config.walk_jump_thrust, epsilon = 1e-5);
    }

    fn ramp(height: f32) -> EntityDesc {
        let bounds = BoundingBox::new(Vec3::new(1.0, 0.0, -2.0), Vec3::new(3.0, height, 2.0));
        EntityDesc::slope(Slope::new(bounds, Vec3::x())).slidable().named("ramp")
    }

    /// On a ledge at the top of a steep ramp, facing down it
    fn ramp_top_sim() -> Simulation {
        let mut sim = sim_at(Vec3::new(3.5, 2.0, 0.0));
        sim.world_mut().spawn(ramp(2.0)).unwrap();
        let top = BoundingBox::new(Vec3::new(3.0, 0.0, -2.0), Vec3::new(4.0, 2.0, 2.0));
        sim.world_mut().spawn(EntityDesc::boxed(top).named("ramp top")).unwrap();
        sim.player_mut().yaw = -FRAC_PI_2;
        sim
    }

    /// Walks forward until the player starts sliding
    fn walk_onto_slope(sim: &mut Simulation) -> TickReport {
        let clock = clock();
        let input = forward(ActionFlags::empty());
        for _ in 0..30 {
            let report = sim.tick(&input, &clock, &mut NullDebugDraw).unwrap();
            if report.current == MovementState::Sliding {
                return report;
            }
        }
        panic!("never started sliding");
    }

    fn assert_controller_synced(sim: &Simulation) {
        let bounds = sim.world().get(sim.controller()).unwrap().bounds();
        assert_relative_eq!(bounds.min.x + sim.config().controller.radius, sim.player().position.x, epsilon = 1e-5);
        assert_relative_eq!(bounds.min.y, sim.player().position.y, epsilon = 1e-5);
    }

    #[test]
    fn test_steep_slidable_slope_starts_sliding() {
        let mut sim = ramp_top_sim();
        let slide = walk_onto_slope(&mut sim);
        assert_eq!(slide.previous, MovementState::Standing);
        assert!(matches!(slide.event, Some(MovementEvent::SlopeContact { .. })));
        assert!(sim.player().position.x <= 3.0);
        assert_controller_synced(&sim);
    }

    #[test]
    fn test_pushing_into_slope_foot_does_not_flicker() {
        let mut sim = sim_at(Vec3::zeros());
        sim.world_mut().spawn(ramp(2.0)).unwrap();
        face_east(&mut sim);

        let reports = run(&mut sim, forward(ActionFlags::DASH), 120);
        assert!(reports.iter().all(|r| r.current == MovementState::Standing));
        assert!(reports
            .iter()
            .any(|r| matches!(r.event, Some(MovementEvent::WallContact { .. }))));
        // The toe holds the axis off the incline
        assert!(sim.player().position.x < 1.0);

        // Jumping at the foot is not a slope landing
        let report = run(&mut sim, forward(ActionFlags::DASH | ActionFlags::JUMP), 1).remove(0);
        assert_eq!(report.current, MovementState::Jumping);
        let reports = run(&mut sim, PlayerInput::idle(), 120);
        assert!(reports.iter().all(|r| r.current != MovementState::Sliding));
        assert_eq!(sim.player().state, MovementState::Standing);
    }

    #[test]
    fn test_gentle_slidable_slope_is_walkable() {
        let mut sim = sim_at(Vec3::zeros());
        sim.world_mut().spawn(ramp(0.2)).unwrap();
        face_east(&mut sim);

        let reports = run(&mut sim, forward(ActionFlags::empty()), 30);
        assert!(reports.iter().all(|r| r.current == MovementState::Standing));
        // Walked up onto the ramp
        assert!(sim.player().position.x > 2.0);
        assert!(sim.player().position.y > 0.1);
    }

    #[test]
    fn test_slide_carries_player_down_to_floor() {
        let mut sim = ramp_top_sim();
        walk_onto_slope(&mut sim);

        // Letting go, the player ends up standing below the ramp
        let reports = run(&mut sim, PlayerInput::idle(), 120);
        let landed = reports
            .iter()
            .position(|r| r.previous == MovementState::Sliding && r.current == MovementState::Standing)
            .expect("never reached the floor");
        assert!(reports[landed..].iter().all(|r| r.current == MovementState::Standing));
        assert_eq!(sim.player().state, MovementState::Standing);
        assert!(sim.player().position.x < 1.0);
        assert_relative_eq!(sim.player().position.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_low_wall_is_vaulted() {
        let mut sim = sim_at(Vec3::zeros());
        let wall = BoundingBox::new(Vec3::new(1.0, 0.0, -2.0), Vec3::new(1.5, 1.0, 2.0));
        sim.world_mut().spawn(EntityDesc::boxed(wall).named("crate")).unwrap();
        face_east(&mut sim);

        let clock = clock();
        let push = forward(ActionFlags::GRAB);
        let mut vaulting = false;
        for _ in 0..30 {
            if sim.tick(&push, &clock, &mut NullDebugDraw).unwrap().current == MovementState::Vaulting {
                vaulting = true;
                break;
            }
        }
        assert!(vaulting);

        let reports = run(&mut sim, PlayerInput::idle(), 120);
        assert!(reports
            .iter()
            .any(|r| r.previous == MovementState::Vaulting && r.current == MovementState::Standing));
        assert_eq!(sim.player().state, MovementState::Standing);
        assert_relative_eq!(sim.player().position.y, 1.0, epsilon = 1e-3);
        assert!((1.0..=1.5).contains(&sim.player().position.x));
    }

    fn hanging_sim() -> Simulation {
        // Feet 1.0 up, the disk overlapping a ledge whose top is in grab reach
        let mut sim = sim_at(Vec3::new(0.7, 1.0, 0.0));
        let ledge = BoundingBox::new(Vec3::new(1.0, 0.0, -2.0), Vec3::new(1.5, 2.5, 2.0));
        sim.world_mut().spawn(EntityDesc::boxed(ledge).named("ledge")).unwrap();
        let hold = PlayerInput::new(Vec3::zeros(), ActionFlags::GRAB);
        run(&mut sim, hold, 5);
        sim
    }

    #[test]
    fn test_falling_player_grabs_ledge_and_climbs() {
        let mut sim = hanging_sim();
        assert_eq!(sim.player().state, MovementState::Grabbing);
        let grab = sim.player().grab.expect("no grab data");
        assert_relative_eq!(grab.ledge_height, 2.5);

        let hang = sim.player().position;
        run(&mut sim, PlayerInput::new(Vec3::zeros(), ActionFlags::GRAB), 10);
        assert_eq!(sim.player().state, MovementState::Grabbing);
        assert_eq!(sim.player().position, hang);

        let report = run(&mut sim, PlayerInput::new(Vec3::zeros(), ActionFlags::GRAB | ActionFlags::JUMP), 1).remove(0);
        assert_eq!(report.current, MovementState::Vaulting);

        run(&mut sim, PlayerInput::idle(), 120);
        assert_eq!(sim.player().state, MovementState::Standing);
        assert_relative_eq!(sim.player().position.y, 2.5, epsilon = 1e-3);
        assert_relative_eq!(sim.player().yaw, FRAC_PI_2, epsilon = 1e-2);
    }

    #[test]
    fn test_releasing_ledge_drops_to_floor() {
        let mut sim = hanging_sim();
        assert_eq!(sim.player().state, MovementState::Grabbing);

        let report = run(&mut sim, PlayerInput::idle(), 1).remove(0);
        assert_eq!(report.current, MovementState::Falling);
        assert!(sim.player().grab.is_none());

        run(&mut sim, PlayerInput::idle(), 120);
        assert_eq!(sim.player().state, MovementState::Standing);
        assert_relative_eq!(sim.player().position.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_walking_into_tall_wall_reports_wall_contact() {
        let mut sim = sim_at(Vec3::zeros());
        let wall = BoundingBox::new(Vec3::new(1.0, 0.0, -2.0), Vec3::new(1.5, 3.0, 2.0));
        sim.world_mut().spawn(EntityDesc::boxed(wall).named("wall")).unwrap();
        face_east(&mut sim);

        let reports = run(&mut sim, forward(ActionFlags::GRAB), 30);
        assert!(reports.iter().all(|r| r.current == MovementState::Standing));
        assert!(reports
            .iter()
            .any(|r| matches!(r.event, Some(MovementEvent::WallContact { .. }))));
        assert!(sim.player().position.x <= 1.0 - sim.config().controller.radius + 1e-3);
    }

    #[test]
    fn test_kill_plane_respawns() {
        let config = EngineConfig::default();
        let world = World::new(config.world.clone());
        let spawn = Vec3::new(0.0, 1.0, 0.0);
        let mut sim = Simulation::new(world, config, spawn).unwrap();

        let reports = run(&mut sim, PlayerInput::idle(), 600);
        let respawn = reports.iter().find(|r| r.respawned).expect("never respawned");
        assert_eq!(respawn.current, MovementState::Standing);
        assert_eq!(sim.player().spawn(), spawn);
    }

    #[test]
    fn test_kill_plane_just_above_grid_floor_respawns() {
        let mut config = EngineConfig::default();
        config.world.kill_height = config.world.origin.y + 0.1;
        let world = World::new(config.world.clone());
        let spawn = Vec3::new(0.0, 1.0, 0.0);
        let mut sim = Simulation::new(world, config, spawn).unwrap();

        let reports = run(&mut sim, PlayerInput::idle(), 600);
        assert!(reports.iter().any(|r| r.respawned));
        assert!(sim.player().position.y > sim.world().config().kill_height);
    }

    #[test]
    fn test_missing_controller_is_fatal() {
        let mut sim = sim_at(Vec3::zeros());
        let controller = sim.controller();
        sim.world_mut().despawn(controller);

        let err = sim
            .tick(&PlayerInput::idle(), &clock(), &mut NullDebugDraw)
            .unwrap_err();
        assert!(matches!(err, SimulationError::MissingController(key) if key == controller));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.controller.radius = -1.0;
        let world = World::new(config.world.clone());
        let err = Simulation::new(world, config, Vec3::zeros()).err().unwrap();
        assert!(matches!(err, SimulationError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_probe_is_visualised() {
        let mut sim = sim_at(Vec3::zeros());
        let mut debug = DebugDrawSystem::new();
        sim.tick(&PlayerInput::idle(), &clock(), &mut debug).unwrap();
        assert_eq!(debug.lines_with_color(colors::PROBE_HIT), 1);
    }
}
