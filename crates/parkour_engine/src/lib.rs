//! # Parkour Engine
//!
//! Collision and movement core for a single cylinder-shaped character in a
//! static 3D world.
//!
//! ## Features
//!
//! - **Primitives**: AABB, cylinder, inclined slope and convex mesh tests
//! - **GJK**: boolean narrow phase between convex point sets
//! - **Chunk Grid**: bounded spatial index with transactional membership updates
//! - **Resolver**: iterative push-out with floor/slope/wall/ceiling classification
//! - **Stepover**: downward ray probe that glues a standing controller to terrain
//! - **State Machine**: seven movement states driven by an exhaustive transition table
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parkour_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let mut world = World::new(config.world.clone());
//!     world.spawn(EntityDesc::boxed(BoundingBox::new(
//!         Vec3::new(-10.0, -1.0, -10.0),
//!         Vec3::new(10.0, 0.0, 10.0),
//!     )))?;
//!
//!     let mut sim = Simulation::new(world, config, Vec3::zeros())?;
//!     let clock = FixedTimestep::from_hz(60.0);
//!     let input = PlayerInput::new(Vec3::new(0.0, 0.0, 1.0), ActionFlags::empty());
//!     let report = sim.tick(&input, &clock, &mut NullDebugDraw)?;
//!     println!("{:?}", report.current);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;
pub mod foundation;

pub mod assets;
pub mod debug;
pub mod physics;
pub mod player;
pub mod spatial;
pub mod world;

mod simulation;

pub use simulation::{Simulation, SimulationError, TickReport};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{MeshCache, MeshSource},
        config::Config,
        core::config::{ControllerConfig, EngineConfig, WorldConfig},
        debug::{DebugDraw, DebugDrawSystem, NullDebugDraw},
        foundation::{
            math::{Vec3, UP},
            time::{FixedTimestep, FrameClock},
        },
        physics::collision::{BoundingBox, ConvexMesh, Cylinder, Slope},
        player::{ActionFlags, MovementState, PlayerInput},
        world::{EntityDesc, EntityKey, World},
        Simulation, SimulationError, TickReport,
    };
}
