//! Headless parkour demo
//!
//! Builds a small course and drives the controller through it with a
//! scripted input sequence, logging every state transition. Pass a `.toml`
//! or `.ron` engine config path as the first argument to override the
//! defaults.

use std::f32::consts::FRAC_PI_2;

use parkour_engine::foundation::logging;
use parkour_engine::prelude::*;

/// One scripted segment: hold `input` for `ticks` ticks
struct Segment {
    label: &'static str,
    ticks: usize,
    input: PlayerInput,
}

fn build_course(config: &EngineConfig, meshes: &mut MeshCache) -> Result<World, Box<dyn std::error::Error>> {
    let mut world = World::new(config.world.clone());

    world.spawn(
        EntityDesc::boxed(BoundingBox::new(Vec3::new(-20.0, -1.0, -20.0), Vec3::new(20.0, 0.0, 20.0)))
            .named("ground"),
    )?;
    world.spawn(
        EntityDesc::boxed(BoundingBox::new(Vec3::new(2.0, 0.0, -1.5), Vec3::new(4.0, 0.2, 1.5)))
            .named("kerb"),
    )?;
    world.spawn(
        EntityDesc::boxed(BoundingBox::new(Vec3::new(6.0, 0.0, -1.5), Vec3::new(6.5, 1.0, 1.5)))
            .named("low wall"),
    )?;
    world.spawn(
        EntityDesc::slope(Slope::new(
            BoundingBox::new(Vec3::new(9.0, 0.0, -2.0), Vec3::new(12.0, 3.0, 2.0)),
            Vec3::x(),
        ))
        .slidable()
        .named("scree"),
    )?;

    let crate_mesh = meshes.insert("crate", ConvexMesh::cuboid(Vec3::new(0.5, 0.5, 0.5)))?;
    world.spawn(EntityDesc::mesh(crate_mesh, Vec3::new(3.0, 0.5, 4.0)).named("crate"))?;

    log::info!("Course built with {} entities", world.len());
    Ok(world)
}

fn script() -> Vec<Segment> {
    let forward = Vec3::new(0.0, 0.0, 1.0);
    vec![
        Segment {
            label: "turn east",
            ticks: 1,
            input: PlayerInput {
                yaw_delta: FRAC_PI_2,
                ..PlayerInput::idle()
            },
        },
        Segment {
            label: "run over the kerb",
            ticks: 60,
            input: PlayerInput::new(forward, ActionFlags::empty()),
        },
        Segment {
            label: "vault the low wall",
            ticks: 90,
            input: PlayerInput::new(forward, ActionFlags::GRAB),
        },
        Segment {
            label: "settle",
            ticks: 30,
            input: PlayerInput::idle(),
        },
        Segment {
            label: "dash into the scree foot",
            ticks: 90,
            input: PlayerInput::new(forward, ActionFlags::DASH),
        },
        Segment {
            label: "jump",
            ticks: 1,
            input: PlayerInput::new(forward, ActionFlags::JUMP),
        },
        Segment {
            label: "coast",
            ticks: 120,
            input: PlayerInput::idle(),
        },
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(&path)?,
        None => EngineConfig::default(),
    };

    logging::init_with_level(&config.log_level);
    log::info!("Starting parkour demo");

    let mut meshes = MeshCache::new();
    let world = build_course(&config, &mut meshes)?;
    let mut sim = Simulation::new(world, config, Vec3::zeros())?;

    let mut clock = FixedTimestep::from_hz(60.0);
    let mut debug = DebugDrawSystem::new();
    let mut transitions = 0usize;

    for segment in script() {
        log::info!("Segment: {} ({} ticks)", segment.label, segment.ticks);
        for _ in 0..segment.ticks {
            let report = sim.tick(&segment.input, &clock, &mut debug)?;
            if report.transitioned() {
                transitions += 1;
                log::info!(
                    "[{:>5}] {:?} -> {:?} at {:.2?}",
                    clock.frame_count(),
                    report.previous,
                    report.current,
                    sim.player().position
                );
            }
            if report.respawned {
                log::warn!("Fell out of the world, respawned");
            }
            debug.update(clock.tick_seconds());
            clock.advance();
        }
    }

    let player = sim.player();
    log::info!(
        "Finished after {} ticks ({:.2}s simulated): {:?} at {:.2?}, {} transitions, {} buffer rebuilds",
        clock.frame_count(),
        clock.total_time(),
        player.state,
        player.position,
        transitions,
        sim.buffer().rebuilds()
    );
    Ok(())
}
