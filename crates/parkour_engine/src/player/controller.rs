//! # Per-state movement
//!
//! Each movement state has a tick function that integrates the player,
//! runs the stepover probe and the resolver as that state requires, and
//! reports at most one [`MovementEvent`]. When several things happen in one
//! tick the event is chosen by priority: floor, slope, ledge, ceiling, wall,
//! then apex.
//!
//! Entry actions run once when the transition table moves the player into
//! a different state.

use crate::core::config::ControllerConfig;
use crate::debug::DebugDraw;
use crate::foundation::math::{utils, Vec3, UP};
use crate::physics::collision::{BoundingBox, Cylinder};
use crate::physics::{
    classify, probe, CollisionBuffer, CollisionResult, ContactKind, ProbeOutcome, Resolution,
    ResolveMode, Resolver,
};
use crate::player::events::{MovementEvent, VaultPath};
use crate::player::input::{ActionFlags, PlayerInput};
use crate::player::state::{GrabData, MovementState, PlayerState, SlideData};
use crate::simulation::SimulationError;
use crate::world::{Entity, EntityKey, World};

/// Mutable context shared by the tick functions
pub struct MovementContext<'a> {
    /// Entities and spatial index
    pub world: &'a mut World,
    /// Candidate buffer reused across ticks
    pub buffer: &'a mut CollisionBuffer,
    /// Narrow-phase dispatch
    pub resolver: &'a Resolver,
    /// Controller entity
    pub controller: EntityKey,
    /// Tuning
    pub config: &'a ControllerConfig,
    /// Debug output
    pub debug: &'a mut dyn DebugDraw,
}

/// Result of one state tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Event for the transition table, if any
    pub event: Option<MovementEvent>,
    /// Contacts resolved during the tick
    pub contacts: Vec<CollisionResult>,
}

impl StepOutcome {
    fn with_event(mut self, event: MovementEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Advances the player by `dt` seconds in its current state
pub fn tick_state(
    player: &mut PlayerState,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
    dt: f32,
) -> Result<StepOutcome, SimulationError> {
    match player.state {
        MovementState::Standing => tick_standing(player, input, ctx, dt),
        MovementState::Jumping | MovementState::Falling | MovementState::SlideFalling => {
            tick_airborne(player, input, ctx, dt)
        }
        MovementState::Sliding => tick_sliding(player, input, ctx, dt),
        MovementState::Grabbing => tick_grabbing(player, input, ctx),
        MovementState::Vaulting => tick_vaulting(player, ctx, dt),
    }
}

/// Runs the entry action of `next`, triggered by `event`
pub fn enter_state(
    player: &mut PlayerState,
    next: MovementState,
    event: &MovementEvent,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
) -> Result<(), SimulationError> {
    match next {
        MovementState::Standing => {
            player.velocity = Vec3::zeros();
            player.last_contact = player.position;
            player.slide = None;
            player.grab = None;
            match *event {
                MovementEvent::FloorContact { entity, normal } => {
                    player.standing_on = Some(entity);
                    player.terrain_normal = normal;
                }
                MovementEvent::VaultFinished => {
                    player.standing_on = player.vault.map(|v| v.entity);
                    player.terrain_normal = UP;
                }
                _ => {}
            }
            player.vault = None;
        }
        MovementState::Jumping => {
            let config = ctx.config;
            let thrust = config.jump_thrust(input.held(ActionFlags::DASH), input.held(ActionFlags::WALK));
            let direction = input.world_direction(player.yaw);
            let speed = player.horizontal_speed().max(thrust);
            player.intent = direction;
            player.velocity = direction * speed;
            player.velocity.y = config.jump_speed;
            player.standing_on = None;
            player.slide = None;
        }
        MovementState::Falling => {
            player.standing_on = None;
            player.slide = None;
            if player.grab.take().is_some() {
                player.velocity = Vec3::zeros();
            }
        }
        MovementState::SlideFalling => {
            player.standing_on = None;
            player.slide = None;
        }
        MovementState::Sliding => {
            let (entity, normal) = match *event {
                MovementEvent::SlopeContact { entity, normal } => (entity, normal),
                ref other => {
                    log::error!("Entered Sliding without a slope contact ({:?})", other);
                    return Err(SimulationError::UndefinedTransition {
                        state: player.state,
                        event: other.kind(),
                    });
                }
            };
            player.slide = Some(SlideData { entity, normal });
            player.terrain_normal = normal;
            player.standing_on = None;
            player.last_contact = player.position;
            let into = player.velocity.dot(&normal);
            player.velocity -= normal * into;
        }
        MovementState::Grabbing => {
            if let MovementEvent::LedgeGrabbed { entity, ledge_height, normal } = *event {
                player.grab = Some(GrabData {
                    entity,
                    ledge_height,
                    wall_normal: normal,
                });
            }
            player.velocity = Vec3::zeros();
            player.standing_on = None;
        }
        MovementState::Vaulting => {
            let path = match *event {
                MovementEvent::VaultStarted { path } => Some(path),
                _ => player.grab.and_then(|grab| {
                    let bounds = ctx.world.get(grab.entity).map(|e| *e.bounds())?;
                    Some(vault_path(player, grab.entity, &bounds, grab.wall_normal, ctx.config))
                }),
            };
            player.vault = path;
            player.grab = None;
            player.velocity = Vec3::zeros();
            player.standing_on = None;
        }
    }
    Ok(())
}

fn tick_standing(
    player: &mut PlayerState,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
    dt: f32,
) -> Result<StepOutcome, SimulationError> {
    let mut outcome = StepOutcome::default();
    if input.held(ActionFlags::JUMP) {
        return Ok(outcome.with_event(MovementEvent::Jump));
    }

    let speed = ctx
        .config
        .ground_speed(input.held(ActionFlags::DASH), input.held(ActionFlags::WALK));
    player.intent = input.world_direction(player.yaw);
    player.velocity = player.intent * speed;
    player.position += player.velocity * dt;

    for _ in 0..ctx.config.stepover_iterations {
        // Snap before resolving so the resolver sees corrected geometry
        let contact_height = player.last_contact.y;
        match probe(ctx.world, ctx.controller, player.position, contact_height, ctx.config, ctx.debug)? {
            ProbeOutcome::NoFloor => return leave(player, ctx, outcome, MovementEvent::FloorLost),
            ProbeOutcome::Floor(hit) => {
                let slidable = ctx.world.get(hit.entity).is_some_and(Entity::is_slidable);
                if classify(&hit.normal, slidable, ctx.config) == ContactKind::Slope {
                    let event = MovementEvent::SlopeContact {
                        entity: hit.entity,
                        normal: hit.normal,
                    };
                    return leave(player, ctx, outcome, event);
                }
                player.position.y = hit.point.y;
                player.last_contact = hit.point;
                player.standing_on = Some(hit.entity);
                player.terrain_normal = hit.normal;
            }
        }

        let mode = ResolveMode::stepping(ctx.config.step_up);
        let resolution = resolve_player(player, ctx, mode, player.standing_on)?;
        outcome.contacts.extend_from_slice(&resolution.contacts);

        if let Some(slope) = resolution.slope() {
            return Ok(outcome.with_event(MovementEvent::SlopeContact {
                entity: slope.entity,
                normal: slope.normal,
            }));
        }
        if let Some(floor) = resolution.floor() {
            player.last_contact = player.position;
            player.standing_on = Some(floor.entity);
            player.terrain_normal = floor.normal;
        }
        if let Some(wall) = resolution.wall().copied() {
            if input.held(ActionFlags::GRAB) {
                if let Some(path) = vault_candidate(player, &wall, ctx) {
                    return Ok(outcome.with_event(MovementEvent::VaultStarted { path }));
                }
            }
            outcome.event = Some(MovementEvent::WallContact {
                entity: wall.entity,
                normal: wall.normal,
            });
        }

        if !resolution.moved_vertically() {
            break;
        }
    }

    Ok(outcome)
}

fn tick_airborne(
    player: &mut PlayerState,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
    dt: f32,
) -> Result<StepOutcome, SimulationError> {
    let config = ctx.config;
    player.velocity.y = (player.velocity.y - config.gravity * dt).max(-config.terminal_velocity);

    // Slide momentum is not steerable
    if player.state != MovementState::SlideFalling {
        let direction = input.world_direction(player.yaw);
        player.intent = direction;
        if direction.norm_squared() > 0.0 {
            let speed = config.ground_speed(input.held(ActionFlags::DASH), input.held(ActionFlags::WALK));
            let current = utils::horizontal(player.velocity);
            let delta = direction * speed - current;
            let max_change = config.air_control * dt;
            let change = if delta.norm() > max_change {
                delta.normalize() * max_change
            } else {
                delta
            };
            player.velocity += change;
        }
    }

    player.position += player.velocity * dt;
    let resolution = resolve_player(player, ctx, ResolveMode::default(), None)?;
    respond_to_contacts(player, &resolution);

    let state = player.state;
    let event = if let Some(floor) = resolution.floor() {
        Some(MovementEvent::FloorContact {
            entity: floor.entity,
            normal: floor.normal,
        })
    } else if let Some(slope) = resolution.slope() {
        Some(MovementEvent::SlopeContact {
            entity: slope.entity,
            normal: slope.normal,
        })
    } else if let Some(ledge) = ledge_candidate(player, input, &resolution, ctx) {
        Some(ledge)
    } else if let Some(ceiling) = resolution.ceiling() {
        Some(MovementEvent::CeilingContact { entity: ceiling.entity })
    } else if let Some(wall) = resolution.wall() {
        Some(MovementEvent::WallContact {
            entity: wall.entity,
            normal: wall.normal,
        })
    } else if state == MovementState::Jumping && player.velocity.y <= 0.0 {
        Some(MovementEvent::ApexReached)
    } else {
        None
    };

    Ok(StepOutcome {
        event,
        contacts: resolution.contacts,
    })
}

fn tick_sliding(
    player: &mut PlayerState,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
    dt: f32,
) -> Result<StepOutcome, SimulationError> {
    let mut outcome = StepOutcome::default();
    if input.held(ActionFlags::JUMP) {
        return Ok(outcome.with_event(MovementEvent::Jump));
    }
    let Some(slide) = player.slide else {
        return Ok(outcome.with_event(MovementEvent::FloorLost));
    };

    let downhill = slide.downhill();
    let accel = ctx.config.gravity * slide.sin_inclination();
    let speed = (player.velocity.dot(&downhill) + accel * dt).clamp(0.0, ctx.config.max_slide_speed);
    player.velocity = downhill * speed;
    player.intent = utils::horizontal(downhill);
    player.position += player.velocity * dt;

    match probe(ctx.world, ctx.controller, player.position, player.position.y, ctx.config, ctx.debug)? {
        ProbeOutcome::NoFloor => return leave(player, ctx, outcome, MovementEvent::FloorLost),
        ProbeOutcome::Floor(hit) => {
            let slidable = ctx.world.get(hit.entity).is_some_and(Entity::is_slidable);
            player.position.y = hit.point.y;
            player.last_contact = hit.point;
            player.terrain_normal = hit.normal;
            if classify(&hit.normal, slidable, ctx.config) == ContactKind::Slope {
                player.slide = Some(SlideData {
                    entity: hit.entity,
                    normal: hit.normal,
                });
            } else {
                let event = MovementEvent::FloorContact {
                    entity: hit.entity,
                    normal: hit.normal,
                };
                return leave(player, ctx, outcome, event);
            }
        }
    }

    let surface = player.slide.map(|s| s.entity);
    let resolution = resolve_player(player, ctx, ResolveMode::default(), surface)?;
    respond_to_contacts(player, &resolution);
    outcome.contacts = resolution.contacts.clone();

    if let Some(floor) = resolution.floor() {
        outcome.event = Some(MovementEvent::FloorContact {
            entity: floor.entity,
            normal: floor.normal,
        });
    } else if let Some(slope) = resolution.slope() {
        player.slide = Some(SlideData {
            entity: slope.entity,
            normal: slope.normal,
        });
    } else if let Some(wall) = resolution.wall() {
        outcome.event = Some(MovementEvent::WallContact {
            entity: wall.entity,
            normal: wall.normal,
        });
    }
    Ok(outcome)
}

fn tick_grabbing(
    player: &mut PlayerState,
    input: &PlayerInput,
    ctx: &mut MovementContext<'_>,
) -> Result<StepOutcome, SimulationError> {
    player.velocity = Vec3::zeros();
    let outcome = StepOutcome::default();

    let Some(grab) = player.grab else {
        return Ok(outcome.with_event(MovementEvent::GrabReleased));
    };
    let Some(bounds) = ctx.world.get(grab.entity).map(|e| *e.bounds()) else {
        return Ok(outcome.with_event(MovementEvent::GrabReleased));
    };

    if input.held(ActionFlags::JUMP) {
        let path = vault_path(player, grab.entity, &bounds, grab.wall_normal, ctx.config);
        return Ok(outcome.with_event(MovementEvent::VaultStarted { path }));
    }
    if !input.held(ActionFlags::GRAB) {
        return Ok(outcome.with_event(MovementEvent::GrabReleased));
    }
    Ok(outcome)
}

fn tick_vaulting(
    player: &mut PlayerState,
    ctx: &mut MovementContext<'_>,
    dt: f32,
) -> Result<StepOutcome, SimulationError> {
    let outcome = StepOutcome::default();
    let Some(path) = player.vault else {
        return Ok(outcome.with_event(MovementEvent::VaultFinished));
    };
    let config = ctx.config;

    let to_target = path.target - player.position;
    let step = config.vault_speed * dt;
    if to_target.norm() <= step {
        player.position = path.target;
    } else {
        player.position += to_target.normalize() * step;
    }
    player.yaw = utils::approach_angle(player.yaw, path.target_yaw, config.vault_turn_speed * dt);
    player.velocity = Vec3::zeros();

    // Scripted motion ignores collisions; only the index follows
    ctx.world.place_controller(ctx.controller, player.position)?;

    let arrived = (path.target - player.position).norm() <= config.vault_position_tolerance;
    let turned = utils::wrap_angle(path.target_yaw - player.yaw).abs() <= config.vault_angle_tolerance;
    if arrived && turned {
        return Ok(outcome.with_event(MovementEvent::VaultFinished));
    }
    Ok(outcome)
}

/// Ends a tick early, keeping the controller entity at the player's position
fn leave(
    player: &PlayerState,
    ctx: &mut MovementContext<'_>,
    outcome: StepOutcome,
    event: MovementEvent,
) -> Result<StepOutcome, SimulationError> {
    ctx.world.place_controller(ctx.controller, player.position)?;
    Ok(outcome.with_event(event))
}

/// Resolves the controller at the player's position, then copies the result back
fn resolve_player(
    player: &mut PlayerState,
    ctx: &mut MovementContext<'_>,
    mode: ResolveMode,
    exclude: Option<EntityKey>,
) -> Result<Resolution, SimulationError> {
    ctx.world.place_controller(ctx.controller, player.position)?;
    ctx.buffer.refresh(ctx.world, ctx.controller, exclude)?;

    let mut cylinder = Cylinder::new(player.position, ctx.config.radius, ctx.config.height);
    let resolution = ctx.resolver.resolve(
        ctx.world,
        ctx.buffer,
        ctx.controller,
        &mut cylinder,
        mode,
        ctx.config,
        ctx.debug,
    )?;
    player.position = cylinder.base;
    Ok(resolution)
}

/// Removes velocity pointing into walls and ceilings
fn respond_to_contacts(player: &mut PlayerState, resolution: &Resolution) {
    for contact in &resolution.contacts {
        match contact.kind {
            ContactKind::Ceiling => player.velocity.y = player.velocity.y.min(0.0),
            ContactKind::Wall => {
                let normal = utils::horizontal(contact.normal);
                if normal.norm_squared() > f32::EPSILON {
                    let normal = normal.normalize();
                    let into = player.velocity.dot(&normal);
                    if into < 0.0 {
                        player.velocity -= normal * into;
                    }
                }
            }
            ContactKind::Floor | ContactKind::Slope => {}
        }
    }
}

/// Ledge in reach of an airborne player holding grab
fn ledge_candidate(
    player: &PlayerState,
    input: &PlayerInput,
    resolution: &Resolution,
    ctx: &MovementContext<'_>,
) -> Option<MovementEvent> {
    if !input.held(ActionFlags::GRAB)
        || !matches!(player.state, MovementState::Jumping | MovementState::Falling)
    {
        return None;
    }
    let wall = resolution.wall()?;
    let top = ctx.world.get(wall.entity)?.bounds().max.y;
    let config = ctx.config;
    let lowest = player.position.y + config.height * 0.5;
    let highest = player.position.y + config.height + config.grab_reach;
    (lowest..=highest).contains(&top).then_some(MovementEvent::LedgeGrabbed {
        entity: wall.entity,
        ledge_height: top,
        normal: wall.normal,
    })
}

/// Vault path over a wall the standing player pushes into, if it is low enough
fn vault_candidate(
    player: &PlayerState,
    wall: &CollisionResult,
    ctx: &MovementContext<'_>,
) -> Option<VaultPath> {
    let bounds = *ctx.world.get(wall.entity)?.bounds();
    let rise = bounds.max.y - player.position.y;
    let config = ctx.config;
    if rise <= config.step_up || rise > config.vault_max_height {
        return None;
    }
    Some(vault_path(player, wall.entity, &bounds, wall.normal, config))
}

/// Target pose on top of `bounds`, one diameter past the wall face
fn vault_path(
    player: &PlayerState,
    entity: EntityKey,
    bounds: &BoundingBox,
    wall_normal: Vec3,
    config: &ControllerConfig,
) -> VaultPath {
    let into = utils::horizontal(-wall_normal);
    let into = if into.norm_squared() > f32::EPSILON {
        into.normalize()
    } else {
        utils::forward_from_yaw(player.yaw)
    };

    let reach = player.position + into * (config.radius * 2.0);
    let clamp = |value: f32, min: f32, max: f32| {
        let inset = config.radius.min((max - min) * 0.5);
        value.clamp(min + inset, max - inset)
    };
    let target = Vec3::new(
        clamp(reach.x, bounds.min.x, bounds.max.x),
        bounds.max.y,
        clamp(reach.z, bounds.min.z, bounds.max.z),
    );

    VaultPath {
        entity,
        origin: player.position,
        target,
        target_yaw: utils::yaw_of(into),
    }
}
