//! Iterative push-out resolution between the controller and level geometry
//!
//! Each pass tests every unchecked candidate, resolves only the deepest
//! hit, and flags that entity as checked. Passes repeat until one finds
//! nothing, so resolving one entity can reveal overlaps with others while
//! total work stays bounded by the candidate count.

use crate::core::config::ControllerConfig;
use crate::debug::{colors, DebugDraw};
use crate::foundation::math::Vec3;
use crate::physics::classify::{classify, ContactKind};
use crate::physics::collision::{gjk_intersect, CollisionShape, Contact, ConvexSet, Cylinder};
use crate::physics::CollisionBuffer;
use crate::simulation::SimulationError;
use crate::world::{Entity, EntityKey, MalformedEntity, World};

/// One resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Entity the controller was pushed out of
    pub entity: EntityKey,
    /// Unit push-out direction
    pub normal: Vec3,
    /// Push-out distance, excluding the contact skin
    pub penetration: f32,
    /// Semantic classification of `normal`
    pub kind: ContactKind,
}

/// Everything one resolve call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Contacts in resolution order
    pub contacts: Vec<CollisionResult>,
    /// Sum of all push-outs applied to the controller
    pub correction: Vec3,
    /// Passes that resolved a contact
    pub passes: usize,
}

impl Resolution {
    fn first_of(&self, kind: ContactKind) -> Option<&CollisionResult> {
        self.contacts.iter().find(|c| c.kind == kind)
    }

    /// First floor contact
    pub fn floor(&self) -> Option<&CollisionResult> {
        self.first_of(ContactKind::Floor)
    }

    /// First slope contact
    pub fn slope(&self) -> Option<&CollisionResult> {
        self.first_of(ContactKind::Slope)
    }

    /// First wall contact
    pub fn wall(&self) -> Option<&CollisionResult> {
        self.first_of(ContactKind::Wall)
    }

    /// First ceiling contact
    pub fn ceiling(&self) -> Option<&CollisionResult> {
        self.first_of(ContactKind::Ceiling)
    }

    /// True when nothing was touched
    pub fn is_clean(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Whether the controller was moved vertically
    pub fn moved_vertically(&self) -> bool {
        self.correction.y != 0.0
    }
}

/// Per-call resolver options
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolveMode {
    /// Boxes whose top is at most this far above the feet resolve upward
    pub step_up: Option<f32>,
}

impl ResolveMode {
    /// Standing mode with a step allowance
    pub fn stepping(height: f32) -> Self {
        Self { step_up: Some(height) }
    }
}

/// Narrow-phase dispatch and the pass loop
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    hull_segments: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { hull_segments: 16 }
    }
}

impl Resolver {
    /// Resolver approximating the cylinder with `hull_segments` sides for GJK
    pub fn new(hull_segments: usize) -> Self {
        Self {
            hull_segments: hull_segments.max(3),
        }
    }

    /// Narrow-phase contact between the cylinder and one entity
    ///
    /// Meshes confirm the hit with GJK against a prism hull, then take their
    /// push-out from the mesh bounds.
    pub fn contact(
        &self,
        key: EntityKey,
        entity: &Entity,
        cylinder: &Cylinder,
        mode: ResolveMode,
    ) -> Result<Option<Contact>, MalformedEntity> {
        // Cheap height-range pre-cull
        if !cylinder.overlaps_vertically(entity.bounds()) {
            return Ok(None);
        }

        match entity.shape() {
            CollisionShape::Box(bounds) => Ok(cylinder.test_box(bounds, mode.step_up)),
            CollisionShape::Slope(slope) => slope
                .test_cylinder(cylinder)
                .map_err(|err| MalformedEntity::new(key, entity.name(), err)),
            CollisionShape::Mesh { mesh, position } => {
                if !entity.bounds().test(&cylinder.bounding_box()) {
                    return Ok(None);
                }
                let hull = cylinder.hull_points(self.hull_segments);
                let result = gjk_intersect(&ConvexSet::new(&hull, Vec3::zeros()), &mesh.placed(*position));
                if result.colliding {
                    Ok(cylinder.test_box(entity.bounds(), mode.step_up))
                } else {
                    Ok(None)
                }
            }
            CollisionShape::Cylinder(_) => Ok(None),
        }
    }

    /// Push `cylinder` out of every overlapping candidate
    ///
    /// `buffer` must already be refreshed for this tick. The controller
    /// entity is moved to the corrected position before returning.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve(
        &self,
        world: &mut World,
        buffer: &mut CollisionBuffer,
        controller: EntityKey,
        cylinder: &mut Cylinder,
        mode: ResolveMode,
        config: &ControllerConfig,
        debug: &mut dyn DebugDraw,
    ) -> Result<Resolution, SimulationError> {
        let max_passes = buffer.len().min(config.max_resolve_passes);
        let mut resolution = Resolution::default();

        while resolution.passes < max_passes {
            let mut deepest: Option<(EntityKey, Contact, bool, bool)> = None;

            for key in buffer.unchecked() {
                let Some(entity) = world.get(key) else {
                    continue;
                };
                let Some(contact) = self.contact(key, entity, cylinder, mode)? else {
                    continue;
                };
                if contact.penetration <= 0.0 {
                    continue;
                }
                if deepest.map_or(true, |(_, best, _, _)| contact.penetration > best.penetration) {
                    let over = cylinder.axis_inside_footprint(entity.bounds());
                    deepest = Some((key, contact, entity.is_slidable(), over));
                }
            }

            let Some((key, contact, slidable, over)) = deepest else {
                break;
            };

            debug.draw_point(cylinder.base, colors::CONTACT_POINT, 4.0, 0.0);
            let push = contact.normal * (contact.penetration + config.contact_skin);
            cylinder.translate(push);
            buffer.mark_checked(key);

            let kind = match classify(&contact.normal, slidable, config) {
                // A steep slope only carries the controller once the axis is
                // over it; its toe pressing into the disk edge blocks like a wall
                ContactKind::Slope if !over => ContactKind::Wall,
                kind => kind,
            };
            debug.draw_line(cylinder.base, cylinder.base + contact.normal * 0.5, colors::CONTACT_NORMAL, 0.0);
            log::trace!(
                "Resolved {:?} contact with {:?}: depth {:.4} along {:?}",
                kind,
                key,
                contact.penetration,
                contact.normal
            );

            resolution.correction += push;
            resolution.passes += 1;
            resolution.contacts.push(CollisionResult {
                entity: key,
                normal: contact.normal,
                penetration: contact.penetration,
                kind,
            });
        }

        world.place_controller(controller, cylinder.base)?;
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WorldConfig;
    use crate::debug::{DebugDrawSystem, NullDebugDraw};
    use crate::physics::collision::{BoundingBox, ConvexMesh, Slope};
    use crate::world::EntityDesc;
    use crate::foundation::math::UP;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    struct Rig {
        world: World,
        buffer: CollisionBuffer,
        player: EntityKey,
        cylinder: Cylinder,
        config: ControllerConfig,
    }

    impl Rig {
        fn new(base: Vec3) -> Self {
            let mut world = World::new(WorldConfig::default());
            let config = ControllerConfig::default();
            let cylinder = Cylinder::new(base, config.radius, config.height);
            let player = world.spawn(EntityDesc::controller(cylinder)).unwrap();
            Self {
                world,
                buffer: CollisionBuffer::new(),
                player,
                cylinder,
                config,
            }
        }

        fn add(&mut self, desc: EntityDesc) -> EntityKey {
            self.world.spawn(desc).unwrap()
        }

        fn resolve(&mut self, mode: ResolveMode) -> Result<Resolution, SimulationError> {
            self.buffer.refresh(&self.world, self.player, None).unwrap();
            Resolver::default().resolve(
                &mut self.world,
                &mut self.buffer,
                self.player,
                &mut self.cylinder,
                mode,
                &self.config,
                &mut NullDebugDraw,
            )
        }
    }

    fn wall_at_x(x: f32) -> EntityDesc {
        EntityDesc::boxed(BoundingBox::new(Vec3::new(x, 0.0, -2.0), Vec3::new(x + 1.0, 3.0, 2.0)))
    }

    #[test]
    fn test_wall_push_out_is_horizontal() {
        let mut rig = Rig::new(Vec3::new(0.8, 0.0, 0.0));
        let wall = rig.add(wall_at_x(1.0));
        let resolution = rig.resolve(ResolveMode::default()).unwrap();

        let contact = resolution.wall().unwrap();
        assert_eq!(contact.entity, wall);
        assert_relative_eq!(rig.cylinder.base.x, 1.0 - 0.35 - rig.config.contact_skin, epsilon = 1e-5);
        assert_eq!(rig.cylinder.base.y, 0.0);
        assert!(rig.cylinder.test_box(rig.world.get(wall).unwrap().bounds(), None).is_none());
    }

    #[test]
    fn test_largest_penetration_resolves_first() {
        let mut rig = Rig::new(Vec3::zeros());
        // Shallow wall on +X, deep wall on -X
        let shallow = rig.add(wall_at_x(0.3));
        let deep = rig.add(EntityDesc::boxed(BoundingBox::new(
            Vec3::new(-1.5, 0.0, -2.0),
            Vec3::new(-0.1, 3.0, 2.0),
        )));
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        assert_eq!(resolution.contacts[0].entity, deep);
        assert!(resolution.contacts.iter().any(|c| c.entity == shallow));
    }

    #[test]
    fn test_terminates_within_candidate_count() {
        let mut rig = Rig::new(Vec3::zeros());
        for i in 0..5 {
            let x = -2.0 + i as f32;
            rig.add(EntityDesc::boxed(BoundingBox::new(
                Vec3::new(x, -0.2, -2.0),
                Vec3::new(x + 1.0, 0.1, 2.0),
            )));
        }
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        assert!(resolution.passes > 0);
        assert!(resolution.passes <= rig.buffer.len());
        // Every resolved entity is left clear of the corrected cylinder
        for contact in &resolution.contacts {
            let bounds = rig.world.get(contact.entity).unwrap().bounds();
            assert!(
                rig.cylinder.test_box(bounds, None).is_none(),
                "still overlapping {:?} after resolve",
                contact.entity
            );
        }
    }

    #[test]
    fn test_floor_overlap_resolves_up() {
        let mut rig = Rig::new(Vec3::new(0.0, -0.05, 0.0));
        rig.add(EntityDesc::boxed(BoundingBox::new(Vec3::new(-3.0, -1.0, -3.0), Vec3::new(3.0, 0.0, 3.0))));
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        assert_eq!(resolution.floor().unwrap().normal, UP);
        assert!(resolution.moved_vertically());
        assert!(rig.cylinder.base.y >= 0.0);
        // Controller entity follows the cylinder
        let bounds = rig.world.get(rig.player).unwrap().bounds();
        assert_relative_eq!(bounds.min.y, rig.cylinder.base.y, epsilon = 1e-6);
    }

    #[test]
    fn test_step_mode_lifts_onto_low_box() {
        let mut rig = Rig::new(Vec3::zeros());
        rig.add(EntityDesc::boxed(BoundingBox::new(Vec3::new(0.2, -1.0, -1.0), Vec3::new(2.0, 0.2, 1.0))));

        let mut strict = Rig::new(Vec3::zeros());
        strict.add(EntityDesc::boxed(BoundingBox::new(Vec3::new(0.2, -1.0, -1.0), Vec3::new(2.0, 0.2, 1.0))));

        let stepped = rig.resolve(ResolveMode::stepping(0.3)).unwrap();
        assert_eq!(stepped.contacts[0].normal, UP);
        assert_relative_eq!(rig.cylinder.base.y, 0.2 + rig.config.contact_skin, epsilon = 1e-6);

        let pushed = strict.resolve(ResolveMode::default()).unwrap();
        assert_eq!(pushed.contacts[0].kind, ContactKind::Wall);
    }

    #[test]
    fn test_steep_slidable_slope_is_slope_contact() {
        let mut rig = Rig::new(Vec3::new(0.0, 1.0, 0.0));
        rig.add(
            EntityDesc::slope(Slope::new(
                BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
                Vec3::new(1.0, 0.0, 0.0),
            ))
            .slidable(),
        );
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        assert!(resolution.slope().is_some());
    }

    #[test]
    fn test_steep_slope_toe_blocks_like_a_wall() {
        // Axis just off the low edge, disk edge over the incline
        let mut rig = Rig::new(Vec3::new(-1.2, 0.0, 0.0));
        rig.add(
            EntityDesc::slope(Slope::new(
                BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
                Vec3::new(1.0, 0.0, 0.0),
            ))
            .slidable(),
        );
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        assert!(resolution.slope().is_none());
        let wall = resolution.wall().unwrap();
        assert!(wall.normal.x < 0.0);
        assert!(rig.cylinder.base.x < -1.2);
    }

    #[test]
    fn test_malformed_slope_is_fatal() {
        let mut rig = Rig::new(Vec3::new(0.0, 0.5, 0.0));
        rig.add(
            EntityDesc::slope(Slope::new(
                BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
                Vec3::new(1.0, 0.0, 1.0),
            ))
            .named("broken ramp"),
        );
        let err = rig.resolve(ResolveMode::default()).unwrap_err();
        assert!(matches!(err, SimulationError::Geometry(ref e) if e.name == "broken ramp"));
    }

    #[test]
    fn test_mesh_contact_uses_gjk_then_bounds() {
        let mut rig = Rig::new(Vec3::new(0.8, 0.0, 0.0));
        let mesh = Arc::new(ConvexMesh::cuboid(Vec3::new(0.5, 1.0, 0.5)));
        rig.add(EntityDesc::mesh(Arc::clone(&mesh), Vec3::new(1.5, 1.0, 0.0)));
        let resolution = rig.resolve(ResolveMode::default()).unwrap();
        let contact = resolution.wall().unwrap();
        assert_relative_eq!(contact.normal, Vec3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(contact.penetration, 0.15, epsilon = 1e-5);
    }

    #[test]
    fn test_contacts_are_visualised() {
        let mut rig = Rig::new(Vec3::new(0.8, 0.0, 0.0));
        rig.add(wall_at_x(1.0));
        rig.buffer.refresh(&rig.world, rig.player, None).unwrap();
        let mut debug = DebugDrawSystem::new();
        Resolver::default()
            .resolve(
                &mut rig.world,
                &mut rig.buffer,
                rig.player,
                &mut rig.cylinder,
                ResolveMode::default(),
                &rig.config,
                &mut debug,
            )
            .unwrap();
        assert_eq!(debug.lines_with_color(colors::CONTACT_NORMAL), 1);
        assert_eq!(debug.points_with_color(colors::CONTACT_POINT), 1);
    }
}
