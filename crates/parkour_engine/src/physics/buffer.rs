//! Per-tick collision candidate buffer

use crate::spatial::{ChunkRange, SpatialError};
use crate::world::{EntityKey, World};

/// One candidate entity and whether it was resolved this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Candidate entity
    pub entity: EntityKey,
    /// Already resolved (or excluded) this tick
    pub checked: bool,
}

/// Entities sharing a chunk with the controller
///
/// Rebuilt only when the controller's corner chunks or the world's
/// revision change; otherwise each refresh just clears the checked flags
/// and reuses the allocation.
#[derive(Debug, Default, Clone)]
pub struct CollisionBuffer {
    candidates: Vec<Candidate>,
    range: Option<ChunkRange>,
    revision: Option<u64>,
    rebuilds: usize,
}

impl CollisionBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the buffer for a resolve call
    ///
    /// `exclude` (typically the entity the controller stands on) is kept in
    /// the buffer but pre-flagged as checked. Returns whether a rebuild
    /// happened.
    pub fn refresh(
        &mut self,
        world: &World,
        controller: EntityKey,
        exclude: Option<EntityKey>,
    ) -> Result<bool, SpatialError> {
        let range = world
            .get(controller)
            .ok_or(SpatialError::UnknownEntity(controller))?
            .spatial()
            .range();

        let stale = range != self.range || self.revision != Some(world.revision());
        if stale {
            self.rebuild(world, controller, range)?;
        } else {
            for candidate in &mut self.candidates {
                candidate.checked = false;
            }
        }

        if let Some(excluded) = exclude {
            self.mark_checked(excluded);
        }
        Ok(stale)
    }

    fn rebuild(
        &mut self,
        world: &World,
        controller: EntityKey,
        range: Option<ChunkRange>,
    ) -> Result<(), SpatialError> {
        let mut keys = Vec::new();
        if let Some(range) = range {
            for coord in range.iter() {
                keys.extend(world.visitors_of(coord)?.iter().copied().filter(|&k| k != controller));
            }
        }
        keys.sort_unstable();
        keys.dedup();

        self.candidates.clear();
        self.candidates
            .extend(keys.into_iter().map(|entity| Candidate { entity, checked: false }));
        self.range = range;
        self.revision = Some(world.revision());
        self.rebuilds += 1;

        log::trace!("Collision buffer rebuilt with {} candidates", self.candidates.len());
        Ok(())
    }

    /// Flags `entity` as resolved for the rest of the tick
    pub fn mark_checked(&mut self, entity: EntityKey) {
        if let Some(candidate) = self.candidates.iter_mut().find(|c| c.entity == entity) {
            candidate.checked = true;
        }
    }

    /// All candidates
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Candidates not yet resolved this tick
    pub fn unchecked(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.candidates.iter().filter(|c| !c.checked).map(|c| c.entity)
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True when no entity shares a chunk with the controller
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of rebuilds since creation
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Forces the next refresh to rebuild
    pub fn invalidate(&mut self) {
        self.range = None;
        self.revision = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WorldConfig;
    use crate::foundation::math::Vec3;
    use crate::physics::collision::{BoundingBox, Cylinder};
    use crate::world::EntityDesc;

    fn setup() -> (World, EntityKey, EntityKey, EntityKey) {
        let mut world = World::new(WorldConfig {
            origin: Vec3::new(-30.0, -30.0, -30.0),
            chunk_size: 4.0,
            dimensions: [16, 16, 16],
            ..WorldConfig::default()
        });
        let floor = world
            .spawn(EntityDesc::boxed(BoundingBox::new(Vec3::new(-3.0, -1.0, -3.0), Vec3::new(3.0, 0.0, 3.0))))
            .unwrap();
        let far = world
            .spawn(EntityDesc::boxed(BoundingBox::new(Vec3::new(20.0, 0.0, 20.0), Vec3::new(21.0, 1.0, 21.0))))
            .unwrap();
        let player = world
            .spawn(EntityDesc::controller(Cylinder::new(Vec3::zeros(), 0.35, 1.8)))
            .unwrap();
        (world, floor, far, player)
    }

    #[test]
    fn test_rebuild_gathers_nearby_entities_only() {
        let (world, floor, far, player) = setup();
        let mut buffer = CollisionBuffer::new();
        assert!(buffer.refresh(&world, player, None).unwrap());
        let keys: Vec<_> = buffer.candidates().iter().map(|c| c.entity).collect();
        assert!(keys.contains(&floor));
        assert!(!keys.contains(&far));
        assert!(!keys.contains(&player));
    }

    #[test]
    fn test_unchanged_chunks_reuse_and_reset_flags() {
        let (mut world, floor, _, player) = setup();
        let mut buffer = CollisionBuffer::new();
        buffer.refresh(&world, player, None).unwrap();
        buffer.mark_checked(floor);
        assert_eq!(buffer.unchecked().count(), 0);

        // Small move inside the same chunks
        world.place_controller(player, Vec3::new(0.1, 0.0, 0.1)).unwrap();
        assert!(!buffer.refresh(&world, player, None).unwrap());
        assert_eq!(buffer.rebuilds(), 1);
        assert_eq!(buffer.unchecked().collect::<Vec<_>>(), vec![floor]);
    }

    #[test]
    fn test_exclude_is_prechecked() {
        let (world, floor, _, player) = setup();
        let mut buffer = CollisionBuffer::new();
        buffer.refresh(&world, player, Some(floor)).unwrap();
        assert!(buffer.unchecked().all(|k| k != floor));
    }

    #[test]
    fn test_world_revision_forces_rebuild() {
        let (mut world, _, _, player) = setup();
        let mut buffer = CollisionBuffer::new();
        buffer.refresh(&world, player, None).unwrap();

        let wall = world
            .spawn(EntityDesc::boxed(BoundingBox::new(Vec3::new(0.5, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0))))
            .unwrap();
        assert!(buffer.refresh(&world, player, None).unwrap());
        assert!(buffer.unchecked().any(|k| k == wall));
        assert_eq!(buffer.rebuilds(), 2);
    }

    #[test]
    fn test_crossing_chunk_boundary_rebuilds() {
        let (mut world, _, _, player) = setup();
        let mut buffer = CollisionBuffer::new();
        buffer.refresh(&world, player, None).unwrap();
        world.place_controller(player, Vec3::new(6.0, 0.0, 0.0)).unwrap();
        assert!(buffer.refresh(&world, player, None).unwrap());
    }
}
