//! Entity arena and spatial index
//!
//! The [`World`] owns every entity in a generation-checked slot map and
//! keeps each entity's bounds and chunk membership in step. All movement
//! goes through [`World::translate_entity`] or [`World::place_controller`],
//! which update both or neither.

mod entity;

pub use entity::{Entity, EntityDesc, EntityKey, RayHit};

use slotmap::SlotMap;
use thiserror::Error;

use crate::core::config::WorldConfig;
use crate::foundation::math::Vec3;
use crate::physics::collision::{BoundingBox, CollisionShape, GeometryError, Ray};
use crate::spatial::{ChunkCoord, ChunkGrid, MembershipUpdate, SpatialError};

/// Malformed geometry met while querying a specific entity
#[derive(Error, Debug, Clone, PartialEq)]
#[error("entity {name} ({entity:?}) has malformed geometry: {source}")]
pub struct MalformedEntity {
    /// Offending entity
    pub entity: EntityKey,
    /// Its diagnostic name
    pub name: String,
    /// What is wrong with the shape
    #[source]
    pub source: GeometryError,
}

impl MalformedEntity {
    pub(crate) fn new(entity: EntityKey, name: &str, source: GeometryError) -> Self {
        log::error!("Entity {} ({:?}) has malformed geometry: {}", name, entity, source);
        Self {
            entity,
            name: name.to_string(),
            source,
        }
    }
}

/// Level geometry plus the controller, indexed by chunk
#[derive(Debug)]
pub struct World {
    entities: SlotMap<EntityKey, Entity>,
    grid: ChunkGrid,
    config: WorldConfig,
    revision: u64,
}

impl World {
    /// Creates an empty world over the grid described by `config`
    pub fn new(config: WorldConfig) -> Self {
        Self {
            entities: SlotMap::with_key(),
            grid: ChunkGrid::new(&config),
            config,
            revision: 0,
        }
    }

    /// Grid layout
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Underlying chunk grid
    pub fn grid(&self) -> &ChunkGrid {
        &self.grid
    }

    /// Counter bumped whenever level geometry enters, leaves or moves between chunks
    ///
    /// Controller movement does not bump it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when the world holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over every live entity
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Looks up an entity
    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Inserts and indexes a new entity
    ///
    /// An entity that cannot be indexed is not inserted.
    pub fn spawn(&mut self, desc: EntityDesc) -> Result<EntityKey, SpatialError> {
        let key = self.entities.insert(desc.build());
        let Some(entity) = self.entities.get_mut(key) else {
            return Err(SpatialError::UnknownEntity(key));
        };

        match self.grid.update_membership(key, &entity.bounds, &mut entity.spatial) {
            Ok(_) => {
                log::debug!("Spawned {} ({:?}) as {:?}", entity.name, entity.kind(), key);
                if !entity.is_controller() {
                    self.revision += 1;
                }
                Ok(key)
            }
            Err(err) => {
                log::error!("Cannot spawn {}: {}", entity.name, err);
                self.entities.remove(key);
                Err(err)
            }
        }
    }

    /// Removes an entity from the arena and the index
    pub fn despawn(&mut self, key: EntityKey) -> Option<Entity> {
        let mut entity = self.entities.remove(key)?;
        self.grid.remove(key, &mut entity.spatial);
        if !entity.is_controller() {
            self.revision += 1;
        }
        log::debug!("Despawned {} ({:?})", entity.name, key);
        Some(entity)
    }

    /// Moves an entity by `delta`, updating bounds and chunks together
    pub fn translate_entity(
        &mut self,
        key: EntityKey,
        delta: Vec3,
    ) -> Result<MembershipUpdate, SpatialError> {
        let entity = self
            .entities
            .get_mut(key)
            .ok_or(SpatialError::UnknownEntity(key))?;

        let bounds = entity.bounds.translated(delta);
        let update = self.grid.update_membership(key, &bounds, &mut entity.spatial)?;

        entity.shape.translate(delta);
        entity.bounds = bounds;

        if update != MembershipUpdate::Unchanged && !entity.is_controller() {
            self.revision += 1;
        }
        Ok(update)
    }

    /// Puts the controller's feet at `base`
    pub fn place_controller(
        &mut self,
        key: EntityKey,
        base: Vec3,
    ) -> Result<MembershipUpdate, SpatialError> {
        let current = match self.entities.get(key).map(Entity::shape) {
            Some(CollisionShape::Cylinder(cylinder)) => cylinder.base,
            Some(_) => return Err(SpatialError::NotAController(key)),
            None => return Err(SpatialError::UnknownEntity(key)),
        };
        self.translate_entity(key, base - current)
    }

    /// Re-indexes an entity from its current bounds
    pub fn update_membership(&mut self, key: EntityKey) -> Result<MembershipUpdate, SpatialError> {
        let entity = self
            .entities
            .get_mut(key)
            .ok_or(SpatialError::UnknownEntity(key))?;
        let update = self.grid.update_membership(key, &entity.bounds, &mut entity.spatial)?;
        if update != MembershipUpdate::Unchanged && !entity.is_controller() {
            self.revision += 1;
        }
        Ok(update)
    }

    /// Entities registered in one chunk
    pub fn visitors_of(&self, coord: ChunkCoord) -> Result<&[EntityKey], SpatialError> {
        self.grid.visitors_of(coord)
    }

    /// Every entity registered in the chunks touched by `bounds`, once each
    pub fn entities_near(&self, bounds: &BoundingBox) -> Vec<EntityKey> {
        let Some(range) = self.grid.chunk_range_clamped(bounds) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for coord in range.iter() {
            if let Ok(visitors) = self.grid.visitors_of(coord) {
                found.extend_from_slice(visitors);
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Entities whose bounds overlap `bounds`, once each
    pub fn entities_in_box(&self, bounds: &BoundingBox) -> Vec<EntityKey> {
        self.entities_near(bounds)
            .into_iter()
            .filter(|&key| self.entities.get(key).is_some_and(|e| e.bounds.test(bounds)))
            .collect()
    }

    /// Closest entity hit by `ray` within `max_distance`
    ///
    /// Malformed geometry along the ray is reported, not skipped.
    pub fn raycast(
        &self,
        ray: &Ray,
        max_distance: f32,
        exclude: Option<EntityKey>,
    ) -> Result<Option<RayHit>, MalformedEntity> {
        let sweep = BoundingBox::from_points(ray.origin, ray.point_at(max_distance));

        let mut closest: Option<RayHit> = None;
        for key in self.entities_near(&sweep) {
            if Some(key) == exclude {
                continue;
            }
            let Some(entity) = self.entities.get(key) else {
                continue;
            };
            let hit = entity
                .shape
                .intersect_ray(ray)
                .map_err(|err| MalformedEntity::new(key, &entity.name, err))?;
            if let Some((distance, point, normal)) = hit {
                if distance <= max_distance && closest.map_or(true, |c| distance < c.distance) {
                    closest = Some(RayHit { entity: key, distance, point, normal });
                }
            }
        }
        Ok(closest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::{Cylinder, Slope};
    use approx::assert_relative_eq;

    fn world() -> World {
        World::new(WorldConfig {
            origin: Vec3::new(-16.0, -16.0, -16.0),
            chunk_size: 4.0,
            dimensions: [8, 8, 8],
            max_chunks_per_entity: 27,
            chunk_capacity: 16,
            kill_height: -15.0,
        })
    }

    fn floor() -> EntityDesc {
        EntityDesc::boxed(BoundingBox::new(Vec3::new(-3.0, -1.0, -3.0), Vec3::new(3.0, 0.0, 3.0))).named("floor")
    }

    #[test]
    fn test_spawn_indexes_and_bumps_revision() {
        let mut w = world();
        let key = w.spawn(floor()).unwrap();
        assert_eq!(w.revision(), 1);
        assert_eq!(w.get(key).unwrap().name(), "floor");
        for &coord in w.get(key).unwrap().spatial().chunks() {
            assert!(w.visitors_of(coord).unwrap().contains(&key));
        }
    }

    #[test]
    fn test_failed_spawn_leaves_world_empty() {
        let mut w = world();
        let huge = EntityDesc::boxed(BoundingBox::new(Vec3::repeat(-15.0), Vec3::repeat(15.0)));
        assert!(matches!(w.spawn(huge), Err(SpatialError::EntityTooBig { .. })));
        assert!(w.is_empty());
        assert_eq!(w.revision(), 0);
    }

    #[test]
    fn test_controller_moves_do_not_bump_revision() {
        let mut w = world();
        w.spawn(floor()).unwrap();
        let player = w.spawn(EntityDesc::controller(Cylinder::new(Vec3::zeros(), 0.35, 1.8))).unwrap();
        let revision = w.revision();

        w.place_controller(player, Vec3::new(9.0, 0.0, 0.0)).unwrap();
        assert_eq!(w.revision(), revision);
        let bounds = *w.get(player).unwrap().bounds();
        assert_relative_eq!(bounds.center().x, 9.0);
    }

    #[test]
    fn test_translate_rejects_out_of_grid_atomically() {
        let mut w = world();
        let key = w.spawn(floor()).unwrap();
        let before = w.get(key).unwrap().clone();

        let err = w.translate_entity(key, Vec3::new(100.0, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, SpatialError::OutOfBounds { .. }));
        let after = w.get(key).unwrap();
        assert_eq!(after.bounds(), before.bounds());
        assert_eq!(after.spatial(), before.spatial());
    }

    #[test]
    fn test_place_controller_requires_cylinder() {
        let mut w = world();
        let key = w.spawn(floor()).unwrap();
        assert_eq!(
            w.place_controller(key, Vec3::zeros()),
            Err(SpatialError::NotAController(key))
        );
    }

    #[test]
    fn test_despawn_clears_chunks() {
        let mut w = world();
        let key = w.spawn(floor()).unwrap();
        let chunks = w.get(key).unwrap().spatial().chunks().to_vec();
        assert!(w.despawn(key).is_some());
        for coord in chunks {
            assert!(w.visitors_of(coord).unwrap().is_empty());
        }
        assert!(w.get(key).is_none());
    }

    #[test]
    fn test_entities_in_box_is_deduplicated() {
        let mut w = world();
        let a = w.spawn(floor()).unwrap();
        let b = w
            .spawn(EntityDesc::boxed(BoundingBox::new(Vec3::new(10.0, 0.0, 10.0), Vec3::new(11.0, 1.0, 11.0))))
            .unwrap();

        let query = BoundingBox::new(Vec3::new(-4.0, -2.0, -4.0), Vec3::new(4.0, 2.0, 4.0));
        assert_eq!(w.entities_in_box(&query), vec![a]);

        let everything = BoundingBox::new(Vec3::repeat(-15.0), Vec3::repeat(15.0));
        let mut all = w.entities_in_box(&everything);
        all.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_raycast_picks_closest_and_honours_exclude() {
        let mut w = world();
        let low = w.spawn(floor()).unwrap();
        let high = w
            .spawn(EntityDesc::boxed(BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.5, 1.0))))
            .unwrap();

        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), -Vec3::y());
        let hit = w.raycast(&ray, 5.0, None).unwrap().unwrap();
        assert_eq!(hit.entity, high);
        assert_relative_eq!(hit.point.y, 0.5);

        let hit = w.raycast(&ray, 5.0, Some(high)).unwrap().unwrap();
        assert_eq!(hit.entity, low);

        assert!(w.raycast(&ray, 1.0, None).unwrap().is_none());
    }

    #[test]
    fn test_raycast_reports_malformed_slope() {
        let mut w = world();
        w.spawn(EntityDesc::slope(Slope::new(
            BoundingBox::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
            Vec3::new(1.0, 0.0, 1.0),
        )))
        .unwrap();
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), -Vec3::y());
        let err = w.raycast(&ray, 5.0, None).unwrap_err();
        assert_eq!(err.name, "slope");
        assert!(matches!(err.source, GeometryError::MalformedSlope { .. }));
    }
}
