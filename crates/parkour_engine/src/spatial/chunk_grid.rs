//! Chunk grid with incremental, transactional membership updates

use thiserror::Error;

use crate::core::config::WorldConfig;
use crate::foundation::math::Vec3;
use crate::physics::collision::BoundingBox;
use crate::world::EntityKey;

/// Integer chunk coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// Index along X
    pub i: i32,
    /// Index along Y
    pub j: i32,
    /// Index along Z
    pub k: i32,
}

impl ChunkCoord {
    /// Creates a chunk coordinate
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self { i, j, k }
    }
}

/// Inclusive box of chunk coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    /// Lowest corner
    pub min: ChunkCoord,
    /// Highest corner, inclusive
    pub max: ChunkCoord,
}

impl ChunkRange {
    /// Number of chunks covered
    pub fn count(&self) -> usize {
        let span = |lo: i32, hi: i32| (hi - lo + 1).max(0) as usize;
        span(self.min.i, self.max.i) * span(self.min.j, self.max.j) * span(self.min.k, self.max.k)
    }

    /// Whether `coord` lies inside the range
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        (self.min.i..=self.max.i).contains(&coord.i)
            && (self.min.j..=self.max.j).contains(&coord.j)
            && (self.min.k..=self.max.k).contains(&coord.k)
    }

    /// Every coordinate in the range, X fastest
    pub fn iter(&self) -> impl Iterator<Item = ChunkCoord> {
        let range = *self;
        (range.min.k..=range.max.k).flat_map(move |k| {
            (range.min.j..=range.max.j).flat_map(move |j| {
                (range.min.i..=range.max.i).map(move |i| ChunkCoord::new(i, j, k))
            })
        })
    }
}

/// One grid cell and the entities currently overlapping it
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    visitors: Vec<EntityKey>,
}

impl Chunk {
    /// Entities registered in this chunk
    pub fn visitors(&self) -> &[EntityKey] {
        &self.visitors
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.visitors.len()
    }

    /// True when no entity is registered
    pub fn is_empty(&self) -> bool {
        self.visitors.is_empty()
    }

    fn remove(&mut self, key: EntityKey) {
        if let Some(index) = self.visitors.iter().position(|&v| v == key) {
            self.visitors.swap_remove(index);
        }
    }
}

/// Per-entity record of occupied chunks
///
/// Only the grid writes to it, so it always mirrors the chunks' visitor lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialRecord {
    range: Option<ChunkRange>,
    chunks: Vec<ChunkCoord>,
}

impl SpatialRecord {
    /// Occupied chunks in iteration order
    pub fn chunks(&self) -> &[ChunkCoord] {
        &self.chunks
    }

    /// Corner chunks of the occupied range
    pub fn range(&self) -> Option<ChunkRange> {
        self.range
    }

    /// True once the entity has been indexed
    pub fn is_registered(&self) -> bool {
        self.range.is_some()
    }
}

/// Result of a successful membership update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipUpdate {
    /// Corner chunks did not change; nothing was touched
    Unchanged,
    /// The entity moved between chunks
    Moved {
        /// Chunks the entity was added to
        entered: usize,
        /// Chunks the entity was removed from
        left: usize,
    },
}

/// Spatial index failures. The entity's record is untouched when one is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Entity would overlap more chunks than allowed
    #[error("entity {entity:?} spans {chunks} chunks, limit is {limit}")]
    EntityTooBig {
        /// Offending entity
        entity: EntityKey,
        /// Chunks the entity would overlap
        chunks: usize,
        /// Configured limit
        limit: usize,
    },

    /// A bounding box corner maps outside the grid
    #[error("entity {entity:?} bounds {min:?}..{max:?} leave the chunk grid")]
    OutOfBounds {
        /// Offending entity
        entity: EntityKey,
        /// Minimum corner of the rejected box
        min: [f32; 3],
        /// Maximum corner of the rejected box
        max: [f32; 3],
    },

    /// A chunk's visitor list is at capacity
    #[error("chunk {coord:?} is full ({capacity} visitors) while adding entity {entity:?}")]
    ChunkFull {
        /// Entity that could not be added
        entity: EntityKey,
        /// The full chunk
        coord: ChunkCoord,
        /// Configured capacity
        capacity: usize,
    },

    /// Coordinate does not name a chunk of this grid
    #[error("chunk coordinate {0:?} is outside the grid")]
    InvalidChunk(ChunkCoord),

    /// Key does not name a live entity
    #[error("entity {0:?} does not exist")]
    UnknownEntity(EntityKey),

    /// Entity is not a cylinder controller
    #[error("entity {0:?} is not a controller")]
    NotAController(EntityKey),
}

/// Pre-allocated grid of chunks over a bounded volume
#[derive(Debug, Clone)]
pub struct ChunkGrid {
    origin: Vec3,
    chunk_size: f32,
    dimensions: [i32; 3],
    max_chunks_per_entity: usize,
    chunk_capacity: usize,
    chunks: Vec<Chunk>,
}

impl ChunkGrid {
    /// Allocates every chunk described by `config`
    pub fn new(config: &WorldConfig) -> Self {
        let dimensions = config.dimensions.map(|d| d as i32);
        log::debug!(
            "Allocating chunk grid {:?} of size {} at {:?}",
            dimensions,
            config.chunk_size,
            config.origin
        );
        Self {
            origin: config.origin,
            chunk_size: config.chunk_size,
            dimensions,
            max_chunks_per_entity: config.max_chunks_per_entity,
            chunk_capacity: config.chunk_capacity,
            chunks: vec![Chunk::default(); config.chunk_count()],
        }
    }

    /// Side length of one chunk
    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    /// Chunk counts along X, Y and Z
    pub fn dimensions(&self) -> [i32; 3] {
        self.dimensions
    }

    fn index(&self, coord: ChunkCoord) -> Option<usize> {
        let [di, dj, dk] = self.dimensions;
        let valid = (0..di).contains(&coord.i) && (0..dj).contains(&coord.j) && (0..dk).contains(&coord.k);
        valid.then(|| (coord.i + di * (coord.j + dj * coord.k)) as usize)
    }

    fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.index(coord).and_then(|i| self.chunks.get(i))
    }

    fn chunk_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.index(coord).and_then(move |i| self.chunks.get_mut(i))
    }

    fn grid_space(&self, point: Vec3) -> Vec3 {
        (point - self.origin) / self.chunk_size
    }

    fn in_grid(&self, coord: ChunkCoord) -> Option<ChunkCoord> {
        self.index(coord).map(|_| coord)
    }

    /// Chunk containing `point`, or `None` outside the grid
    pub fn chunk_coord(&self, point: Vec3) -> Option<ChunkCoord> {
        let t = self.grid_space(point);
        if !(t.x.is_finite() && t.y.is_finite() && t.z.is_finite()) {
            return None;
        }
        self.in_grid(ChunkCoord::new(t.x.floor() as i32, t.y.floor() as i32, t.z.floor() as i32))
    }

    /// Chunks overlapped by `bounds`
    ///
    /// Overlap is half-open: a box whose max face lies exactly on a chunk
    /// boundary does not enter the next chunk. Either corner leaving the grid
    /// yields `None`.
    pub fn chunk_range(&self, bounds: &BoundingBox) -> Option<ChunkRange> {
        let min = self.chunk_coord(bounds.min)?;
        let t = self.grid_space(bounds.max);
        let upper = |lo: i32, t: f32| ((t.ceil() as i32) - 1).max(lo);
        let max = self.in_grid(ChunkCoord::new(
            upper(min.i, t.x),
            upper(min.j, t.y),
            upper(min.k, t.z),
        ))?;
        Some(ChunkRange { min, max })
    }

    /// Chunks overlapped by the part of `bounds` inside the grid
    ///
    /// Queries use this instead of [`Self::chunk_range`] so a probe poking
    /// past the grid edge still sees what lies inside it.
    pub fn chunk_range_clamped(&self, bounds: &BoundingBox) -> Option<ChunkRange> {
        let lo = self.grid_space(bounds.min);
        let hi = self.grid_space(bounds.max);
        let mut min = [0i32; 3];
        let mut max = [0i32; 3];
        for axis in 0..3 {
            let dim = self.dimensions[axis];
            if !(lo[axis].is_finite() && hi[axis].is_finite()) || hi[axis] < 0.0 || lo[axis] >= dim as f32 {
                return None;
            }
            min[axis] = (lo[axis].floor() as i32).clamp(0, dim - 1);
            max[axis] = ((hi[axis].ceil() as i32) - 1).clamp(min[axis], dim - 1);
        }
        Some(ChunkRange {
            min: ChunkCoord::new(min[0], min[1], min[2]),
            max: ChunkCoord::new(max[0], max[1], max[2]),
        })
    }

    /// Entities registered in `coord`
    pub fn visitors_of(&self, coord: ChunkCoord) -> Result<&[EntityKey], SpatialError> {
        self.chunk(coord)
            .map(Chunk::visitors)
            .ok_or(SpatialError::InvalidChunk(coord))
    }

    /// Re-index `entity` for its current `bounds`
    ///
    /// Every failure is detected before the first chunk is touched, so an
    /// error leaves both the grid and `record` exactly as they were.
    pub fn update_membership(
        &mut self,
        entity: EntityKey,
        bounds: &BoundingBox,
        record: &mut SpatialRecord,
    ) -> Result<MembershipUpdate, SpatialError> {
        let range = self.chunk_range(bounds).ok_or(SpatialError::OutOfBounds {
            entity,
            min: bounds.min.into(),
            max: bounds.max.into(),
        })?;

        if record.range == Some(range) {
            return Ok(MembershipUpdate::Unchanged);
        }

        let count = range.count();
        if count > self.max_chunks_per_entity {
            return Err(SpatialError::EntityTooBig {
                entity,
                chunks: count,
                limit: self.max_chunks_per_entity,
            });
        }

        let previous = record.range;
        let is_new = |coord: ChunkCoord| previous.map_or(true, |old| !old.contains(coord));

        for coord in range.iter().filter(|&c| is_new(c)) {
            let chunk = self.chunk(coord).ok_or(SpatialError::InvalidChunk(coord))?;
            if chunk.len() >= self.chunk_capacity {
                return Err(SpatialError::ChunkFull {
                    entity,
                    coord,
                    capacity: self.chunk_capacity,
                });
            }
        }

        // Validated; mutate
        let mut left = 0;
        for &coord in record.chunks.iter().filter(|&&c| !range.contains(c)) {
            if let Some(chunk) = self.chunk_mut(coord) {
                chunk.remove(entity);
                left += 1;
            }
        }

        let mut entered = 0;
        let mut chunks = Vec::with_capacity(count);
        for coord in range.iter() {
            if is_new(coord) {
                if let Some(chunk) = self.chunk_mut(coord) {
                    chunk.visitors.push(entity);
                    entered += 1;
                }
            }
            chunks.push(coord);
        }

        record.range = Some(range);
        record.chunks = chunks;

        log::trace!("Entity {:?} moved: entered {} chunks, left {}", entity, entered, left);
        Ok(MembershipUpdate::Moved { entered, left })
    }

    /// Drops `entity` from every chunk in `record`
    pub fn remove(&mut self, entity: EntityKey, record: &mut SpatialRecord) {
        for &coord in &record.chunks {
            if let Some(chunk) = self.chunk_mut(coord) {
                chunk.remove(entity);
            }
        }
        record.range = None;
        record.chunks.clear();
    }
}
