//! Spatial partitioning data structures
//!
//! A fixed grid of cubic chunks covering the playable volume. Each chunk
//! indexes the entities whose bounding box overlaps it; the grid never
//! owns entity lifetime.

mod chunk_grid;

pub use chunk_grid::{
    Chunk, ChunkCoord, ChunkGrid, ChunkRange, MembershipUpdate, SpatialError, SpatialRecord,
};
