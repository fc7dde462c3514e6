//! Shared value types and tile-grid geometry.
//!
//! # Invariants
//! - Chunk addressing uses floor division, so negative tiles land in negative chunks.
//! - Geometry functions are total: no input produces an error or a panic.

pub mod geometry;
pub mod types;

pub use geometry::{
    CHUNK_SIZE, ChunkCoord, Direction, chunk_of, chunks_covering, direction_from_center, distance,
};
pub use types::{MonsterId, Peak, Tile};
