//! Chunk addressing, compass directions and the distance metric of the core.

use std::cmp::Ordering;

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Edge length of a chunk, in tiles.
pub const CHUNK_SIZE: i32 = 50;

/// A chunk address in the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Lowest tile coordinate covered by this chunk.
    pub fn origin(&self) -> IVec2 {
        IVec2::new(
            self.x.saturating_mul(CHUNK_SIZE),
            self.y.saturating_mul(CHUNK_SIZE),
        )
    }

    pub fn contains(&self, pos: IVec2) -> bool {
        chunk_of(pos.x, pos.y) == *self
    }
}

/// Chunk containing tile `(x, y)`.
///
/// Floor division: tile -1 is in chunk -1, not chunk 0.
pub fn chunk_of(x: i32, y: i32) -> ChunkCoord {
    ChunkCoord {
        x: x.div_euclid(CHUNK_SIZE),
        y: y.div_euclid(CHUNK_SIZE),
    }
}

/// Every chunk intersecting the inclusive tile rectangle `[min, max]`.
///
/// Returned in ascending `(x, y)` order. An inverted rectangle yields nothing.
pub fn chunks_covering(min: IVec2, max: IVec2) -> Vec<ChunkCoord> {
    let lo = chunk_of(min.x, min.y);
    let hi = chunk_of(max.x, max.y);
    let mut result = Vec::new();
    for cx in lo.x..=hi.x {
        for cy in lo.y..=hi.y {
            result.push(ChunkCoord::new(cx, cy));
        }
    }
    result
}

/// Euclidean distance between two tiles.
///
/// This is the one metric used for peak visibility, spawn radii and pruning.
/// Computed in `f64` from `i64` deltas, so extreme coordinates cannot overflow.
pub fn distance(a: IVec2, b: IVec2) -> f64 {
    let dx = (b.x as i64 - a.x as i64) as f64;
    let dy = (b.y as i64 - a.y as i64) as f64;
    dx.hypot(dy)
}

/// Compass label of a tile relative to an observer. North is +y, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    /// Same tile as the observer.
    Here,
}

impl Direction {
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "north",
            Self::Northeast => "northeast",
            Self::East => "east",
            Self::Southeast => "southeast",
            Self::South => "south",
            Self::Southwest => "southwest",
            Self::West => "west",
            Self::Northwest => "northwest",
            Self::Here => "here",
        }
    }

    /// Unit step for this direction. `Here` does not move.
    pub fn offset(&self) -> IVec2 {
        match self {
            Self::North => IVec2::new(0, 1),
            Self::Northeast => IVec2::new(1, 1),
            Self::East => IVec2::new(1, 0),
            Self::Southeast => IVec2::new(1, -1),
            Self::South => IVec2::new(0, -1),
            Self::Southwest => IVec2::new(-1, -1),
            Self::West => IVec2::new(-1, 0),
            Self::Northwest => IVec2::new(-1, 1),
            Self::Here => IVec2::ZERO,
        }
    }

    fn from_signs(sx: Ordering, sy: Ordering) -> Self {
        use Ordering::*;
        match (sx, sy) {
            (Equal, Greater) => Self::North,
            (Greater, Greater) => Self::Northeast,
            (Greater, Equal) => Self::East,
            (Greater, Less) => Self::Southeast,
            (Equal, Less) => Self::South,
            (Less, Less) => Self::Southwest,
            (Less, Equal) => Self::West,
            (Less, Greater) => Self::Northwest,
            (Equal, Equal) => Self::Here,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction of `pos` as seen from `center`.
///
/// The offset is reduced to its per-axis sign first, so `(5, 1)` and `(1, 1)`
/// are both northeast.
pub fn direction_from_center(center: IVec2, pos: IVec2) -> Direction {
    Direction::from_signs(pos.x.cmp(&center.x), pos.y.cmp(&center.y))
}
