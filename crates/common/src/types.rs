use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{ChunkCoord, chunk_of};

/// Unique identifier for a monster, assigned by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterId(pub u64);

impl std::fmt::Display for MonsterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One addressable world cell with its terrain attributes.
///
/// Tiles are snapshots: the core never mutates one after it has been handed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub pos: IVec2,
    pub biome_id: u32,
    pub biome_name: String,
    pub height: f32,
    pub temperature: f32,
    pub moisture: f32,
    pub seed: u64,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Tile {
    /// A tile with neutral terrain values. Use the `with_*` helpers to fill in the rest.
    pub fn new(x: i32, y: i32, biome_name: impl Into<String>) -> Self {
        Self {
            pos: IVec2::new(x, y),
            biome_id: 0,
            biome_name: biome_name.into(),
            height: 0.0,
            temperature: 0.5,
            moisture: 0.5,
            seed: 0,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    pub fn with_biome_id(mut self, biome_id: u32) -> Self {
        self.biome_id = biome_id;
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_climate(mut self, temperature: f32, moisture: f32) -> Self {
        self.temperature = temperature;
        self.moisture = moisture;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn x(&self) -> i32 {
        self.pos.x
    }

    pub fn y(&self) -> i32 {
        self.pos.y
    }

    /// Chunk this tile belongs to. Always derived from the position.
    pub fn chunk(&self) -> ChunkCoord {
        chunk_of(self.pos.x, self.pos.y)
    }
}

/// A local height maximum that may be visible from afar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub pos: IVec2,
    pub height: f32,
}

impl Peak {
    pub fn new(x: i32, y: i32, height: f32) -> Self {
        Self {
            pos: IVec2::new(x, y),
            height,
        }
    }
}
