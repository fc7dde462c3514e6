//! Read access to the tile grid the monsters live on.

use std::collections::HashMap;

use glam::IVec2;
use mudworld_common::Tile;

const WATER_BIOMES: [&str; 4] = ["ocean", "shallow ocean", "lake", "river"];

/// Whether monsters can neither spawn on nor walk into a biome.
pub fn is_water_biome(biome_name: &str) -> bool {
    let name = biome_name.trim().to_ascii_lowercase();
    WATER_BIOMES.contains(&name.as_str())
}

/// Tile lookups the lifecycle engine needs. Provided by the world service.
pub trait TerrainLookup: Send + Sync {
    fn tile_at(&self, pos: IVec2) -> Option<Tile>;
    /// Tiles inside the inclusive rectangle `[min, max]`, in any order.
    fn tiles_in_bounds(&self, min: IVec2, max: IVec2) -> Vec<Tile>;
}

/// In-memory tile grid.
#[derive(Debug, Clone, Default)]
pub struct TileGrid {
    tiles: HashMap<IVec2, Tile>,
}

impl TileGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.pos, tile);
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl FromIterator<Tile> for TileGrid {
    fn from_iter<I: IntoIterator<Item = Tile>>(iter: I) -> Self {
        let mut grid = Self::new();
        for tile in iter {
            grid.insert(tile);
        }
        grid
    }
}

impl TerrainLookup for TileGrid {
    fn tile_at(&self, pos: IVec2) -> Option<Tile> {
        self.tiles.get(&pos).cloned()
    }

    fn tiles_in_bounds(&self, min: IVec2, max: IVec2) -> Vec<Tile> {
        let mut tiles: Vec<Tile> = self
            .tiles
            .values()
            .filter(|t| t.pos.x >= min.x && t.pos.x <= max.x && t.pos.y >= min.y && t.pos.y <= max.y)
            .cloned()
            .collect();
        // Row-major, so seeded callers see the same sequence every run.
        tiles.sort_by_key(|t| (t.pos.y, t.pos.x));
        tiles
    }
}
