//! Seeded demo terrain for the CLI.

use glam::IVec2;
use mudworld_common::{Peak, Tile};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Tiles at or above this height are reported as peaks.
pub const PEAK_HEIGHT: f32 = 0.85;

fn tile_rng(seed: u64, x: i32, y: i32) -> Xoshiro256PlusPlus {
    let mixed = seed
        ^ (x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    Xoshiro256PlusPlus::seed_from_u64(mixed)
}

fn biome_for(height: f32, moisture: f32) -> (u32, &'static str) {
    match (height, moisture) {
        (h, _) if h < 0.15 => (1, "ocean"),
        (h, _) if h < 0.22 => (2, "beach"),
        (h, _) if h >= 0.8 => (3, "mountain"),
        (h, _) if h >= 0.68 => (4, "hills"),
        (_, m) if m < 0.2 => (5, "desert"),
        (_, m) if m < 0.45 => (6, "grassland"),
        (_, m) if m < 0.75 => (7, "forest"),
        _ => (8, "swamp"),
    }
}

/// The tile at `(x, y)`. Same seed and position, same tile.
pub fn tile_at(seed: u64, x: i32, y: i32) -> Tile {
    let mut rng = tile_rng(seed, x, y);
    let height: f32 = rng.r#gen();
    let moisture: f32 = rng.r#gen();
    let temperature: f32 = rng.r#gen();
    let (biome_id, biome) = biome_for(height, moisture);
    Tile::new(x, y, biome)
        .with_biome_id(biome_id)
        .with_height(height)
        .with_climate(temperature, moisture)
        .with_seed(seed)
}

/// Every tile in the square of `half` tiles around `center`, row-major.
pub fn tiles_around(seed: u64, center: IVec2, half: i32) -> Vec<Tile> {
    (-half..=half)
        .flat_map(|dy| (-half..=half).map(move |dx| (dx, dy)))
        .map(|(dx, dy)| tile_at(seed, center.x + dx, center.y + dy))
        .collect()
}

pub fn peaks_in(tiles: &[Tile]) -> Vec<Peak> {
    tiles
        .iter()
        .filter(|t| t.height >= PEAK_HEIGHT)
        .map(|t| Peak::new(t.x(), t.y(), t.height))
        .collect()
}
