use std::time::Instant;

use glam::IVec2;
use mudworld_common::{Tile, distance};

use crate::timing::{T_FILTER_TILES_MS, TILES_COUNT, TimingSink, elapsed_ms};

const BASE_RADIUS: f32 = 10.0;
const HEIGHT_BONUS: f32 = 7.0;
const MIN_RADIUS: u32 = 3;
const MAX_RADIUS: u32 = 12;

/// How far a player standing on a tile of `height` can see, in tiles.
///
/// Higher ground sees further; the result is clamped to `3..=12`.
pub fn visibility_radius(height: f32) -> u32 {
    let h = if height.is_nan() { 0.0 } else { height.clamp(0.0, 1.0) };
    let radius = (BASE_RADIUS + h * HEIGHT_BONUS).round() as u32;
    radius.clamp(MIN_RADIUS, MAX_RADIUS)
}

/// Tiles within `radius` of the player, in input order.
///
/// Records `tFilterTilesMs` and `tilesCount` into `timing`.
pub fn tiles_within_radius<S: TimingSink + ?Sized>(
    player: IVec2,
    tiles: &[Tile],
    radius: u32,
    timing: &mut S,
) -> Vec<Tile> {
    let start = Instant::now();
    let visible: Vec<Tile> = tiles
        .iter()
        .filter(|t| distance(player, t.pos) <= radius as f64)
        .cloned()
        .collect();
    timing.record(T_FILTER_TILES_MS, elapsed_ms(start));
    timing.record(TILES_COUNT, visible.len() as f64);
    visible
}
