use std::collections::HashMap;
use std::time::Instant;

use glam::IVec2;
use mudworld_common::{Direction, Tile, direction_from_center};
use serde::{Deserialize, Serialize};

use crate::timing::{T_BIOME_SUMMARY_MS, TimingSink, elapsed_ms};

/// One biome seen around the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeSummary {
    pub biome_name: String,
    pub tile_count: usize,
    /// Share of all summarized tiles, in `0.0..=1.0`.
    pub proportion: f64,
    /// Unique directions the biome was seen in, most tiles first.
    pub directions: Vec<Direction>,
}

/// Output shaping for biome summaries. Unlimited by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeSummaryOptions {
    pub max_biomes: Option<usize>,
    pub max_directions: Option<usize>,
}

#[derive(Debug)]
struct BiomeGroup<'a> {
    name: &'a str,
    count: usize,
    // Insertion order doubles as the tie-break.
    directions: Vec<(Direction, usize)>,
}

/// Summarizes the biomes in a player's neighborhood.
#[derive(Debug, Clone, Default)]
pub struct BiomeService {
    options: BiomeSummaryOptions,
}

impl BiomeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BiomeSummaryOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BiomeSummaryOptions {
        &self.options
    }

    /// Group `tiles` by biome, predominant biome first.
    ///
    /// Ties in tile count keep the order in which biomes first appear in
    /// `tiles`. Records `tBiomeSummaryMs` into `timing`.
    pub fn generate_biome_summary<S: TimingSink + ?Sized>(
        &self,
        player: IVec2,
        tiles: &[Tile],
        timing: &mut S,
    ) -> Vec<BiomeSummary> {
        let _span = tracing::debug_span!("biome_summary", tiles = tiles.len()).entered();
        let start = Instant::now();

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<BiomeGroup<'_>> = Vec::new();
        for tile in tiles {
            let slot = *index.entry(tile.biome_name.as_str()).or_insert_with(|| {
                groups.push(BiomeGroup {
                    name: tile.biome_name.as_str(),
                    count: 0,
                    directions: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.count += 1;

            let dir = direction_from_center(player, tile.pos);
            match group.directions.iter_mut().find(|(d, _)| *d == dir) {
                Some((_, n)) => *n += 1,
                None => group.directions.push((dir, 1)),
            }
        }

        // Stable sorts: equal counts stay in first-seen order.
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        let total = tiles.len().max(1) as f64;
        let max_biomes = self.options.max_biomes.unwrap_or(usize::MAX);
        let max_dirs = self.options.max_directions.unwrap_or(usize::MAX);

        let summary: Vec<BiomeSummary> = groups
            .into_iter()
            .take(max_biomes)
            .map(|mut g| {
                g.directions.sort_by(|a, b| b.1.cmp(&a.1));
                BiomeSummary {
                    biome_name: g.name.to_string(),
                    tile_count: g.count,
                    proportion: g.count as f64 / total,
                    directions: g.directions.into_iter().take(max_dirs).map(|(d, _)| d).collect(),
                }
            })
            .collect();

        timing.record(T_BIOME_SUMMARY_MS, elapsed_ms(start));
        tracing::trace!(biomes = summary.len(), "biome summary complete");
        summary
    }
}
