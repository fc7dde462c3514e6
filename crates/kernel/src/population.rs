//! Biome density targets and the planner that tops populations up to them.

use std::collections::{BTreeMap, HashMap};

use glam::IVec2;
use mudworld_common::Tile;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{EngineError, MonsterEngine, SpawnConstraints};
use crate::store::MonsterStore;

/// Target used for biomes missing from the table.
pub const DEFAULT_PER_1000: f64 = 3.0;

/// Spawn-group shape the planner asks the engine for.
const GROUP_RADIUS: f64 = 5.0;
const GROUP_CAP: u32 = 3;

/// Group cap for the next spawn given how much budget is left.
fn group_cap(remaining: usize) -> u32 {
    GROUP_CAP.min(u32::try_from(remaining).unwrap_or(u32::MAX))
}

fn biome_key(name: &str) -> String {
    let key = name.trim().to_ascii_lowercase();
    if key.is_empty() { "unknown".into() } else { key }
}

/// Desired monsters per 1000 tiles, by lowercased biome name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityTargets {
    pub per_1000: HashMap<String, f64>,
    pub fallback: f64,
}

impl Default for DensityTargets {
    fn default() -> Self {
        let per_1000 = [
            ("grassland", 4.0),
            ("plains", 4.0),
            ("forest", 8.0),
            ("taiga", 6.0),
            ("tundra", 3.0),
            ("hills", 6.0),
            ("mountain", 3.0),
            ("mountains", 3.0),
            ("swamp", 7.0),
            ("marsh", 6.0),
            ("jungle", 9.0),
            ("desert", 2.0),
            ("beach", 2.0),
            ("coast", 2.0),
            ("tainted", 8.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            per_1000,
            fallback: DEFAULT_PER_1000,
        }
    }
}

impl DensityTargets {
    pub fn target_for(&self, biome_name: &str) -> f64 {
        self.per_1000
            .get(&biome_key(biome_name))
            .copied()
            .unwrap_or(self.fallback)
    }
}

/// Per-biome line of a [`DensityReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeSpawnReport {
    pub biome: String,
    pub tiles: usize,
    pub target_per_1000: f64,
    pub target_count: usize,
    pub current: usize,
    pub deficit: usize,
    pub spawned: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityReport {
    pub spawned: usize,
    /// Only biomes that were under target.
    pub report: Vec<BiomeSpawnReport>,
}

/// Spawns monsters near a point until each biome approaches its density target.
#[derive(Debug, Clone, Default)]
pub struct PopulationPlanner {
    targets: DensityTargets,
}

impl PopulationPlanner {
    pub fn new(targets: DensityTargets) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &DensityTargets {
        &self.targets
    }

    /// Top up biome populations in the square of `radius_tiles` around `center`.
    ///
    /// Spawns at most `max_spawns` monsters in total. Biomes are visited in
    /// name order. Requires the engine to have terrain; without it nothing
    /// happens.
    pub fn enforce_density_around<S: MonsterStore, R: Rng + ?Sized>(
        &self,
        engine: &MonsterEngine<S>,
        center: IVec2,
        radius_tiles: u32,
        max_spawns: usize,
        rng: &mut R,
    ) -> Result<DensityReport, EngineError> {
        let mut out = DensityReport::default();
        let Some(terrain) = engine.terrain() else {
            tracing::warn!("density pass skipped: engine has no terrain");
            return Ok(out);
        };
        if max_spawns == 0 {
            return Ok(out);
        }

        let _span = tracing::info_span!("enforce_density", x = center.x, y = center.y, radius_tiles).entered();
        let r = radius_tiles.min(i32::MAX as u32) as i32;
        let min = IVec2::new(center.x.saturating_sub(r), center.y.saturating_sub(r));
        let max = IVec2::new(center.x.saturating_add(r), center.y.saturating_add(r));

        let tiles = terrain.tiles_in_bounds(min, max);
        let mut by_biome: BTreeMap<String, Vec<&Tile>> = BTreeMap::new();
        for tile in &tiles {
            by_biome.entry(biome_key(&tile.biome_name)).or_default().push(tile);
        }

        let mut current: HashMap<String, usize> = HashMap::new();
        for monster in engine.monsters_in_bounds(min, max)? {
            *current.entry(biome_key(&monster.spawn.biome_name)).or_default() += 1;
        }

        for (biome, candidates) in &by_biome {
            let target_per_1000 = self.targets.target_for(biome);
            let target_count = ((candidates.len() as f64 / 1000.0) * target_per_1000).ceil() as usize;
            let now = current.get(biome).copied().unwrap_or(0);
            let deficit = target_count.saturating_sub(now);
            if deficit == 0 {
                continue;
            }

            let mut spawned_here = 0;
            for _ in 0..deficit {
                let remaining = max_spawns - out.spawned;
                let tile = candidates[rng.gen_range(0..candidates.len())];
                let constraints = SpawnConstraints {
                    radius: None,
                    max_group_size: Some(group_cap(remaining)),
                };
                let group = engine.spawn_monsters_in_area(tile.pos, Some(GROUP_RADIUS), Some(&constraints), rng)?;
                spawned_here += group.len();
                out.spawned += group.len();
                if out.spawned >= max_spawns {
                    break;
                }
            }

            tracing::debug!(%biome, target_count, current = now, spawned = spawned_here, "biome topped up");
            out.report.push(BiomeSpawnReport {
                biome: biome.clone(),
                tiles: candidates.len(),
                target_per_1000,
                target_count,
                current: now,
                deficit,
                spawned: spawned_here,
            });
            if out.spawned >= max_spawns {
                break;
            }
        }

        tracing::info!(spawned = out.spawned, biomes = out.report.len(), "density pass complete");
        Ok(out)
    }
}
