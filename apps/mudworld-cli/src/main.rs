mod field;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::IVec2;
use mudworld_common::{CHUNK_SIZE, chunk_of};
use mudworld_kernel::{
    DensityTargets, EngineConfig, InMemoryMonsterStore, MonsterEngine, MonsterEvent, PopulationPlanner, TileGrid,
};
use mudworld_perception::{
    BiomeService, PeakPolicy, PeakService, TimingMetrics, tiles_within_radius, visibility_radius,
};
use mudworld_progression::{DiceExpr, ability_modifier, roll_ability_score};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mudworld-cli", about = "CLI tool for mudworld operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML file overriding engine, peak and density settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and effective configuration
    Info,
    /// Show which chunk a tile belongs to
    Chunk {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },
    /// Describe what a player standing at (x, y) can see
    Look {
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        x: i32,
        #[arg(short, long, default_value = "0", allow_negative_numbers = true)]
        y: i32,
        /// World seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Run the monster lifecycle around a few players
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "20")]
        ticks: u64,
        /// RNG seed for deterministic runs
        #[arg(short, long, default_value = "42")]
        seed: u64,
        #[arg(short, long, default_value = "2")]
        players: usize,
        /// Monsters further than this from every player are pruned
        #[arg(long, default_value = "30")]
        prune_distance: f64,
    },
    /// Roll dice: an expression like 2d6+1, or a set of ability scores
    Roll {
        /// Dice expression; omit to roll six ability scores
        expr: Option<String>,
        #[arg(short = 'n', long, default_value = "1")]
        times: usize,
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
    engine: EngineConfig,
    peaks: PeakPolicy,
    density: DensityTargets,
}

impl CliConfig {
    fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.engine.validate().context("invalid engine config")?;
        self.peaks.validate().context("invalid peak policy")?;
        Ok(())
    }
}

fn rng_from(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Half-width of the terrain square the simulation generates around each player.
const SIM_HALF: i32 = 25;
const DENSITY_RADIUS: u32 = 15;
const DENSITY_MAX_SPAWNS: usize = 5;
const PRUNE_BUDGET: Duration = Duration::from_millis(50);

fn event_label(event: &MonsterEvent) -> &'static str {
    match event {
        MonsterEvent::Spawned { .. } => "spawned",
        MonsterEvent::Moved { .. } => "moved",
        MonsterEvent::Stayed { .. } => "stayed",
        MonsterEvent::Damaged { .. } => "damaged",
        MonsterEvent::Died { .. } => "died",
        MonsterEvent::Removed { .. } => "removed",
    }
}

fn look(config: &CliConfig, player: IVec2, seed: u64) -> anyhow::Result<serde_json::Value> {
    let here = field::tile_at(seed, player.x, player.y);
    let radius = visibility_radius(here.height);
    let tiles = field::tiles_around(seed, player, radius as i32);

    let mut timing = TimingMetrics::new();
    let visible = tiles_within_radius(player, &tiles, radius, &mut timing);
    let biomes = BiomeService::new().generate_biome_summary(player, &visible, &mut timing);
    let peaks = PeakService::with_policy(config.peaks.clone())?.process_visible_peaks(
        player,
        radius as f64,
        &field::peaks_in(&tiles),
        &mut timing,
    );

    Ok(json!({
        "tile": here,
        "visibility": radius,
        "biomes": biomes,
        "peaks": peaks,
        "timing": timing,
    }))
}

fn simulate(config: &CliConfig, ticks: u64, seed: u64, player_count: usize, prune_distance: f64) -> anyhow::Result<()> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let players: Vec<IVec2> = (0..player_count)
        .map(|_| IVec2::new(rng.gen_range(-60..=60), rng.gen_range(-60..=60)))
        .collect();

    let grid: TileGrid = players
        .iter()
        .flat_map(|p| field::tiles_around(seed, *p, SIM_HALF))
        .collect();
    tracing::info!(players = players.len(), tiles = grid.len(), "terrain generated");

    let engine = MonsterEngine::new(InMemoryMonsterStore::new(), config.engine.clone())?.with_terrain(Arc::new(grid));
    let planner = PopulationPlanner::new(config.density.clone());
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for _ in 0..ticks {
        let tick = engine.advance_tick();
        for player in &players {
            planner.enforce_density_around(&engine, *player, DENSITY_RADIUS, DENSITY_MAX_SPAWNS, &mut rng)?;
        }

        let alive = engine.all_monsters()?;
        for monster in &alive {
            engine.move_monster(monster.id, &mut rng)?;
        }
        if !alive.is_empty() {
            let target = &alive[rng.gen_range(0..alive.len())];
            let hit = target.damage_roll.roll(&mut rng).max(1) as u32;
            engine.damage_monster(target.id, hit.saturating_mul(3))?;
        }

        let cleaned = engine.cleanup_dead_monsters()?;
        let pruned =
            engine.prune_monsters_far_from_players(&players, prune_distance, Some(Instant::now() + PRUNE_BUDGET))?;
        tracing::debug!(tick, cleaned = cleaned.removed, pruned = pruned.removed, "tick done");

        for event in engine.drain_events() {
            *counts.entry(event_label(&event)).or_default() += 1;
        }
    }

    let summary = json!({
        "ticks": engine.tick(),
        "players": players,
        "alive": engine.all_monsters()?.len(),
        "events": counts,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            println!("mudworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("chunk size: {CHUNK_SIZE}");
            print!("{}", serde_yaml::to_string(&config)?);
        }
        Commands::Chunk { x, y } => {
            let chunk = chunk_of(x, y);
            let origin = chunk.origin();
            println!("tile ({x}, {y}) -> chunk ({}, {}), origin ({}, {})", chunk.x, chunk.y, origin.x, origin.y);
        }
        Commands::Look { x, y, seed } => {
            let report = look(&config, IVec2::new(x, y), seed)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Simulate {
            ticks,
            seed,
            players,
            prune_distance,
        } => simulate(&config, ticks, seed, players, prune_distance)?,
        Commands::Roll { expr, times, seed } => {
            let mut rng = rng_from(seed);
            match expr {
                Some(expr) => {
                    let dice: DiceExpr = expr.parse()?;
                    for _ in 0..times {
                        println!("{dice}: {} (range {}..={})", dice.roll(&mut rng), dice.min(), dice.max());
                    }
                }
                None => {
                    for _ in 0..times {
                        let scores: Vec<String> = (0..6)
                            .map(|_| {
                                let score = roll_ability_score(&mut rng);
                                format!("{score} ({:+})", ability_modifier(score))
                            })
                            .collect();
                        println!("{}", scores.join(", "));
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_negative_coordinates() {
        let cli = Cli::try_parse_from(["mudworld-cli", "chunk", "-51", "7"]).unwrap();
        assert!(matches!(cli.command, Commands::Chunk { x: -51, y: 7 }));
    }

    #[test]
    fn config_yaml_overrides_defaults() {
        let yaml = "engine:\n  default_spawn_radius: 8.0\npeaks:\n  max_results: 5\n";
        let config: CliConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine.default_spawn_radius, 8.0);
        assert_eq!(config.engine.default_max_group_size, 3);
        assert_eq!(config.peaks.max_results, 5);
        assert_eq!(config.peaks.min_distance_ratio, 0.25);
    }

    #[test]
    fn config_with_bad_engine_defaults_is_rejected() {
        for yaml in [
            "engine:\n  default_spawn_radius: -1.0\n",
            "engine:\n  default_spawn_radius: .nan\n",
            "engine:\n  default_max_group_size: 0\n",
        ] {
            let config: CliConfig = serde_yaml::from_str(yaml).unwrap();
            assert!(config.validate().is_err(), "{yaml}");
        }
        assert!(CliConfig::default().validate().is_ok());
    }

    #[test]
    fn look_reports_timing_fields() {
        let report = look(&CliConfig::default(), IVec2::new(5, -5), 9).unwrap();
        let timing = &report["timing"];
        assert!(timing.get("tFilterTilesMs").is_some());
        assert!(timing.get("tBiomeSummaryMs").is_some());
        assert!(timing.get("tPeaksSortMs").is_some());
        assert!(report["peaks"].as_array().unwrap().len() <= 3);
    }
}
