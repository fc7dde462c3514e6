//! Monster kernel: authoritative monster state, spawning, movement, damage and removal.
//!
//! # Invariants
//! - All state mutations flow through [`MonsterEngine`] operations.
//! - A monster's lifecycle state is derived from its hit points, never stored.
//! - Randomized operations draw only from the caller's RNG; the same seed replays the same world.
//! - Mutations on a chunk hold that chunk's region lock, taken in ascending stripe order.

pub mod engine;
pub mod monster;
pub mod population;
pub mod region;
pub mod store;
pub mod templates;
pub mod terrain;

pub use engine::{
    BatchReport, EngineConfig, EngineError, MonsterEngine, MonsterEvent, PruneReport, RemovalReason,
    SpawnConstraints,
};
pub use monster::{Attributes, Monster, MonsterState, MonsterVariant, NewMonster, SpawnInfo};
pub use population::{BiomeSpawnReport, DensityReport, DensityTargets, PopulationPlanner};
pub use region::{RegionGuard, RegionLocks};
pub use store::{InMemoryMonsterStore, MonsterStore, StoreError};
pub use terrain::{TerrainLookup, TileGrid, is_water_biome};
