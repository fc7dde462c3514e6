//! Perception: what a player can see from where they stand.
//!
//! # Invariants
//! - Services only read the snapshots they are handed; the timing sink is the sole output side channel.
//! - Every query is total. The worst case is an empty result.
//! - Orderings are deterministic, ties broken by input order.

mod biome;
mod peak;
mod timing;
mod visibility;

pub use biome::{BiomeService, BiomeSummary, BiomeSummaryOptions};
pub use peak::{PeakPolicy, PeakService, PolicyError, VisiblePeak};
pub use timing::{
    PEAKS_COUNT, T_BIOME_SUMMARY_MS, T_FILTER_TILES_MS, T_PEAKS_SORT_MS, TILES_COUNT,
    TimingMetrics, TimingSink,
};
pub use visibility::{tiles_within_radius, visibility_radius};
