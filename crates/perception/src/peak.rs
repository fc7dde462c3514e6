use std::time::Instant;

use glam::IVec2;
use mudworld_common::{Direction, Peak, direction_from_center, distance};
use serde::{Deserialize, Serialize};

use crate::timing::{PEAKS_COUNT, T_PEAKS_SORT_MS, TimingSink, elapsed_ms};

/// Peaks closer than this are never reported, whatever the view distance.
pub const MIN_PEAK_DISTANCE: f64 = 3.0;

/// Errors from validating a [`PeakPolicy`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("min_distance_ratio must be finite and non-negative, got {0}")]
    BadRatio(f64),
    #[error("max_results must be at least 1")]
    NoResults,
}

/// Tuning for peak visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakPolicy {
    /// Share of the view distance below which peaks count as "underfoot".
    pub min_distance_ratio: f64,
    pub max_results: usize,
}

impl Default for PeakPolicy {
    fn default() -> Self {
        Self {
            min_distance_ratio: 0.25,
            max_results: 3,
        }
    }
}

impl PeakPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.min_distance_ratio.is_finite() || self.min_distance_ratio < 0.0 {
            return Err(PolicyError::BadRatio(self.min_distance_ratio));
        }
        if self.max_results == 0 {
            return Err(PolicyError::NoResults);
        }
        Ok(())
    }

    /// Minimum reported distance for a given view distance. Never below 3.
    pub fn min_distance(&self, view_distance: f64) -> f64 {
        let derived = view_distance * self.min_distance_ratio;
        if derived.is_nan() {
            return MIN_PEAK_DISTANCE;
        }
        derived.max(MIN_PEAK_DISTANCE)
    }
}

/// A peak the player can see, annotated relative to them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisiblePeak {
    pub pos: IVec2,
    pub height: f32,
    pub distance: f64,
    pub direction: Direction,
}

/// Picks the most prominent distant peaks around a player.
#[derive(Debug, Clone, Default)]
pub struct PeakService {
    policy: PeakPolicy,
}

impl PeakService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PeakPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &PeakPolicy {
        &self.policy
    }

    /// Highest peaks within `[min_distance, view_distance]` of `player`.
    ///
    /// Sorted by height descending, then distance ascending, then input
    /// order. At most `max_results` long. Peaks with a non-finite height are
    /// ignored. Records `tPeaksSortMs` and
    /// `peaksCount` into `timing`.
    pub fn process_visible_peaks<S: TimingSink + ?Sized>(
        &self,
        player: IVec2,
        view_distance: f64,
        peaks: &[Peak],
        timing: &mut S,
    ) -> Vec<VisiblePeak> {
        let _span = tracing::debug_span!("visible_peaks", peaks = peaks.len(), view_distance).entered();
        let min_distance = self.policy.min_distance(view_distance);

        let mut candidates: Vec<(Peak, f64)> = peaks
            .iter()
            .map(|p| (*p, distance(player, p.pos)))
            .filter(|(p, d)| p.height.is_finite() && *d <= view_distance && *d >= min_distance)
            .collect();

        let start = Instant::now();
        candidates.sort_by(|(pa, da), (pb, db)| {
            pb.height.total_cmp(&pa.height).then(da.total_cmp(db))
        });
        candidates.truncate(self.policy.max_results);
        timing.record(T_PEAKS_SORT_MS, elapsed_ms(start));

        let visible: Vec<VisiblePeak> = candidates
            .into_iter()
            .map(|(p, d)| VisiblePeak {
                pos: p.pos,
                height: p.height,
                distance: d,
                direction: direction_from_center(player, p.pos),
            })
            .collect();
        timing.record(PEAKS_COUNT, visible.len() as f64);
        tracing::trace!(visible = visible.len(), min_distance, "peak scan complete");
        visible
    }
}
