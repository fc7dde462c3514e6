//! Chunk-scoped mutual exclusion for monster mutations.

use std::hash::{DefaultHasher, Hash, Hasher};

use glam::IVec2;
use mudworld_common::{ChunkCoord, chunk_of, chunks_covering};
use parking_lot::{Mutex, MutexGuard};

/// Default number of lock stripes.
pub const DEFAULT_STRIPES: usize = 64;

/// Striped locks keyed by chunk.
///
/// Two chunks may share a stripe, which only costs extra serialization. Locks
/// are always taken in ascending stripe order, so multi-chunk acquisitions
/// cannot deadlock against each other.
#[derive(Debug)]
pub struct RegionLocks {
    stripes: Vec<Mutex<()>>,
}

/// Held stripes. Released on drop.
#[derive(Debug)]
pub struct RegionGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
    stripes: Vec<usize>,
}

impl RegionGuard<'_> {
    /// Stripe indices held by this guard, ascending.
    pub fn stripes(&self) -> &[usize] {
        &self.stripes
    }
}

impl Default for RegionLocks {
    fn default() -> Self {
        Self::new(DEFAULT_STRIPES)
    }
}

impl RegionLocks {
    pub fn new(stripes: usize) -> Self {
        let count = stripes.max(1);
        Self {
            stripes: (0..count).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    fn stripe_of(&self, chunk: ChunkCoord) -> usize {
        let mut hasher = DefaultHasher::new();
        chunk.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Lock a single chunk.
    pub fn lock(&self, chunk: ChunkCoord) -> RegionGuard<'_> {
        self.lock_many([chunk])
    }

    /// Lock every chunk in `chunks`. Blocks until all are held.
    pub fn lock_many(&self, chunks: impl IntoIterator<Item = ChunkCoord>) -> RegionGuard<'_> {
        let mut stripes: Vec<usize> = chunks.into_iter().map(|c| self.stripe_of(c)).collect();
        stripes.sort_unstable();
        stripes.dedup();
        let guards = stripes.iter().map(|&i| self.stripes[i].lock()).collect();
        RegionGuard {
            _guards: guards,
            stripes,
        }
    }

    /// Lock every chunk touching the inclusive tile rectangle `[min, max]`.
    ///
    /// Areas spanning more chunks than there are stripes take every stripe.
    pub fn lock_area(&self, min: IVec2, max: IVec2) -> RegionGuard<'_> {
        let lo = chunk_of(min.x, min.y);
        let hi = chunk_of(max.x, max.y);
        let span = (hi.x as i64 - lo.x as i64 + 1).max(0) * (hi.y as i64 - lo.y as i64 + 1).max(0);
        if span > self.stripes.len() as i64 {
            return self.lock_all();
        }
        self.lock_many(chunks_covering(min, max))
    }

    /// Lock every stripe, excluding all other region holders.
    pub fn lock_all(&self) -> RegionGuard<'_> {
        let stripes: Vec<usize> = (0..self.stripes.len()).collect();
        let guards = self.stripes.iter().map(|m| m.lock()).collect();
        RegionGuard {
            _guards: guards,
            stripes,
        }
    }
}
