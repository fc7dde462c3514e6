//! Backing-store interface for monsters, plus an in-memory implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::IVec2;
use mudworld_common::MonsterId;
use parking_lot::RwLock;

use crate::monster::{Monster, NewMonster};

/// Errors reported by a [`MonsterStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("monster {0} does not exist in the store")]
    Missing(MonsterId),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// CRUD access to persisted monsters. The persistence format is the store's business.
///
/// Queries return owned snapshots; writes replace the whole record.
pub trait MonsterStore: Send + Sync {
    fn create(&self, monster: NewMonster) -> Result<Monster, StoreError>;
    fn get(&self, id: MonsterId) -> Result<Option<Monster>, StoreError>;
    fn update(&self, monster: &Monster) -> Result<(), StoreError>;
    /// Remove a monster. Returns whether it existed.
    fn delete(&self, id: MonsterId) -> Result<bool, StoreError>;
    /// Every stored monster, dead or alive, in id order.
    fn all(&self) -> Result<Vec<Monster>, StoreError>;
    /// Alive monsters standing exactly on `pos`.
    fn at_location(&self, pos: IVec2) -> Result<Vec<Monster>, StoreError>;
    /// Alive monsters inside the inclusive rectangle `[min, max]`.
    fn in_bounds(&self, min: IVec2, max: IVec2) -> Result<Vec<Monster>, StoreError>;
}

/// Process-local monster store. Ids are sequential from 1.
///
/// Uses BTreeMap so `all()` is in id order on every platform.
#[derive(Debug)]
pub struct InMemoryMonsterStore {
    monsters: RwLock<BTreeMap<MonsterId, Monster>>,
    next_id: AtomicU64,
}

impl Default for InMemoryMonsterStore {
    fn default() -> Self {
        Self {
            monsters: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryMonsterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.monsters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.read().is_empty()
    }
}

fn in_rect(pos: IVec2, min: IVec2, max: IVec2) -> bool {
    pos.x >= min.x && pos.x <= max.x && pos.y >= min.y && pos.y <= max.y
}

impl MonsterStore for InMemoryMonsterStore {
    fn create(&self, monster: NewMonster) -> Result<Monster, StoreError> {
        let id = MonsterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let monster = Monster::from_new(id, monster);
        self.monsters.write().insert(id, monster.clone());
        Ok(monster)
    }

    fn get(&self, id: MonsterId) -> Result<Option<Monster>, StoreError> {
        Ok(self.monsters.read().get(&id).cloned())
    }

    fn update(&self, monster: &Monster) -> Result<(), StoreError> {
        match self.monsters.write().get_mut(&monster.id) {
            Some(slot) => {
                *slot = monster.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(monster.id)),
        }
    }

    fn delete(&self, id: MonsterId) -> Result<bool, StoreError> {
        Ok(self.monsters.write().remove(&id).is_some())
    }

    fn all(&self) -> Result<Vec<Monster>, StoreError> {
        Ok(self.monsters.read().values().cloned().collect())
    }

    fn at_location(&self, pos: IVec2) -> Result<Vec<Monster>, StoreError> {
        Ok(self
            .monsters
            .read()
            .values()
            .filter(|m| m.is_alive() && m.pos == pos)
            .cloned()
            .collect())
    }

    fn in_bounds(&self, min: IVec2, max: IVec2) -> Result<Vec<Monster>, StoreError> {
        Ok(self
            .monsters
            .read()
            .values()
            .filter(|m| m.is_alive() && in_rect(m.pos, min, max))
            .cloned()
            .collect())
    }
}
