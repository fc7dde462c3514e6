use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use glam::IVec2;
use mudworld_common::{Direction, MonsterId, chunk_of, distance};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::monster::Monster;
use crate::region::{DEFAULT_STRIPES, RegionGuard, RegionLocks};
use crate::store::{MonsterStore, StoreError};
use crate::templates::{pick_kind_for_biome, roll_monster, template_for};
use crate::terrain::{TerrainLookup, is_water_biome};

/// Errors from lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("monster {0} not found or not alive")]
    NotFound(MonsterId),
    #[error("invalid constraint: {field} = {value}")]
    InvalidConstraint { field: &'static str, value: String },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Engine-wide defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spawn radius, in tiles, when a call does not give one.
    pub default_spawn_radius: f64,
    /// Group-size cap when a call does not give one.
    pub default_max_group_size: u32,
    /// Number of region lock stripes. More stripes, fewer false conflicts between chunks.
    pub lock_stripes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_spawn_radius: 5.0,
            default_max_group_size: 3,
            lock_stripes: DEFAULT_STRIPES,
        }
    }
}

impl EngineConfig {
    /// Reject defaults that spawning could not honor.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_radius(self.default_spawn_radius)?;
        if self.default_max_group_size == 0 {
            return Err(EngineError::InvalidConstraint {
                field: "default_max_group_size",
                value: "0".into(),
            });
        }
        if self.lock_stripes == 0 {
            return Err(EngineError::InvalidConstraint {
                field: "lock_stripes",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn check_radius(radius: f64) -> Result<f64, EngineError> {
    if radius > 0.0 && radius.is_finite() {
        Ok(radius)
    } else {
        Err(EngineError::InvalidConstraint {
            field: "radius",
            value: radius.to_string(),
        })
    }
}

/// Per-call limits for [`MonsterEngine::spawn_monsters_in_area`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConstraints {
    pub radius: Option<f64>,
    pub max_group_size: Option<u32>,
}

/// Why a monster left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalReason {
    Dead,
    Pruned,
}

/// An event record produced by every mutation the engine performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MonsterEvent {
    Spawned { id: MonsterId, kind: String, pos: IVec2 },
    Moved { id: MonsterId, from: IVec2, to: IVec2 },
    /// Target tile was impassable; only the move clock advanced.
    Stayed { id: MonsterId, pos: IVec2 },
    Damaged { id: MonsterId, amount: u32, hp: u32 },
    Died { id: MonsterId, pos: IVec2 },
    Removed { id: MonsterId, reason: RemovalReason },
}

/// Outcome of a batch removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub removed: usize,
    /// Items the store refused to delete. They are still in the world.
    pub failed: usize,
}

/// Outcome of a prune sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub evaluated: usize,
    pub removed: usize,
    pub failed: usize,
    /// Monsters never looked at because the deadline passed.
    pub skipped: usize,
    pub completed: bool,
}

/// Owns the monster population: spawn, move, damage, death cleanup, pruning.
///
/// All operations take `&self`; conflicting mutations on the same chunk are
/// serialized through [`RegionLocks`]. Randomized operations draw from the
/// RNG the caller passes in, so a seeded RNG replays identically.
pub struct MonsterEngine<S> {
    store: S,
    terrain: Option<Arc<dyn TerrainLookup>>,
    config: EngineConfig,
    locks: RegionLocks,
    tick: AtomicU64,
    event_log: Mutex<Vec<MonsterEvent>>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for MonsterEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonsterEngine")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("has_terrain", &self.terrain.is_some())
            .field("tick", &self.tick.load(Ordering::Acquire))
            .finish()
    }
}

fn offset_pos(pos: IVec2, step: IVec2) -> IVec2 {
    IVec2::new(pos.x.saturating_add(step.x), pos.y.saturating_add(step.y))
}

fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl<S: MonsterStore> MonsterEngine<S> {
    /// Build an engine over `store`. Fails if `config` does not validate.
    pub fn new(store: S, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let locks = RegionLocks::new(config.lock_stripes);
        Ok(Self {
            store,
            terrain: None,
            config,
            locks,
            tick: AtomicU64::new(0),
            event_log: Mutex::new(Vec::new()),
        })
    }

    /// Attach a terrain source. Without one, every tile is walkable and biome-less.
    pub fn with_terrain(mut self, terrain: Arc<dyn TerrainLookup>) -> Self {
        self.terrain = Some(terrain);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn terrain(&self) -> Option<&Arc<dyn TerrainLookup>> {
        self.terrain.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Advance the simulation clock. Returns the new tick.
    pub fn advance_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Copy of the pending event log.
    pub fn events(&self) -> Vec<MonsterEvent> {
        self.event_log.lock().clone()
    }

    /// Drain and return the event log.
    pub fn drain_events(&self) -> Vec<MonsterEvent> {
        std::mem::take(&mut *self.event_log.lock())
    }

    fn log(&self, event: MonsterEvent) {
        self.event_log.lock().push(event);
    }

    // --- Queries ---

    /// A monster by id, dead or alive.
    pub fn get_monster(&self, id: MonsterId) -> Result<Monster, EngineError> {
        self.store.get(id)?.ok_or(EngineError::NotFound(id))
    }

    /// All living monsters.
    pub fn all_monsters(&self) -> Result<Vec<Monster>, EngineError> {
        Ok(self.store.all()?.into_iter().filter(Monster::is_alive).collect())
    }

    pub fn monsters_at_location(&self, pos: IVec2) -> Result<Vec<Monster>, EngineError> {
        Ok(self.store.at_location(pos)?)
    }

    pub fn monsters_in_bounds(&self, min: IVec2, max: IVec2) -> Result<Vec<Monster>, EngineError> {
        Ok(self.store.in_bounds(min, max)?)
    }

    // --- Spawning ---

    /// Spawn a group of monsters around `center`.
    ///
    /// Radius precedence: `radius`, then `constraints.radius`, then the engine
    /// default. At most `max_group_size` monsters are created; fewer when
    /// candidate tiles turn out to be water. Explicit non-positive limits are
    /// rejected rather than clamped.
    ///
    /// Creation is not transactional: if the store fails partway through a
    /// group, the error is returned and the monsters created before it stay in
    /// the store, each with its `Spawned` event already logged.
    pub fn spawn_monsters_in_area<R: Rng + ?Sized>(
        &self,
        center: IVec2,
        radius: Option<f64>,
        constraints: Option<&SpawnConstraints>,
        rng: &mut R,
    ) -> Result<Vec<Monster>, EngineError> {
        let constraints = constraints.copied().unwrap_or_default();
        let radius = check_radius(
            radius
                .or(constraints.radius)
                .unwrap_or(self.config.default_spawn_radius),
        )?;
        let cap = match constraints.max_group_size {
            Some(0) => {
                return Err(EngineError::InvalidConstraint {
                    field: "max_group_size",
                    value: "0".into(),
                });
            }
            Some(n) => n,
            None => self.config.default_max_group_size.max(1),
        };

        let _span = tracing::info_span!("spawn_area", x = center.x, y = center.y, radius, cap).entered();
        let reach = radius.floor() as i64;
        let min = IVec2::new(
            saturate((center.x as i64).saturating_sub(reach)),
            saturate((center.y as i64).saturating_sub(reach)),
        );
        let max = IVec2::new(
            saturate((center.x as i64).saturating_add(reach)),
            saturate((center.y as i64).saturating_add(reach)),
        );
        let _region = self.locks.lock_area(min, max);

        let attempts = rng.gen_range(1..=cap);
        let tick = self.tick();
        let mut spawned = Vec::new();
        for _ in 0..attempts {
            let pos = sample_in_disc(center, radius, rng);
            let tile = self.terrain.as_ref().and_then(|t| t.tile_at(pos));
            let (biome_id, biome_name) = match &tile {
                Some(t) if is_water_biome(&t.biome_name) => {
                    tracing::debug!(x = pos.x, y = pos.y, "skipping water tile");
                    continue;
                }
                Some(t) => (t.biome_id, t.biome_name.as_str()),
                None => (0, "unknown"),
            };

            let kind = pick_kind_for_biome(biome_name, rng);
            let new = roll_monster(template_for(kind), pos, biome_id, biome_name, tick, rng);
            let monster = self.store.create(new)?;
            tracing::debug!(id = %monster.id, kind = %monster.kind, x = pos.x, y = pos.y, "monster spawned");
            self.log(MonsterEvent::Spawned {
                id: monster.id,
                kind: monster.kind.clone(),
                pos,
            });
            spawned.push(monster);
        }

        tracing::info!(spawned = spawned.len(), attempts, "spawn complete");
        Ok(spawned)
    }

    // --- Mutation ---

    /// Lock the chunks of a monster's position and of `pos + step`, then re-read it.
    ///
    /// Retries if the monster moved between the first read and the lock.
    fn lock_monster(&self, id: MonsterId, step: IVec2) -> Result<(RegionGuard<'_>, Monster), EngineError> {
        loop {
            let seen = self.get_monster(id)?;
            let target = offset_pos(seen.pos, step);
            let guard = self
                .locks
                .lock_many([seen.chunk(), chunk_of(target.x, target.y)]);
            let fresh = self.get_monster(id)?;
            if fresh.pos == seen.pos {
                return Ok((guard, fresh));
            }
            drop(guard);
        }
    }

    /// Step a living monster one tile in a random cardinal direction.
    ///
    /// If the target tile is water the monster stays put, but its move clock
    /// still advances.
    pub fn move_monster<R: Rng + ?Sized>(&self, id: MonsterId, rng: &mut R) -> Result<Monster, EngineError> {
        let dir = Direction::CARDINALS[rng.gen_range(0..Direction::CARDINALS.len())];
        let (_region, mut monster) = self.lock_monster(id, dir.offset())?;
        if !monster.is_alive() {
            return Err(EngineError::NotFound(id));
        }

        let from = monster.pos;
        let to = offset_pos(from, dir.offset());
        let blocked = self
            .terrain
            .as_ref()
            .and_then(|t| t.tile_at(to))
            .is_some_and(|t| is_water_biome(&t.biome_name));

        monster.last_move_tick = self.tick();
        if blocked {
            self.store.update(&monster)?;
            tracing::debug!(%id, %dir, "move blocked by water");
            self.log(MonsterEvent::Stayed { id, pos: from });
        } else {
            monster.pos = to;
            self.store.update(&monster)?;
            tracing::debug!(%id, %dir, x = to.x, y = to.y, "monster moved");
            self.log(MonsterEvent::Moved { id, from, to });
        }
        Ok(monster)
    }

    /// Apply `damage` hit points, stopping at zero.
    ///
    /// Damaging an already dead monster is a no-op that returns it unchanged.
    pub fn damage_monster(&self, id: MonsterId, damage: u32) -> Result<Monster, EngineError> {
        let (_region, mut monster) = self.lock_monster(id, IVec2::ZERO)?;
        if !monster.is_alive() {
            return Ok(monster);
        }

        let dealt = monster.take_damage(damage);
        self.store.update(&monster)?;
        self.log(MonsterEvent::Damaged {
            id,
            amount: dealt,
            hp: monster.hp,
        });
        tracing::debug!(%id, dealt, hp = monster.hp, "monster damaged");
        if !monster.is_alive() {
            tracing::info!(%id, name = %monster.name, "monster died");
            self.log(MonsterEvent::Died { id, pos: monster.pos });
        }
        Ok(monster)
    }

    // --- Batch removal ---

    /// Remove one monster under its region lock if `still_eligible` holds for the fresh record.
    ///
    /// `Ok(true)` removed, `Ok(false)` gone or no longer eligible.
    fn remove_if(
        &self,
        seen: &Monster,
        reason: RemovalReason,
        still_eligible: impl Fn(&Monster) -> bool,
    ) -> Result<bool, StoreError> {
        let _region = self.locks.lock(seen.chunk());
        let fresh = match self.store.get(seen.id)? {
            Some(m) if m.chunk() == seen.chunk() && still_eligible(&m) => m,
            // Moved to another chunk or changed state since the sweep began.
            _ => return Ok(false),
        };
        let removed = self.store.delete(fresh.id)?;
        if removed {
            self.log(MonsterEvent::Removed { id: fresh.id, reason });
        }
        Ok(removed)
    }

    /// Remove every dead monster. Idempotent.
    ///
    /// Store failures on individual monsters are counted, not propagated.
    pub fn cleanup_dead_monsters(&self) -> Result<BatchReport, EngineError> {
        let _span = tracing::info_span!("cleanup_dead").entered();
        let dead: Vec<Monster> = self.store.all()?.into_iter().filter(|m| !m.is_alive()).collect();

        let mut report = BatchReport::default();
        for monster in &dead {
            match self.remove_if(monster, RemovalReason::Dead, |m| !m.is_alive()) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(id = %monster.id, error = %e, "failed to remove dead monster");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(removed = report.removed, failed = report.failed, "dead monsters cleaned up");
        Ok(report)
    }

    /// Remove monsters whose nearest player is more than `max_distance` away.
    ///
    /// Monsters are evaluated one at a time; once `deadline` passes the sweep
    /// stops and reports what it got through. With no players at all nothing
    /// is removed.
    pub fn prune_monsters_far_from_players(
        &self,
        players: &[IVec2],
        max_distance: f64,
        deadline: Option<Instant>,
    ) -> Result<PruneReport, EngineError> {
        if max_distance.is_nan() || max_distance < 0.0 {
            return Err(EngineError::InvalidConstraint {
                field: "max_distance",
                value: max_distance.to_string(),
            });
        }
        let _span = tracing::info_span!("prune", players = players.len(), max_distance).entered();

        let monsters = self.store.all()?;
        let mut report = PruneReport {
            completed: true,
            ..PruneReport::default()
        };
        if players.is_empty() {
            tracing::warn!(monsters = monsters.len(), "prune requested with no players; keeping all monsters");
            report.skipped = monsters.len();
            return Ok(report);
        }

        let too_far = |m: &Monster| nearest_player_distance(m.pos, players) > max_distance;
        for (i, monster) in monsters.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                report.skipped = monsters.len() - i;
                report.completed = false;
                tracing::warn!(evaluated = report.evaluated, skipped = report.skipped, "prune hit deadline");
                break;
            }
            report.evaluated += 1;
            if !too_far(monster) {
                continue;
            }
            match self.remove_if(monster, RemovalReason::Pruned, too_far) {
                Ok(true) => report.removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(id = %monster.id, error = %e, "failed to prune monster");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            evaluated = report.evaluated,
            removed = report.removed,
            failed = report.failed,
            "prune complete"
        );
        Ok(report)
    }
}

/// Distance to the closest player. Infinite with no players.
fn nearest_player_distance(pos: IVec2, players: &[IVec2]) -> f64 {
    players
        .iter()
        .map(|p| distance(pos, *p))
        .fold(f64::INFINITY, f64::min)
}

/// Uniform tile inside the disc of `radius` around `center`.
///
/// Rejection sampling over the bounding square; the center always qualifies,
/// so the loop ends quickly.
fn sample_in_disc<R: Rng + ?Sized>(center: IVec2, radius: f64, rng: &mut R) -> IVec2 {
    let reach = radius.floor() as i64;
    loop {
        let dx = rng.gen_range(-reach..=reach);
        let dy = rng.gen_range(-reach..=reach);
        if (dx as f64).hypot(dy as f64) <= radius {
            return IVec2::new(
                saturate((center.x as i64).saturating_add(dx)),
                saturate((center.y as i64).saturating_add(dy)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMonsterStore;
    use crate::store::test_support::new_monster;
    use crate::terrain::TileGrid;
    use mudworld_common::Tile;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn engine() -> MonsterEngine<InMemoryMonsterStore> {
        MonsterEngine::new(InMemoryMonsterStore::new(), EngineConfig::default()).unwrap()
    }

    fn rng(seed: u64) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(seed)
    }

    fn place(engine: &MonsterEngine<InMemoryMonsterStore>, x: i32, y: i32, hp: u32) -> MonsterId {
        engine.store().create(new_monster(x, y, hp)).unwrap().id
    }

    /// Store that refuses to delete selected ids and stops creating after a quota.
    struct FlakyStore {
        inner: InMemoryMonsterStore,
        refuse: HashSet<MonsterId>,
        creates_left: AtomicUsize,
    }

    impl FlakyStore {
        fn new(refuse: &[MonsterId], creates: usize) -> Self {
            Self {
                inner: InMemoryMonsterStore::new(),
                refuse: refuse.iter().copied().collect(),
                creates_left: AtomicUsize::new(creates),
            }
        }
    }

    impl MonsterStore for FlakyStore {
        fn create(&self, m: crate::monster::NewMonster) -> Result<Monster, StoreError> {
            let granted = self
                .creates_left
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
            if granted.is_err() {
                return Err(StoreError::Unavailable("create refused".into()));
            }
            self.inner.create(m)
        }
        fn get(&self, id: MonsterId) -> Result<Option<Monster>, StoreError> {
            self.inner.get(id)
        }
        fn update(&self, m: &Monster) -> Result<(), StoreError> {
            self.inner.update(m)
        }
        fn delete(&self, id: MonsterId) -> Result<bool, StoreError> {
            if self.refuse.contains(&id) {
                return Err(StoreError::Unavailable("delete refused".into()));
            }
            self.inner.delete(id)
        }
        fn all(&self) -> Result<Vec<Monster>, StoreError> {
            self.inner.all()
        }
        fn at_location(&self, pos: IVec2) -> Result<Vec<Monster>, StoreError> {
            self.inner.at_location(pos)
        }
        fn in_bounds(&self, min: IVec2, max: IVec2) -> Result<Vec<Monster>, StoreError> {
            self.inner.in_bounds(min, max)
        }
    }

    #[test]
    fn spawn_respects_cap_and_radius() {
        let e = engine();
        let mut r = rng(1);
        let constraints = SpawnConstraints {
            radius: None,
            max_group_size: Some(4),
        };
        for _ in 0..50 {
            let group = e
                .spawn_monsters_in_area(IVec2::new(100, -40), Some(3.0), Some(&constraints), &mut r)
                .unwrap();
            assert!((1..=4).contains(&group.len()));
            for m in &group {
                assert!(distance(m.pos, IVec2::new(100, -40)) <= 3.0);
                assert!(m.is_alive());
            }
        }
    }

    #[test]
    fn spawn_uses_defaults_when_unconstrained() {
        let e = engine();
        let mut r = rng(2);
        for _ in 0..30 {
            let group = e.spawn_monsters_in_area(IVec2::ZERO, None, None, &mut r).unwrap();
            assert!(group.len() <= 3);
            for m in &group {
                assert!(distance(m.pos, IVec2::ZERO) <= 5.0);
                assert_eq!(m.spawn.biome_name, "unknown");
            }
        }
    }

    #[test]
    fn spawn_rejects_non_positive_limits() {
        let e = engine();
        let mut r = rng(3);
        for bad in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let err = e.spawn_monsters_in_area(IVec2::ZERO, Some(bad), None, &mut r).unwrap_err();
            assert!(matches!(err, EngineError::InvalidConstraint { field: "radius", .. }));
        }
        let zero_cap = SpawnConstraints {
            radius: None,
            max_group_size: Some(0),
        };
        let err = e
            .spawn_monsters_in_area(IVec2::ZERO, None, Some(&zero_cap), &mut r)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConstraint { field: "max_group_size", .. }));
        assert!(e.store().is_empty());
    }

    #[test]
    fn spawn_skips_water_and_uses_biome() {
        let mut grid = TileGrid::new();
        for x in -3..=3 {
            for y in -3..=3 {
                let biome = if x < 0 { "Ocean" } else { "desert" };
                grid.insert(Tile::new(x, y, biome).with_biome_id(4));
            }
        }
        let e = engine().with_terrain(Arc::new(grid));
        let mut r = rng(4);
        for _ in 0..40 {
            for m in e.spawn_monsters_in_area(IVec2::ZERO, Some(3.0), None, &mut r).unwrap() {
                assert!(m.pos.x >= 0);
                assert_eq!(m.spawn.biome_name, "desert");
                assert_eq!(m.spawn.biome_id, 4);
            }
        }
    }

    #[test]
    fn spawn_is_reproducible_with_same_seed() {
        let a = engine();
        let b = engine();
        let ga = a.spawn_monsters_in_area(IVec2::new(7, 7), None, None, &mut rng(9)).unwrap();
        let gb = b.spawn_monsters_in_area(IVec2::new(7, 7), None, None, &mut rng(9)).unwrap();
        assert_eq!(ga, gb);
    }

    #[test]
    fn move_steps_one_cardinal_tile() {
        let e = engine();
        let id = place(&e, 10, 10, 20);
        e.advance_tick();
        let moved = e.move_monster(id, &mut rng(5)).unwrap();
        let delta = moved.pos - IVec2::new(10, 10);
        assert_eq!(delta.x.abs() + delta.y.abs(), 1);
        assert_eq!(moved.last_move_tick, 1);
        assert_eq!(e.get_monster(id).unwrap().pos, moved.pos);
        assert!(matches!(e.events().last(), Some(MonsterEvent::Moved { .. })));
    }

    #[test]
    fn move_into_water_stays_put() {
        let grid: TileGrid = [
            Tile::new(0, 1, "lake"),
            Tile::new(0, -1, "lake"),
            Tile::new(1, 0, "river"),
            Tile::new(-1, 0, "ocean"),
        ]
        .into_iter()
        .collect();
        let e = engine().with_terrain(Arc::new(grid));
        let id = place(&e, 0, 0, 20);
        let mut r = rng(6);
        for _ in 0..10 {
            assert_eq!(e.move_monster(id, &mut r).unwrap().pos, IVec2::ZERO);
        }
        assert!(e.events().iter().all(|ev| matches!(ev, MonsterEvent::Stayed { .. })));
    }

    #[test]
    fn move_unknown_or_dead_is_not_found() {
        let e = engine();
        let mut r = rng(7);
        assert!(matches!(e.move_monster(MonsterId(99), &mut r), Err(EngineError::NotFound(MonsterId(99)))));
        let id = place(&e, 0, 0, 5);
        e.damage_monster(id, 5).unwrap();
        assert!(matches!(e.move_monster(id, &mut r), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn damage_floors_at_zero_and_logs_death() {
        let e = engine();
        let id = place(&e, 0, 0, 10);
        assert_eq!(e.damage_monster(id, 4).unwrap().hp, 6);
        let dead = e.damage_monster(id, 50).unwrap();
        assert_eq!(dead.hp, 0);
        assert!(!dead.is_alive());
        assert_eq!(e.damage_monster(id, 1).unwrap().hp, 0);

        let events = e.drain_events();
        assert_eq!(
            events,
            vec![
                MonsterEvent::Damaged { id, amount: 4, hp: 6 },
                MonsterEvent::Damaged { id, amount: 6, hp: 0 },
                MonsterEvent::Died { id, pos: IVec2::ZERO },
            ]
        );
        assert!(e.events().is_empty());
    }

    #[test]
    fn damage_unknown_is_not_found() {
        let e = engine();
        assert!(matches!(e.damage_monster(MonsterId(1), 3), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn concurrent_damage_loses_no_updates() {
        let e = Arc::new(engine());
        let id = place(&e, 25, 25, 1000);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let e = Arc::clone(&e);
                thread::spawn(move || {
                    for _ in 0..50 {
                        e.damage_monster(id, 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(e.get_monster(id).unwrap().hp, 800);
    }

    #[test]
    fn damage_racing_moves_across_chunk_edge_loses_no_updates() {
        let e = Arc::new(engine());
        // x = 49 is the last column of chunk 0, so eastward steps change chunk.
        let id = place(&e, 49, 0, 10_000);
        let mover = {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                let mut r = rng(31);
                for _ in 0..200 {
                    e.move_monster(id, &mut r).unwrap();
                }
            })
        };
        let hitters: Vec<_> = (0..2)
            .map(|_| {
                let e = Arc::clone(&e);
                thread::spawn(move || {
                    for _ in 0..100 {
                        e.damage_monster(id, 2).unwrap();
                    }
                })
            })
            .collect();
        mover.join().unwrap();
        for h in hitters {
            h.join().unwrap();
        }

        let monster = e.get_monster(id).unwrap();
        assert_eq!(monster.hp, 10_000 - 400);
        let moves = e
            .events()
            .iter()
            .filter(|ev| matches!(ev, MonsterEvent::Moved { .. }))
            .count();
        assert_eq!(moves, 200);
    }

    #[test]
    fn spawn_and_prune_on_one_area_stay_consistent() {
        let e = Arc::new(engine());
        let spawner = {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                let mut r = rng(41);
                let mut created = 0;
                for _ in 0..60 {
                    created += e
                        .spawn_monsters_in_area(IVec2::new(10, 10), Some(5.0), None, &mut r)
                        .unwrap()
                        .len();
                }
                created
            })
        };
        let pruner = {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                let far_player = [IVec2::new(5_000, 5_000)];
                let mut removed = 0;
                for _ in 0..60 {
                    let report = e.prune_monsters_far_from_players(&far_player, 10.0, None).unwrap();
                    assert_eq!(report.failed, 0);
                    removed += report.removed;
                }
                removed
            })
        };
        let created = spawner.join().unwrap();
        let removed = pruner.join().unwrap();

        assert_eq!(e.store().len(), created - removed);
        let events = e.events();
        let spawned_events = events
            .iter()
            .filter(|ev| matches!(ev, MonsterEvent::Spawned { .. }))
            .count();
        let removed_events = events
            .iter()
            .filter(|ev| matches!(ev, MonsterEvent::Removed { reason: RemovalReason::Pruned, .. }))
            .count();
        assert_eq!(spawned_events, created);
        assert_eq!(removed_events, removed);
    }

    #[test]
    fn invalid_defaults_are_rejected_at_construction() {
        let bad = [
            EngineConfig {
                default_spawn_radius: -1.0,
                ..EngineConfig::default()
            },
            EngineConfig {
                default_spawn_radius: f64::NAN,
                ..EngineConfig::default()
            },
            EngineConfig {
                default_max_group_size: 0,
                ..EngineConfig::default()
            },
            EngineConfig {
                lock_stripes: 0,
                ..EngineConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err());
            let err = MonsterEngine::new(InMemoryMonsterStore::new(), config).unwrap_err();
            assert!(matches!(err, EngineError::InvalidConstraint { .. }));
        }
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn failed_create_keeps_earlier_group_members() {
        let mut partial = None;
        for seed in 0..64 {
            let e = MonsterEngine::new(FlakyStore::new(&[], 1), EngineConfig::default()).unwrap();
            let result = e.spawn_monsters_in_area(IVec2::ZERO, None, None, &mut rng(seed));
            if result.is_err() {
                partial = Some(e);
                break;
            }
        }
        let e = partial.expect("some seed rolls a group larger than one");
        assert_eq!(e.store().inner.len(), 1);
        let spawned: Vec<_> = e
            .events()
            .into_iter()
            .filter(|ev| matches!(ev, MonsterEvent::Spawned { .. }))
            .collect();
        assert_eq!(spawned.len(), 1);
    }

    #[test]
    fn cleanup_removes_only_dead_and_is_idempotent() {
        let e = engine();
        let alive = place(&e, 0, 0, 10);
        let dead_a = place(&e, 60, 0, 10);
        let dead_b = place(&e, -60, 0, 10);
        e.damage_monster(dead_a, 10).unwrap();
        e.damage_monster(dead_b, 99).unwrap();

        let report = e.cleanup_dead_monsters().unwrap();
        assert_eq!(report, BatchReport { removed: 2, failed: 0 });
        assert!(e.get_monster(alive).is_ok());
        assert!(matches!(e.get_monster(dead_a), Err(EngineError::NotFound(_))));

        assert_eq!(e.cleanup_dead_monsters().unwrap(), BatchReport::default());
    }

    #[test]
    fn cleanup_counts_store_failures() {
        let store = FlakyStore::new(&[MonsterId(2)], usize::MAX);
        let e = MonsterEngine::new(store, EngineConfig::default()).unwrap();
        for x in 0..3 {
            let id = e.store().create(new_monster(x, 0, 1)).unwrap().id;
            e.damage_monster(id, 1).unwrap();
        }
        let report = e.cleanup_dead_monsters().unwrap();
        assert_eq!(report, BatchReport { removed: 2, failed: 1 });
        assert!(e.get_monster(MonsterId(2)).is_ok());
    }

    #[test]
    fn prune_uses_nearest_player() {
        let e = engine();
        let near_second = place(&e, 100, 0, 10);
        let far = place(&e, 50, 50, 10);
        let near_first = place(&e, 2, 2, 10);
        let players = [IVec2::ZERO, IVec2::new(98, 0)];

        let report = e.prune_monsters_far_from_players(&players, 20.0, None).unwrap();
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.removed, 1);
        assert!(report.completed);
        assert!(e.get_monster(near_first).is_ok());
        assert!(e.get_monster(near_second).is_ok());
        assert!(matches!(e.get_monster(far), Err(EngineError::NotFound(_))));
        assert!(e
            .events()
            .contains(&MonsterEvent::Removed { id: far, reason: RemovalReason::Pruned }));
    }

    #[test]
    fn prune_with_no_players_keeps_everything() {
        let e = engine();
        place(&e, 0, 0, 10);
        place(&e, 500, 500, 10);
        let report = e.prune_monsters_far_from_players(&[], 10.0, None).unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(e.store().len(), 2);
    }

    #[test]
    fn prune_past_deadline_reports_partial_progress() {
        let e = engine();
        for i in 0..5 {
            place(&e, 1000 + i, 0, 10);
        }
        let past = Instant::now() - Duration::from_millis(1);
        let report = e
            .prune_monsters_far_from_players(&[IVec2::ZERO], 5.0, Some(past))
            .unwrap();
        assert!(!report.completed);
        assert_eq!(report.evaluated, 0);
        assert_eq!(report.skipped, 5);
        assert_eq!(e.store().len(), 5);
    }

    #[test]
    fn prune_rejects_bad_distance() {
        let e = engine();
        assert!(matches!(
            e.prune_monsters_far_from_players(&[IVec2::ZERO], f64::NAN, None),
            Err(EngineError::InvalidConstraint { field: "max_distance", .. })
        ));
        assert!(e.prune_monsters_far_from_players(&[IVec2::ZERO], -1.0, None).is_err());
    }

    #[test]
    fn queries_filter_dead() {
        let e = engine();
        let a = place(&e, 3, 3, 10);
        let b = place(&e, 3, 3, 10);
        e.damage_monster(b, 10).unwrap();
        assert_eq!(e.all_monsters().unwrap().len(), 1);
        assert_eq!(e.monsters_at_location(IVec2::new(3, 3)).unwrap()[0].id, a);
        assert_eq!(e.monsters_in_bounds(IVec2::ZERO, IVec2::new(5, 5)).unwrap().len(), 1);
        assert!(e.get_monster(b).is_ok());
    }

    #[test]
    fn sampled_positions_stay_in_disc() {
        let mut r = rng(12);
        for _ in 0..1000 {
            let p = sample_in_disc(IVec2::new(-5, 5), 2.5, &mut r);
            assert!(distance(p, IVec2::new(-5, 5)) <= 2.5);
        }
        assert_eq!(sample_in_disc(IVec2::new(4, 4), 0.5, &mut r), IVec2::new(4, 4));
    }

    proptest! {
        #[test]
        fn spawned_groups_stay_within_radius_and_cap(
            seed in any::<u64>(),
            cx in -1_000i32..1_000,
            cy in -1_000i32..1_000,
            radius in 0.5f64..20.0,
            cap in 1u32..6,
        ) {
            let e = engine();
            let center = IVec2::new(cx, cy);
            let constraints = SpawnConstraints { radius: None, max_group_size: Some(cap) };
            let group = e
                .spawn_monsters_in_area(center, Some(radius), Some(&constraints), &mut rng(seed))
                .unwrap();
            prop_assert!(!group.is_empty());
            prop_assert!(group.len() <= cap as usize);
            for m in &group {
                prop_assert!(distance(m.pos, center) <= radius);
            }
        }

        #[test]
        fn prune_keeps_exactly_the_monsters_near_a_player(
            monsters in prop::collection::vec((-200i32..200, -200i32..200), 0..30),
            players in prop::collection::vec((-200i32..200, -200i32..200), 1..4),
            max_distance in 0.0f64..150.0,
        ) {
            let e = engine();
            let players: Vec<IVec2> = players.into_iter().map(|(x, y)| IVec2::new(x, y)).collect();
            let ids: Vec<(MonsterId, IVec2)> = monsters
                .into_iter()
                .map(|(x, y)| (place(&e, x, y, 10), IVec2::new(x, y)))
                .collect();

            let report = e.prune_monsters_far_from_players(&players, max_distance, None).unwrap();
            prop_assert!(report.completed);
            prop_assert_eq!(report.evaluated, ids.len());
            for (id, pos) in ids {
                let near = nearest_player_distance(pos, &players) <= max_distance;
                prop_assert_eq!(e.get_monster(id).is_ok(), near);
            }
        }
    }
}
