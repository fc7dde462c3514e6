use glam::IVec2;
use mudworld_common::{ChunkCoord, MonsterId, chunk_of};
use mudworld_progression::DiceExpr;
use serde::{Deserialize, Serialize};

/// Core combat attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u32,
    pub agility: u32,
    pub health: u32,
}

/// Strength class rolled at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonsterVariant {
    Feeble,
    Normal,
    Fierce,
}

impl MonsterVariant {
    pub fn stat_multiplier(&self) -> f32 {
        match self {
            Self::Feeble => 0.7,
            Self::Normal => 1.0,
            Self::Fierce => 1.4,
        }
    }

    pub fn xp_multiplier(&self) -> f32 {
        match self {
            Self::Feeble => 0.6,
            Self::Normal => 1.0,
            Self::Fierce => 1.5,
        }
    }

    /// Name prefix shown to players. Normal monsters have none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Feeble => Some("Feeble"),
            Self::Normal => None,
            Self::Fierce => Some("Fierce"),
        }
    }
}

/// Where and how a monster came into the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInfo {
    pub origin: IVec2,
    pub biome_id: u32,
    pub biome_name: String,
    pub variant: MonsterVariant,
    pub tick: u64,
}

/// Lifecycle state, derived from hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonsterState {
    Active,
    Dead,
}

/// Everything needed to create a monster except its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMonster {
    pub name: String,
    pub kind: String,
    pub pos: IVec2,
    pub max_hp: u32,
    pub attributes: Attributes,
    pub damage_roll: DiceExpr,
    pub spawn: SpawnInfo,
}

/// A monster as stored in the world.
///
/// A monster is dead exactly when `hp == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub id: MonsterId,
    pub name: String,
    /// Template key, e.g. `"wolf"`.
    pub kind: String,
    pub pos: IVec2,
    pub hp: u32,
    pub max_hp: u32,
    pub attributes: Attributes,
    pub damage_roll: DiceExpr,
    pub spawn: SpawnInfo,
    pub last_move_tick: u64,
}

impl Monster {
    /// Materialize a freshly created monster at full health.
    pub fn from_new(id: MonsterId, new: NewMonster) -> Self {
        let tick = new.spawn.tick;
        Self {
            id,
            name: new.name,
            kind: new.kind,
            pos: new.pos,
            hp: new.max_hp,
            max_hp: new.max_hp,
            attributes: new.attributes,
            damage_roll: new.damage_roll,
            spawn: new.spawn,
            last_move_tick: tick,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn state(&self) -> MonsterState {
        if self.is_alive() {
            MonsterState::Active
        } else {
            MonsterState::Dead
        }
    }

    pub fn chunk(&self) -> ChunkCoord {
        chunk_of(self.pos.x, self.pos.y)
    }

    /// Subtract `amount` hit points, stopping at 0. Returns the damage actually dealt.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        dealt
    }

    /// XP granted for killing this monster.
    pub fn xp_reward(&self) -> u32 {
        let a = &self.attributes;
        let base = 10 + a.strength * 2 + a.health * 2 + a.agility;
        (base as f32 * self.spawn.variant.xp_multiplier()).floor() as u32
    }
}
