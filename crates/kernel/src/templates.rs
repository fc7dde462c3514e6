//! Monster roster and per-biome spawn tables.

use glam::IVec2;
use mudworld_progression::DiceExpr;
use rand::Rng;

use crate::monster::{Attributes, MonsterVariant, NewMonster, SpawnInfo};

/// Base stats for one kind of monster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonsterTemplate {
    pub name: &'static str,
    pub kind: &'static str,
    pub base_hp: u32,
    pub strength: u32,
    pub agility: u32,
    pub health: u32,
    pub damage_roll: DiceExpr,
    /// 1 (trivial) to 10 (deadly).
    pub difficulty: u8,
}

const fn d(count: u32, sides: u32) -> DiceExpr {
    DiceExpr {
        count,
        sides,
        bonus: 0,
    }
}

const fn t(
    name: &'static str,
    kind: &'static str,
    stats: [u32; 4],
    damage_roll: DiceExpr,
    difficulty: u8,
) -> MonsterTemplate {
    MonsterTemplate {
        name,
        kind,
        base_hp: stats[0],
        strength: stats[1],
        agility: stats[2],
        health: stats[3],
        damage_roll,
        difficulty,
    }
}

/// Kind used when a lookup misses.
pub const DEFAULT_KIND: &str = "goblin";

// stats: [base_hp, strength, agility, health]
pub const MONSTER_TEMPLATES: &[MonsterTemplate] = &[
    t("Rat", "rat", [8, 3, 14, 3], d(1, 2), 1),
    t("Stirge", "stirge", [10, 4, 16, 3], d(1, 3), 1),
    t("Giant Centipede", "giant-centipede", [12, 4, 14, 4], d(1, 3), 1),
    t("Kobold", "kobold", [18, 5, 13, 5], d(1, 4), 2),
    t("Giant Bat", "giant-bat", [16, 5, 15, 4], d(1, 4), 2),
    t("Goblin", "goblin", [25, 6, 12, 6], d(1, 6), 3),
    t("Skeleton", "skeleton", [20, 8, 10, 6], d(1, 6), 3),
    t("Bandit", "bandit", [28, 9, 11, 8], d(1, 6), 4),
    t("Slime", "slime", [28, 7, 6, 12], d(1, 6), 4),
    t("Wolf", "wolf", [30, 10, 14, 8], d(2, 4), 5),
    t("Harpy", "harpy", [33, 9, 14, 8], d(2, 4), 5),
    t("Ice Wolf", "ice-wolf", [34, 11, 13, 10], d(2, 4), 5),
    t("Wild Boar", "boar", [34, 12, 7, 10], d(1, 8), 5),
    t("Dune Stalker", "dune-stalker", [34, 10, 14, 9], d(1, 6), 5),
    t("Zombie", "zombie", [34, 10, 4, 12], d(1, 6), 5),
    t("Ooze", "ooze", [36, 9, 5, 13], d(2, 6), 5),
    t("Giant Spider", "giant-spider", [36, 10, 12, 9], d(1, 8), 5),
    t("Jaguar", "jaguar", [36, 12, 15, 9], d(1, 8), 5),
    t("Lizardfolk", "lizardfolk", [38, 12, 9, 11], d(1, 6), 6),
    t("Sand Wraith", "sand-wraith", [38, 11, 13, 10], d(1, 8), 6),
    t("Giant Scorpion", "giant-scorpion", [42, 12, 10, 11], d(1, 10), 6),
    t("Dire Wolf", "dire-wolf", [44, 13, 13, 10], d(2, 6), 7),
    t("Frost Wight", "frost-wight", [48, 13, 10, 12], d(1, 8), 7),
    t("Crocodile", "crocodile", [50, 15, 6, 12], d(1, 10), 7),
    t("Giant Python", "giant-python", [50, 16, 7, 12], d(2, 6), 7),
    t("Ogre", "ogre", [55, 17, 5, 13], d(2, 8), 8),
    t("Troll", "troll", [58, 16, 8, 14], d(2, 6), 8),
    t("Black Bear", "bear", [60, 16, 6, 14], d(2, 6), 9),
    t("Earth Golem", "earth-golem", [70, 18, 4, 16], d(2, 8), 9),
    t("Wyvern", "wyvern", [85, 19, 14, 15], d(2, 12), 10),
];

type SpawnTable = &'static [(&'static str, u32)];

const FALLBACK_TABLE: SpawnTable = &[
    ("rat", 2),
    ("goblin", 2),
    ("wolf", 2),
    ("skeleton", 1),
    ("slime", 1),
];

const BIOME_SPAWN_TABLES: &[(&str, SpawnTable)] = &[
    (
        "grassland",
        &[("rat", 2), ("giant-bat", 2), ("goblin", 3), ("wolf", 2), ("boar", 2), ("bandit", 2)],
    ),
    (
        "plains",
        &[("rat", 2), ("goblin", 3), ("wolf", 2), ("dire-wolf", 1), ("bandit", 2), ("boar", 1)],
    ),
    (
        "forest",
        &[
            ("giant-centipede", 2),
            ("wolf", 3),
            ("goblin", 2),
            ("bear", 1),
            ("giant-spider", 2),
            ("kobold", 2),
            ("troll", 1),
        ],
    ),
    (
        "taiga",
        &[("wolf", 3), ("ice-wolf", 2), ("frost-wight", 1), ("bear", 1), ("ogre", 1)],
    ),
    (
        "tundra",
        &[("ice-wolf", 3), ("frost-wight", 2), ("skeleton", 2), ("zombie", 1)],
    ),
    (
        "mountain",
        &[("skeleton", 3), ("harpy", 2), ("bear", 1), ("earth-golem", 1), ("wyvern", 1)],
    ),
    (
        "desert",
        &[("giant-scorpion", 3), ("sand-wraith", 2), ("dune-stalker", 2), ("skeleton", 1)],
    ),
    (
        "swamp",
        &[("stirge", 2), ("lizardfolk", 3), ("crocodile", 2), ("ooze", 2), ("troll", 1)],
    ),
    (
        "jungle",
        &[("giant-centipede", 2), ("jaguar", 3), ("giant-python", 2), ("giant-spider", 2), ("kobold", 1)],
    ),
    (
        "hills",
        &[("giant-bat", 2), ("goblin", 3), ("wolf", 2), ("bear", 1), ("ogre", 1)],
    ),
];

/// Look up a template by kind, falling back to [`DEFAULT_KIND`].
pub fn template_for(kind: &str) -> &'static MonsterTemplate {
    MONSTER_TEMPLATES
        .iter()
        .find(|t| t.kind == kind)
        .or_else(|| MONSTER_TEMPLATES.iter().find(|t| t.kind == DEFAULT_KIND))
        .unwrap_or(&MONSTER_TEMPLATES[0])
}

fn spawn_table(biome_name: &str) -> SpawnTable {
    let key = biome_name.trim().to_ascii_lowercase();
    BIOME_SPAWN_TABLES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, table)| *table)
        .unwrap_or(FALLBACK_TABLE)
}

/// Weighted pick of a monster kind for a biome. Unknown biomes use a generic pool.
pub fn pick_kind_for_biome<R: Rng + ?Sized>(biome_name: &str, rng: &mut R) -> &'static str {
    let table = spawn_table(biome_name);
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for (kind, weight) in table {
        if roll < *weight {
            return *kind;
        }
        roll -= weight;
    }
    table[0].0
}

/// 15% feeble, 70% normal, 15% fierce.
pub fn roll_variant<R: Rng + ?Sized>(rng: &mut R) -> MonsterVariant {
    let roll: f64 = rng.r#gen();
    if roll < 0.15 {
        MonsterVariant::Feeble
    } else if roll >= 0.85 {
        MonsterVariant::Fierce
    } else {
        MonsterVariant::Normal
    }
}

fn scaled(stat: u32, multiplier: f32) -> i64 {
    (stat as f32 * multiplier).round() as i64
}

/// Roll a concrete monster from `template`: variant scaling plus ±2 variance per stat.
pub fn roll_monster<R: Rng + ?Sized>(
    template: &MonsterTemplate,
    pos: IVec2,
    biome_id: u32,
    biome_name: &str,
    tick: u64,
    rng: &mut R,
) -> NewMonster {
    let variant = roll_variant(rng);
    let mult = variant.stat_multiplier();
    let mut vary = |stat: u32| (scaled(stat, mult) + rng.gen_range(-2..=2)).max(1) as u32;

    let strength = vary(template.strength);
    let agility = vary(template.agility);
    let health = vary(template.health);
    let max_hp = scaled(template.base_hp, mult).max(1) as u32 + health * 2;

    let name = match variant.label() {
        Some(label) => format!("{label} {}", template.name),
        None => template.name.to_string(),
    };

    NewMonster {
        name,
        kind: template.kind.to_string(),
        pos,
        max_hp,
        attributes: Attributes {
            strength,
            agility,
            health,
        },
        damage_roll: template.damage_roll,
        spawn: SpawnInfo {
            origin: pos,
            biome_id,
            biome_name: biome_name.to_string(),
            variant,
            tick,
        },
    }
}
