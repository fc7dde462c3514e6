//! Progression: XP thresholds and dice-based stat generation.
//!
//! # Invariants
//! - XP thresholds are 0 at level 0 and strictly increasing from level 1.
//! - Every roll draws from the caller's RNG, never from ambient randomness.

pub mod dice;
pub mod xp;

pub use dice::{DiceError, DiceExpr, ability_modifier, roll_ability_score, roll_die};
pub use xp::{level_for_xp, xp_threshold_for_level, xp_to_next_level};
