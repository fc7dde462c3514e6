//! Dice: single dice, `NdM+K` expressions and ability scores.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors from parsing or building a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceError {
    #[error("malformed dice expression {0:?}")]
    Malformed(String),
    #[error("dice expression needs at least one die, got {0}")]
    NoDice(u32),
    #[error("dice need at least one side, got {0}")]
    NoSides(u32),
}

/// Roll one fair die with `sides` faces. Returns a value in `1..=sides`.
///
/// A zero-sided die is treated as a one-sided die.
pub fn roll_die<R: Rng + ?Sized>(sides: u32, rng: &mut R) -> u32 {
    rng.gen_range(1..=sides.max(1))
}

/// 4d6, drop the lowest. Always in `3..=18`.
pub fn roll_ability_score<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let mut rolls = [0u32; 4];
    for r in rolls.iter_mut() {
        *r = roll_die(6, rng);
    }
    rolls.sort_unstable();
    rolls[1..].iter().sum()
}

/// Standard ability modifier: `floor((score - 10) / 2)`.
pub fn ability_modifier(score: u32) -> i32 {
    (score as i32 - 10).div_euclid(2)
}

/// A dice expression such as `2d6+1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub bonus: i32,
}

impl DiceExpr {
    pub fn new(count: u32, sides: u32, bonus: i32) -> Result<Self, DiceError> {
        if count == 0 {
            return Err(DiceError::NoDice(count));
        }
        if sides == 0 {
            return Err(DiceError::NoSides(sides));
        }
        Ok(Self {
            count,
            sides,
            bonus,
        })
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let dice: i64 = (0..self.count).map(|_| roll_die(self.sides, rng) as i64).sum();
        dice + self.bonus as i64
    }

    pub fn min(&self) -> i64 {
        self.count as i64 + self.bonus as i64
    }

    pub fn max(&self) -> i64 {
        self.count as i64 * self.sides as i64 + self.bonus as i64
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DiceError::Malformed(s.to_string());
        let text = s.trim().to_ascii_lowercase();
        let (count, rest) = text.split_once('d').ok_or_else(malformed)?;
        let count: u32 = if count.is_empty() {
            1
        } else {
            count.parse().map_err(|_| malformed())?
        };

        let (sides, bonus) = match rest.find(['+', '-']) {
            Some(idx) => {
                let (sides, bonus) = rest.split_at(idx);
                let magnitude: i32 = bonus[1..].parse().map_err(|_| malformed())?;
                let bonus = if bonus.starts_with('-') { -magnitude } else { magnitude };
                (sides, bonus)
            }
            None => (rest, 0),
        };
        let sides: u32 = sides.parse().map_err(|_| malformed())?;
        Self::new(count, sides, bonus)
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.bonus {
            0 => Ok(()),
            b if b > 0 => write!(f, "+{b}"),
            b => write!(f, "{b}"),
        }
    }
}
