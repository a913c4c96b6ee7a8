//! Dice formulas and the quick-roll history
//!
//! Supports formulas like "1d20+5", "2d6-1", "d8". Rolling takes a die-roll
//! closure (`sides -> 1..=sides`) so the domain stays free of an RNG.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

/// Number of rolls the quick roller remembers.
pub const ROLL_HISTORY_LIMIT: usize = 10;

pub const MAX_DICE_COUNT: u32 = 100;
pub const MAX_DIE_SIZE: u32 = 1000;
/// Largest modifier magnitude; keeps every total well inside `i32`.
pub const MAX_MODIFIER: i32 = 1_000_000;

/// Error when parsing a dice formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    #[error("Empty dice formula")]
    Empty,
    /// Expected XdY or XdY+Z
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    #[error("Dice count must be between 1 and {MAX_DICE_COUNT}")]
    InvalidDiceCount,
    #[error("Die size must be between 2 and {MAX_DIE_SIZE}")]
    InvalidDieSize,
    #[error("Modifier value overflow")]
    ModifierOverflow,
}

/// A parsed dice formula like "2d6+3"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawDiceFormula")]
pub struct DiceFormula {
    pub dice_count: u32,
    pub die_size: u32,
    pub modifier: i32,
}

/// Unchecked wire shape; deserialized formulas go through `DiceFormula::new`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiceFormula {
    dice_count: u32,
    die_size: u32,
    modifier: i32,
}

impl TryFrom<RawDiceFormula> for DiceFormula {
    type Error = DiceParseError;

    fn try_from(raw: RawDiceFormula) -> Result<Self, Self::Error> {
        Self::new(raw.dice_count, raw.die_size, raw.modifier)
    }
}

impl DiceFormula {
    pub fn new(dice_count: u32, die_size: u32, modifier: i32) -> Result<Self, DiceParseError> {
        if !(1..=MAX_DICE_COUNT).contains(&dice_count) {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if !(2..=MAX_DIE_SIZE).contains(&die_size) {
            return Err(DiceParseError::InvalidDieSize);
        }
        if !(-MAX_MODIFIER..=MAX_MODIFIER).contains(&modifier) {
            return Err(DiceParseError::ModifierOverflow);
        }
        Ok(Self {
            dice_count,
            die_size,
            modifier,
        })
    }

    /// A single die with no modifier, as used by the quick roller.
    pub fn single(die_size: u32) -> Result<Self, DiceParseError> {
        Self::new(1, die_size, 0)
    }

    /// Parse "XdY", "XdY+Z", "XdY-Z" or the "dY" shorthand.
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let (count_str, rest) = input.split_once('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;

        let dice_count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", count_str))
            })?
        };

        let (size_str, modifier) = match rest.find(['+', '-']) {
            Some(0) => {
                return Err(DiceParseError::InvalidFormat(format!(
                    "Invalid die size: '{}'",
                    rest
                )))
            }
            Some(pos) => {
                let modifier: i32 = rest[pos..]
                    .trim_start_matches('+')
                    .parse()
                    .map_err(|e: std::num::ParseIntError| match e.kind() {
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                            DiceParseError::ModifierOverflow
                        }
                        _ => DiceParseError::InvalidFormat(format!(
                            "Invalid modifier: '{}'",
                            &rest[pos..]
                        )),
                    })?;
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        let die_size: u32 = size_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", size_str))
        })?;

        Self::new(dice_count, die_size, modifier)
    }

    /// Roll using `roll_die`, which must return a value in `1..=sides`.
    ///
    /// Totals cannot overflow: `new` bounds the count, size and modifier.
    pub fn roll_with(&self, mut roll_die: impl FnMut(u32) -> u32) -> DiceRollResult {
        let individual_rolls: Vec<i32> = (0..self.dice_count)
            .map(|_| roll_die(self.die_size).clamp(1, self.die_size) as i32)
            .collect();
        let dice_total: i32 = individual_rolls
            .iter()
            .fold(0i32, |sum, roll| sum.saturating_add(*roll));

        DiceRollResult {
            formula: *self,
            individual_rolls,
            dice_total,
            total: dice_total.saturating_add(self.modifier),
        }
    }

    pub fn min_roll(&self) -> i32 {
        (self.dice_count as i32).saturating_add(self.modifier)
    }

    pub fn max_roll(&self) -> i32 {
        let most = i64::from(self.dice_count) * i64::from(self.die_size);
        i32::try_from(most)
            .unwrap_or(i32::MAX)
            .saturating_add(self.modifier)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dice_count == 1 && self.modifier == 0 {
            return write!(f, "d{}", self.die_size);
        }
        write!(f, "{}d{}", self.dice_count, self.die_size)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

/// Result of rolling dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    pub formula: DiceFormula,
    pub individual_rolls: Vec<i32>,
    /// Sum of dice before modifier
    pub dice_total: i32,
    pub total: i32,
}

impl DiceRollResult {
    /// Format as a breakdown string (e.g., "2d6+3 [4, 5] = 12")
    pub fn breakdown(&self) -> String {
        let rolls: Vec<String> = self.individual_rolls.iter().map(|r| r.to_string()).collect();
        format!("{} [{}] = {}", self.formula, rolls.join(", "), self.total)
    }

    pub fn is_natural_20(&self) -> bool {
        self.formula.die_size == 20
            && self.formula.dice_count == 1
            && self.individual_rolls.first() == Some(&20)
    }

    pub fn is_natural_1(&self) -> bool {
        self.formula.die_size == 20
            && self.formula.dice_count == 1
            && self.individual_rolls.first() == Some(&1)
    }
}

/// One remembered roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollRecord {
    /// Formula as displayed, e.g. "d20".
    pub dice: String,
    pub result: i32,
    pub timestamp: DateTime<Utc>,
}

/// The most recent rolls, newest first, capped at [`ROLL_HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollHistory {
    entries: VecDeque<RollRecord>,
}

impl RollHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, roll: &DiceRollResult, timestamp: DateTime<Utc>) {
        self.entries.push_front(RollRecord {
            dice: roll.formula.to_string(),
            result: roll.total,
            timestamp,
        });
        self.entries.truncate(ROLL_HISTORY_LIMIT);
    }

    pub fn entries(&self) -> impl Iterator<Item = &RollRecord> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&RollRecord> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
