//! D&D 5th Edition derivation rules.
//!
//! Every function here is pure and total. Scores and experience may be unset
//! while a field is being edited; unset inputs are `None` and propagate to
//! `None` outputs so the sheet can render them as blank.

use crate::value_objects::Ability;

/// XP thresholds for each level in D&D 5e.
/// Index is level - 1 (so level 1 = index 0).
pub const XP_THRESHOLDS: [i64; 20] = [
    0,      // Level 1
    300,    // Level 2
    900,    // Level 3
    2700,   // Level 4
    6500,   // Level 5
    14000,  // Level 6
    23000,  // Level 7
    34000,  // Level 8
    48000,  // Level 9
    64000,  // Level 10
    85000,  // Level 11
    100000, // Level 12
    120000, // Level 13
    140000, // Level 14
    165000, // Level 15
    195000, // Level 16
    225000, // Level 17
    265000, // Level 18
    305000, // Level 19
    355000, // Level 20
];

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 20;

/// A canonical skill or saving throw and the ability that governs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDefinition {
    pub name: &'static str,
    pub ability: Ability,
}

const fn check(name: &'static str, ability: Ability) -> CheckDefinition {
    CheckDefinition { name, ability }
}

/// The 18 canonical skills, alphabetical.
pub const SKILLS: [CheckDefinition; 18] = [
    check("Acrobatics", Ability::Dex),
    check("Animal Handling", Ability::Wis),
    check("Arcana", Ability::Int),
    check("Athletics", Ability::Str),
    check("Deception", Ability::Cha),
    check("History", Ability::Int),
    check("Insight", Ability::Wis),
    check("Intimidation", Ability::Cha),
    check("Investigation", Ability::Int),
    check("Medicine", Ability::Wis),
    check("Nature", Ability::Int),
    check("Perception", Ability::Wis),
    check("Performance", Ability::Cha),
    check("Persuasion", Ability::Cha),
    check("Religion", Ability::Int),
    check("Sleight of Hand", Ability::Dex),
    check("Stealth", Ability::Dex),
    check("Survival", Ability::Wis),
];

/// The 6 canonical saving throws, in ability order.
pub const SAVING_THROWS: [CheckDefinition; 6] = [
    check("Strength", Ability::Str),
    check("Dexterity", Ability::Dex),
    check("Constitution", Ability::Con),
    check("Intelligence", Ability::Int),
    check("Wisdom", Ability::Wis),
    check("Charisma", Ability::Cha),
];

/// Dice offered by the quick roller.
pub const QUICK_ROLL_DICE: [u32; 6] = [4, 6, 8, 10, 12, 20];

/// Governing ability of a canonical skill.
pub fn skill_ability(name: &str) -> Option<Ability> {
    SKILLS.iter().find(|s| s.name == name).map(|s| s.ability)
}

/// `floor((score - 10) / 2)`.
///
/// Rust's `/` truncates toward zero, so use Euclidean division to get the
/// floor for odd negative differences (score 9 is -1, not 0).
/// Widened to `i64` so the subtraction cannot overflow; half of any `i32`
/// range value fits back into `i32`.
pub fn ability_modifier(score: i32) -> i32 {
    (i64::from(score) - 10).div_euclid(2) as i32
}

/// Modifier of a possibly-unset score.
pub fn modifier(score: Option<i32>) -> Option<i32> {
    score.map(ability_modifier)
}

/// `ceil(level / 4) + 1`.
pub fn proficiency_bonus(level: u8) -> i32 {
    (i32::from(level) + 3) / 4 + 1
}

/// Modifier plus proficiency when trained. Same formula for saves.
pub fn skill_bonus(score: Option<i32>, proficient: bool, proficiency: i32) -> Option<i32> {
    modifier(score).map(|m| if proficient { m.saturating_add(proficiency) } else { m })
}

/// `8 + proficiency + modifier`.
pub fn spell_save_dc(score: Option<i32>, proficiency: i32) -> Option<i32> {
    modifier(score).map(|m| proficiency.saturating_add(8).saturating_add(m))
}

/// `proficiency + modifier`.
pub fn spell_attack_bonus(score: Option<i32>, proficiency: i32) -> Option<i32> {
    modifier(score).map(|m| proficiency.saturating_add(m))
}

/// XP required to reach `level`, clamped into 1..=20.
pub fn xp_for_level(level: u8) -> i64 {
    let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
    XP_THRESHOLDS[usize::from(level - 1)]
}

/// Highest level whose threshold is at or below `xp`.
///
/// Unset or negative experience is level 1; anything past the top threshold
/// is level 20.
pub fn level_from_xp(xp: Option<i64>) -> u8 {
    let Some(xp) = xp else {
        return MIN_LEVEL;
    };
    XP_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map(|index| index as u8 + 1)
        .unwrap_or(MIN_LEVEL)
}

/// Percentage of the way from the current level's threshold to the next,
/// clamped to `[0, 100]`. Always 100 at level 20; 0 for unset experience.
pub fn xp_progress(xp: Option<i64>, level: u8) -> f64 {
    if level >= MAX_LEVEL {
        return 100.0;
    }
    let Some(xp) = xp else {
        return 0.0;
    };
    let current = xp_for_level(level);
    let next = xp_for_level(level.max(MIN_LEVEL) + 1);
    let gained = xp.saturating_sub(current) as f64;
    let needed = (next - current) as f64;
    (gained / needed * 100.0).clamp(0.0, 100.0)
}

/// `"+3"`, `"-1"`, `"+0"`; blank for unset.
pub fn format_modifier(value: Option<i32>) -> String {
    match value {
        Some(v) if v >= 0 => format!("+{}", v),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}
