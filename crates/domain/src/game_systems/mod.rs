//! Game system rules.
//!
//! Only D&D 5th Edition (`dnd5e`) is supported. The rules are plain
//! functions over scores, levels and experience; the sheet projections in
//! `character_sheet::derived` call into them.

pub mod dnd5e;

pub use dnd5e::{
    ability_modifier, format_modifier, level_from_xp, modifier, proficiency_bonus,
    skill_ability, skill_bonus, spell_attack_bonus, spell_save_dc, xp_for_level, xp_progress,
    CheckDefinition, MAX_LEVEL, MIN_LEVEL, QUICK_ROLL_DICE, SAVING_THROWS, SKILLS,
    XP_THRESHOLDS,
};
