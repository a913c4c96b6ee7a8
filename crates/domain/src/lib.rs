//! Character sheet domain: the sheet document, its edits, the D&D 5e
//! derivation rules and the dice model.
//!
//! Nothing in this crate performs I/O. Persistence, auth and timing live in
//! `charsheet-engine`.

extern crate self as charsheet_domain;

pub mod character_sheet;
pub mod error;
pub mod game_systems;
pub mod ids;
pub mod value_objects;

pub use error::DomainError;

pub use character_sheet::{
    merge_onto_defaults, merge_value, starter_template, AbilityScores, CharacterDetails,
    CharacterSheet, CharacterSummary, CheckRow, CombatField, DerivedStats, DetailField, Feature,
    FeatureField, HeaderField, HitPoints, HpField, InventoryField, InventoryItem, MergeStrategy,
    ProficiencyEntry, SheetEdit, SlotField, Spell, SpellSlot, Spellbook, Weapon, WeaponDraft,
    WeaponField, XpBar, SHEET_MERGE_SCHEMA,
};

pub use game_systems::{
    ability_modifier, format_modifier, level_from_xp, proficiency_bonus, xp_for_level,
    xp_progress, CheckDefinition, MAX_LEVEL, MIN_LEVEL, QUICK_ROLL_DICE, SAVING_THROWS, SKILLS,
};

pub use ids::{CharacterId, FeatureId, InventoryItemId, SpellId, UserId, WeaponId};

pub use value_objects::{
    Ability, CharacterName, DiceFormula, DiceParseError, DiceRollResult, FieldValue, RollHistory,
    RollRecord, ROLL_HISTORY_LIMIT,
};
