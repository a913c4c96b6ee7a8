//! The character document.
//!
//! A [`CharacterSheet`] is the whole editable state of one character, and is
//! also the JSON payload persisted in the record store. Field names follow
//! the stored JSON (`savingThrows`, `spellcastingAbility`, `atkBonus`, ...).
//!
//! # Unset numbers
//!
//! Numeric fields a user can clear (ability scores, hit points, armor class,
//! experience, ...) are `Option`s. `None` is an emptied input box; it is
//! stored as JSON `null` and rendered blank rather than as zero.
//!
//! # Structure
//!
//! - `defaults` - the starter template every new or partially-stored sheet
//!   falls back to
//! - `edits` - the immutable update operations and the [`SheetEdit`] delta
//! - `merge` - the field-level policy for merging a stored document onto the
//!   template
//! - `derived` - display values computed from a sheet on demand
//! - `summary` - the list-screen projection

mod defaults;
mod derived;
mod edits;
mod merge;
mod summary;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{FeatureId, InventoryItemId, SpellId, WeaponId};
use crate::value_objects::Ability;

pub use defaults::starter_template;
pub use derived::{CheckRow, DerivedStats, XpBar};
pub use edits::{
    CombatField, DetailField, FeatureField, HeaderField, HpField, InventoryField, SheetEdit,
    SlotField, WeaponDraft, WeaponField,
};
pub use merge::{merge_onto_defaults, merge_value, MergeStrategy, SHEET_MERGE_SCHEMA};
pub use summary::CharacterSummary;

/// Treat an explicit JSON `null` like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Slot map where a null entry reads as an empty slot record.
fn lenient_slots<'de, D>(deserializer: D) -> Result<BTreeMap<u8, SpellSlot>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<u8, Option<SpellSlot>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(level, slot)| (level, slot.unwrap_or_default()))
        .collect())
}

/// One character's complete sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSheet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub race: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub class: String,
    /// Always `level_from_xp(details.xp)` once reconciled; never edited
    /// directly.
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: u8,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub hp: HitPoints,
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub speed: Option<i32>,
    #[serde(default)]
    pub initiative: Option<i32>,
    /// Proficiency overrides; the canonical skill list lives in
    /// `game_systems::dnd5e::SKILLS`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<ProficiencyEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saving_throws: Vec<ProficiencyEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inventory: Vec<InventoryItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weapons: Vec<Weapon>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<Feature>,
    #[serde(default = "default_spellcasting_ability")]
    pub spellcasting_ability: Ability,
    #[serde(default)]
    pub spells: Spellbook,
    #[serde(default)]
    pub details: CharacterDetails,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

fn default_spellcasting_ability() -> Ability {
    Ability::Int
}

impl Default for CharacterSheet {
    fn default() -> Self {
        starter_template()
    }
}

/// The six ability scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(default)]
    pub str: Option<i32>,
    #[serde(default)]
    pub dex: Option<i32>,
    #[serde(default)]
    pub con: Option<i32>,
    #[serde(default)]
    pub int: Option<i32>,
    #[serde(default)]
    pub wis: Option<i32>,
    #[serde(default)]
    pub cha: Option<i32>,
}

impl AbilityScores {
    pub fn get(&self, ability: Ability) -> Option<i32> {
        match ability {
            Ability::Str => self.str,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }

    pub fn slot_mut(&mut self, ability: Ability) -> &mut Option<i32> {
        match ability {
            Ability::Str => &mut self.str,
            Ability::Dex => &mut self.dex,
            Ability::Con => &mut self.con,
            Ability::Int => &mut self.int,
            Ability::Wis => &mut self.wis,
            Ability::Cha => &mut self.cha,
        }
    }
}

/// Hit points. No clamping: current may exceed max or go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitPoints {
    #[serde(default)]
    pub current: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
    #[serde(default)]
    pub temp: Option<i32>,
}

/// A skill or saving throw proficiency override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProficiencyEntry {
    pub name: String,
    /// Recorded but never read back; display uses the canonical ability.
    #[serde(default = "placeholder_ability")]
    pub ability: Ability,
    #[serde(default, deserialize_with = "null_as_default")]
    pub proficient: bool,
}

/// Ability written on entries created by a proficiency toggle.
pub(crate) fn placeholder_ability() -> Ability {
    Ability::Str
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: WeaponId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "atkBonus", default, deserialize_with = "null_as_default")]
    pub attack_bonus: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub damage: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Spell slots per spell level plus the known-spell list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellbook {
    /// Keyed by spell level 0-9; JSON object keys are the level digits.
    #[serde(default, deserialize_with = "lenient_slots")]
    pub slots: BTreeMap<u8, SpellSlot>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list: Vec<Spell>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSlot {
    #[serde(default)]
    pub total: Option<i32>,
    #[serde(default)]
    pub used: Option<i32>,
}

/// A known spell.
///
/// Stored documents written before spells carried ids get a fresh id on
/// load. Name-keyed edits still match every entry sharing the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    #[serde(default)]
    pub id: SpellId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub level: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prepared: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// Background and narrative details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDetails {
    #[serde(default, deserialize_with = "null_as_default")]
    pub background: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alignment: String,
    /// Experience points; drives `CharacterSheet::level`.
    #[serde(default)]
    pub xp: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub traits: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ideals: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bonds: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flaws: String,
}
