//! Starter template for new sheets.

use std::collections::BTreeMap;

use super::{
    AbilityScores, CharacterDetails, CharacterSheet, Feature, HitPoints, InventoryItem,
    ProficiencyEntry, SpellSlot, Spellbook,
};
use crate::ids::{FeatureId, InventoryItemId};
use crate::value_objects::{Ability, CharacterName};

/// A level 1 human fighter.
///
/// Used for every newly created character (with the name replaced) and as
/// the fallback for anything a stored document is missing.
pub fn starter_template() -> CharacterSheet {
    CharacterSheet {
        name: "Valeros".to_string(),
        race: "Human".to_string(),
        class: "Fighter".to_string(),
        level: 1,
        abilities: AbilityScores {
            str: Some(16),
            dex: Some(14),
            con: Some(15),
            int: Some(10),
            wis: Some(12),
            cha: Some(8),
        },
        hp: HitPoints {
            current: Some(12),
            max: Some(12),
            temp: Some(0),
        },
        ac: Some(16),
        speed: Some(30),
        initiative: Some(2),
        skills: vec![
            proficient("Athletics", Ability::Str),
            proficient("Intimidation", Ability::Cha),
        ],
        saving_throws: vec![
            proficient("Strength", Ability::Str),
            proficient("Constitution", Ability::Con),
        ],
        inventory: vec![
            item("1", "Longsword", 3.0, "Versatile (1d10)"),
            item("2", "Chain Mail", 55.0, "AC 16, Str 13, Disadvantage on Stealth"),
            item("3", "Shield", 6.0, "+2 AC"),
            item(
                "4",
                "Explorer's Pack",
                59.0,
                "Includes a backpack, a bedroll, a mess kit, a tinderbox, 10 torches, \
                 10 days of rations, and a waterskin. The pack also has 50 feet of hempen \
                 rope strapped to the side of it.",
            ),
        ],
        weapons: Vec::new(),
        features: vec![
            Feature {
                id: FeatureId::from("1"),
                name: "Second Wind".to_string(),
                source: "Fighter 1".to_string(),
                description: "You have a limited well of stamina that you can draw on to \
                              protect yourself from harm. On your turn, you can use a bonus \
                              action to regain hit points equal to 1d10 + your fighter level."
                    .to_string(),
            },
            Feature {
                id: FeatureId::from("2"),
                name: "Fighting Style (Defense)".to_string(),
                source: "Fighter 1".to_string(),
                description: "While you are wearing armor, you gain a +1 bonus to AC.".to_string(),
            },
        ],
        spellcasting_ability: Ability::Int,
        spells: Spellbook {
            slots: BTreeMap::from([(
                1,
                SpellSlot {
                    total: Some(0),
                    used: Some(0),
                },
            )]),
            list: Vec::new(),
        },
        details: CharacterDetails {
            background: "Soldier".to_string(),
            alignment: "Neutral Good".to_string(),
            xp: Some(0),
            ..Default::default()
        },
        notes: String::new(),
    }
}

impl CharacterSheet {
    /// The starter template under a new name.
    pub fn new_named(name: &CharacterName) -> Self {
        Self {
            name: name.as_str().to_string(),
            ..starter_template()
        }
    }
}

fn proficient(name: &str, ability: Ability) -> ProficiencyEntry {
    ProficiencyEntry {
        name: name.to_string(),
        ability,
        proficient: true,
    }
}

fn item(id: &str, name: &str, weight: f64, description: &str) -> InventoryItem {
    InventoryItem {
        id: InventoryItemId::from(id),
        name: name.to_string(),
        quantity: Some(1),
        weight: Some(weight),
        description: description.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_systems::level_from_xp;

    #[test]
    fn template_level_matches_experience() {
        let sheet = starter_template();
        assert_eq!(sheet.level, level_from_xp(sheet.details.xp));
    }

    #[test]
    fn new_named_only_changes_name() {
        let name = CharacterName::new("Ilvara").unwrap();
        let sheet = CharacterSheet::new_named(&name);
        assert_eq!(sheet.name, "Ilvara");
        assert_eq!(
            CharacterSheet {
                name: "Valeros".into(),
                ..sheet
            },
            starter_template()
        );
    }
}
