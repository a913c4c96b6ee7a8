use serde::{Deserialize, Serialize};

use super::CharacterSheet;
use crate::ids::CharacterId;

/// List-screen projection of a stored character.
///
/// Kept in step with the open sheet so the list never shows a stale name or
/// level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSummary {
    pub id: CharacterId,
    pub name: String,
    pub level: u8,
    pub class: String,
    pub race: String,
}

impl CharacterSummary {
    pub fn from_sheet(id: CharacterId, sheet: &CharacterSheet) -> Self {
        Self {
            id,
            name: sheet.name.clone(),
            level: sheet.level,
            class: sheet.class.clone(),
            race: sheet.race.clone(),
        }
    }

    /// Copy the displayed fields from `sheet`. Returns whether anything
    /// changed.
    pub fn mirror(&mut self, sheet: &CharacterSheet) -> bool {
        let next = Self::from_sheet(self.id, sheet);
        if *self == next {
            return false;
        }
        *self = next;
        true
    }
}
