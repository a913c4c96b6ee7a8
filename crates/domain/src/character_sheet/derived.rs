//! Display values derived from a sheet.
//!
//! Nothing here is stored. The view recomputes these on every render.

use serde::Serialize;

use super::{CharacterSheet, ProficiencyEntry};
use crate::game_systems::dnd5e::{self, CheckDefinition, MAX_LEVEL, SAVING_THROWS, SKILLS};
use crate::value_objects::Ability;

/// One row of the skills or saving throws table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRow {
    pub name: &'static str,
    pub ability: Ability,
    pub proficient: bool,
    /// `None` when the governing score is unset.
    pub bonus: Option<i32>,
}

/// Experience bar state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpBar {
    pub xp: Option<i64>,
    pub level: u8,
    pub current_threshold: i64,
    /// Equal to `current_threshold` at max level.
    pub next_threshold: i64,
    pub progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub proficiency_bonus: i32,
    pub modifiers: Vec<(Ability, Option<i32>)>,
    pub skills: Vec<CheckRow>,
    pub saving_throws: Vec<CheckRow>,
    pub spell_save_dc: Option<i32>,
    pub spell_attack_bonus: Option<i32>,
    pub total_weight: f64,
    pub hp_percent: Option<f64>,
    pub xp: XpBar,
}

impl DerivedStats {
    pub fn compute(sheet: &CharacterSheet) -> Self {
        Self {
            proficiency_bonus: sheet.proficiency_bonus(),
            modifiers: Ability::ALL
                .into_iter()
                .map(|a| (a, sheet.modifier(a)))
                .collect(),
            skills: sheet.skill_rows(),
            saving_throws: sheet.save_rows(),
            spell_save_dc: sheet.spell_save_dc(),
            spell_attack_bonus: sheet.spell_attack_bonus(),
            total_weight: sheet.total_weight(),
            hp_percent: sheet.hp_percent(),
            xp: sheet.xp_bar(),
        }
    }
}

impl CharacterSheet {
    pub fn proficiency_bonus(&self) -> i32 {
        dnd5e::proficiency_bonus(self.level)
    }

    pub fn modifier(&self, ability: Ability) -> Option<i32> {
        dnd5e::modifier(self.abilities.get(ability))
    }

    /// All 18 canonical skills with this sheet's proficiencies applied.
    pub fn skill_rows(&self) -> Vec<CheckRow> {
        self.check_rows(&SKILLS, &self.skills)
    }

    /// All 6 canonical saves with this sheet's proficiencies applied.
    pub fn save_rows(&self) -> Vec<CheckRow> {
        self.check_rows(&SAVING_THROWS, &self.saving_throws)
    }

    fn check_rows(
        &self,
        canonical: &[CheckDefinition],
        overrides: &[ProficiencyEntry],
    ) -> Vec<CheckRow> {
        let proficiency = self.proficiency_bonus();
        canonical
            .iter()
            .map(|def| {
                // first entry wins; the entry's own ability is ignored
                let proficient = overrides
                    .iter()
                    .find(|e| e.name == def.name)
                    .is_some_and(|e| e.proficient);
                CheckRow {
                    name: def.name,
                    ability: def.ability,
                    proficient,
                    bonus: dnd5e::skill_bonus(
                        self.abilities.get(def.ability),
                        proficient,
                        proficiency,
                    ),
                }
            })
            .collect()
    }

    pub fn spell_save_dc(&self) -> Option<i32> {
        dnd5e::spell_save_dc(
            self.abilities.get(self.spellcasting_ability),
            self.proficiency_bonus(),
        )
    }

    pub fn spell_attack_bonus(&self) -> Option<i32> {
        dnd5e::spell_attack_bonus(
            self.abilities.get(self.spellcasting_ability),
            self.proficiency_bonus(),
        )
    }

    /// Sum of weight × quantity; unset numbers count as zero.
    pub fn total_weight(&self) -> f64 {
        self.inventory
            .iter()
            .map(|item| item.weight.unwrap_or(0.0) * f64::from(item.quantity.unwrap_or(0)))
            .sum()
    }

    /// `current / max` as a percentage, capped at 100. `None` when either
    /// is unset or max is zero.
    pub fn hp_percent(&self) -> Option<f64> {
        let current = self.hp.current?;
        let max = self.hp.max.filter(|m| *m != 0)?;
        Some((f64::from(current) / f64::from(max) * 100.0).min(100.0))
    }

    pub fn xp_bar(&self) -> XpBar {
        let current_threshold = dnd5e::xp_for_level(self.level);
        let next_threshold = if self.level >= MAX_LEVEL {
            current_threshold
        } else {
            dnd5e::xp_for_level(self.level.max(1) + 1)
        };
        XpBar {
            xp: self.details.xp,
            level: self.level,
            current_threshold,
            next_threshold,
            progress: dnd5e::xp_progress(self.details.xp, self.level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character_sheet::starter_template;

    fn row<'a>(rows: &'a [CheckRow], name: &str) -> &'a CheckRow {
        rows.iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn starter_skill_rows() {
        let sheet = starter_template();
        let rows = sheet.skill_rows();
        assert_eq!(rows.len(), 18);
        // STR 16 (+3) + prof 2
        assert_eq!(row(&rows, "Athletics").bonus, Some(5));
        assert!(row(&rows, "Athletics").proficient);
        // DEX 14 (+2), untrained
        assert_eq!(row(&rows, "Stealth").bonus, Some(2));
        // CHA 8 (-1) + prof 2
        assert_eq!(row(&rows, "Intimidation").bonus, Some(1));
    }

    #[test]
    fn toggled_skill_uses_canonical_ability() {
        // the placeholder ability is STR; Stealth must still read DEX
        let sheet = starter_template().toggle_skill_proficiency("Stealth");
        assert_eq!(row(&sheet.skill_rows(), "Stealth").bonus, Some(4));
    }

    #[test]
    fn save_rows_follow_abilities() {
        let sheet = starter_template();
        let rows = sheet.save_rows();
        assert_eq!(row(&rows, "Constitution").bonus, Some(4));
        assert_eq!(row(&rows, "Wisdom").bonus, Some(1));
    }

    #[test]
    fn unset_score_blanks_its_rows() {
        let sheet = starter_template().set_ability(Ability::Dex, None);
        assert_eq!(row(&sheet.skill_rows(), "Acrobatics").bonus, None);
        assert_eq!(sheet.modifier(Ability::Dex), None);
    }

    #[test]
    fn spellcasting_numbers() {
        let sheet = starter_template().set_spellcasting_ability(Ability::Wis);
        // 8 + 2 + 1
        assert_eq!(sheet.spell_save_dc(), Some(11));
        assert_eq!(sheet.spell_attack_bonus(), Some(3));
    }

    #[test]
    fn total_weight_multiplies_quantity() {
        let sheet = starter_template();
        assert_eq!(sheet.total_weight(), 3.0 + 55.0 + 6.0 + 59.0);
        let mut sheet = sheet;
        sheet.inventory[0].quantity = Some(2);
        sheet.inventory[1].weight = None;
        assert_eq!(sheet.total_weight(), 6.0 + 6.0 + 59.0);
    }

    #[test]
    fn hp_percent_caps_and_blanks() {
        let mut sheet = starter_template();
        assert_eq!(sheet.hp_percent(), Some(100.0));
        sheet.hp.current = Some(6);
        assert_eq!(sheet.hp_percent(), Some(50.0));
        sheet.hp.current = Some(30);
        assert_eq!(sheet.hp_percent(), Some(100.0));
        sheet.hp.max = Some(0);
        assert_eq!(sheet.hp_percent(), None);
    }

    #[test]
    fn xp_bar_at_level_two_and_twenty() {
        let mut sheet = starter_template();
        sheet.details.xp = Some(600);
        let sheet = sheet.reconcile_level();
        let bar = sheet.xp_bar();
        assert_eq!(bar.current_threshold, 300);
        assert_eq!(bar.next_threshold, 900);
        assert_eq!(bar.progress, 50.0);

        let mut capped = sheet;
        capped.details.xp = Some(400_000);
        let bar = capped.reconcile_level().xp_bar();
        assert_eq!(bar.level, 20);
        assert_eq!(bar.next_threshold, bar.current_threshold);
        assert_eq!(bar.progress, 100.0);
    }

    #[test]
    fn compute_collects_everything() {
        let stats = DerivedStats::compute(&starter_template());
        assert_eq!(stats.proficiency_bonus, 2);
        assert_eq!(stats.modifiers[0], (Ability::Str, Some(3)));
        assert_eq!(stats.saving_throws.len(), 6);
    }

    #[test]
    fn extreme_values_still_derive() {
        let mut sheet = starter_template()
            .set_ability(Ability::Int, Some(i32::MIN))
            .set_ability(Ability::Str, Some(i32::MAX));
        sheet.details.xp = Some(i64::MIN);

        let stats = DerivedStats::compute(&sheet);
        assert_eq!(stats.modifiers[0], (Ability::Str, Some(1_073_741_818)));
        assert_eq!(stats.spell_save_dc, Some(-1_073_741_819));
        assert_eq!(stats.xp.progress, 0.0);
    }
}
