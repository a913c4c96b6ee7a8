//! Quick dice roller with a short history.

use std::sync::Arc;

use charsheet_domain::{DiceFormula, DiceRollResult, DomainError, RollHistory};

use crate::infrastructure::ports::{ClockPort, RandomPort};

pub struct DiceRoller {
    random: Arc<dyn RandomPort>,
    clock: Arc<dyn ClockPort>,
    history: RollHistory,
}

impl DiceRoller {
    pub fn new(random: Arc<dyn RandomPort>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            random,
            clock,
            history: RollHistory::new(),
        }
    }

    pub fn roll(&mut self, formula: &DiceFormula) -> DiceRollResult {
        let random = &self.random;
        let result = formula.roll_with(|sides| {
            let max = i32::try_from(sides).unwrap_or(i32::MAX);
            u32::try_from(random.gen_range(1, max)).unwrap_or(1)
        });
        self.history.record(&result, self.clock.now());
        tracing::debug!(formula = %formula, total = result.total, "Dice rolled");
        result
    }

    /// Roll one die with `sides` faces, as the quick-roll buttons do.
    pub fn roll_die(&mut self, sides: u32) -> Result<DiceRollResult, DomainError> {
        let formula = DiceFormula::single(sides)?;
        Ok(self.roll(&formula))
    }

    pub fn roll_formula(&mut self, input: &str) -> Result<DiceRollResult, DomainError> {
        let formula = DiceFormula::parse(input)?;
        Ok(self.roll(&formula))
    }

    /// Recent rolls, newest first.
    pub fn history(&self) -> &RollHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::ports::MockRandomPort;
    use charsheet_domain::{QUICK_ROLL_DICE, ROLL_HISTORY_LIMIT};
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()))
    }

    #[test]
    fn quick_roll_records_newest_first() {
        let mut roller = DiceRoller::new(Arc::new(FixedRandom(3)), clock());
        for sides in QUICK_ROLL_DICE {
            roller.roll_die(sides).unwrap();
        }

        let latest = roller.history().latest().unwrap();
        assert_eq!(latest.dice, "d20");
        assert_eq!(latest.result, 3);
        assert_eq!(roller.history().len(), QUICK_ROLL_DICE.len());
    }

    #[test]
    fn history_keeps_only_recent_rolls() {
        let mut roller = DiceRoller::new(Arc::new(FixedRandom(1)), clock());
        for _ in 0..ROLL_HISTORY_LIMIT + 5 {
            roller.roll_die(6).unwrap();
        }
        assert_eq!(roller.history().len(), ROLL_HISTORY_LIMIT);
    }

    #[test]
    fn formula_asks_for_each_die_and_adds_modifier() {
        let mut random = MockRandomPort::new();
        random
            .expect_gen_range()
            .withf(|min, max| *min == 1 && *max == 6)
            .times(2)
            .returning(|_, _| 4);

        let mut roller = DiceRoller::new(Arc::new(random), clock());
        let result = roller.roll_formula("2d6+3").unwrap();
        assert_eq!(result.individual_rolls, vec![4, 4]);
        assert_eq!(result.total, 11);
        assert_eq!(roller.history().latest().unwrap().dice, "2d6+3");
    }

    #[test]
    fn bad_input_is_a_domain_error_and_not_recorded() {
        let mut roller = DiceRoller::new(Arc::new(FixedRandom(1)), clock());
        assert!(roller.roll_formula("fireball").is_err());
        assert!(roller.roll_die(1).is_err());
        assert!(roller.history().is_empty());
    }
}
