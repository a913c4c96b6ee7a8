//! Value objects - Immutable objects defined by their attributes

mod ability;
mod dice;
mod field_value;
mod names;

pub use ability::Ability;
pub use dice::{
    DiceFormula, DiceParseError, DiceRollResult, RollHistory, RollRecord, ROLL_HISTORY_LIMIT,
};
pub use field_value::FieldValue;
pub use names::CharacterName;
