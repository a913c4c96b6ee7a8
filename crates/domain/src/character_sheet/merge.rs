//! Merging a stored document onto the starter template.
//!
//! Stored documents may predate fields the sheet has since gained, or hold
//! only part of a sub-record. Loading fills the gaps from the template using
//! a static per-field schema:
//!
//! | field                                   | strategy           |
//! |-----------------------------------------|--------------------|
//! | name, race, class, level, ...           | `Value`            |
//! | ac, speed, initiative                   | `Nullable`         |
//! | abilities, hp, details                  | `Shallow`          |
//! | skills, savingThrows, inventory, ...    | `ReplaceOrDefault` |
//! | spells                                  | `Nested`           |
//! | spells.slots                            | `Shallow`          |
//! | spells.list                             | `ReplaceOrDefault` |
//!
//! Objects merge key-by-key; lists are taken whole or not at all. A stored
//! empty list is kept empty; only a missing or null list falls back.

use serde_json::{Map, Value};

use super::{starter_template, CharacterSheet};

/// How one field of a stored document combines with the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Stored value when present and not null, else the default.
    Value,
    /// Stored value when present, null included (an unset number), else
    /// the default.
    Nullable,
    /// Key-by-key overlay of the stored object on the default object. A
    /// stored value that is not an object contributes nothing.
    Shallow,
    /// Stored value wholesale when present and not null, else the default
    /// wholesale. No per-element merge.
    ReplaceOrDefault,
    /// An object rebuilt from its own field schema. Stored keys outside the
    /// schema are dropped.
    Nested(&'static [(&'static str, MergeStrategy)]),
}

const SPELLS_SCHEMA: &[(&str, MergeStrategy)] = &[
    ("slots", MergeStrategy::Shallow),
    ("list", MergeStrategy::ReplaceOrDefault),
];

/// Field schema for [`CharacterSheet`] documents.
pub const SHEET_MERGE_SCHEMA: &[(&str, MergeStrategy)] = &[
    ("name", MergeStrategy::Value),
    ("race", MergeStrategy::Value),
    ("class", MergeStrategy::Value),
    ("level", MergeStrategy::Value),
    ("abilities", MergeStrategy::Shallow),
    ("hp", MergeStrategy::Shallow),
    ("ac", MergeStrategy::Nullable),
    ("speed", MergeStrategy::Nullable),
    ("initiative", MergeStrategy::Nullable),
    ("skills", MergeStrategy::ReplaceOrDefault),
    ("savingThrows", MergeStrategy::ReplaceOrDefault),
    ("inventory", MergeStrategy::ReplaceOrDefault),
    ("weapons", MergeStrategy::ReplaceOrDefault),
    ("features", MergeStrategy::ReplaceOrDefault),
    ("spellcastingAbility", MergeStrategy::Value),
    ("spells", MergeStrategy::Nested(SPELLS_SCHEMA)),
    ("details", MergeStrategy::Shallow),
    ("notes", MergeStrategy::Value),
];

impl MergeStrategy {
    /// Combine one field. `stored` is `None` when the key is absent.
    pub fn merge(&self, default: &Value, stored: Option<&Value>) -> Value {
        match self {
            Self::Value | Self::ReplaceOrDefault => match stored {
                Some(v) if !v.is_null() => v.clone(),
                _ => default.clone(),
            },
            Self::Nullable => stored.unwrap_or(default).clone(),
            Self::Shallow => {
                let mut merged = default.as_object().cloned().unwrap_or_default();
                if let Some(Value::Object(overrides)) = stored {
                    for (key, value) in overrides {
                        merged.insert(key.clone(), value.clone());
                    }
                }
                Value::Object(merged)
            }
            Self::Nested(schema) => {
                let defaults = default.as_object();
                let stored = stored.and_then(Value::as_object);
                Value::Object(merge_fields(schema, defaults, stored, false))
            }
        }
    }
}

fn merge_fields(
    schema: &[(&str, MergeStrategy)],
    defaults: Option<&Map<String, Value>>,
    stored: Option<&Map<String, Value>>,
    keep_unknown: bool,
) -> Map<String, Value> {
    let mut merged = Map::new();

    if keep_unknown {
        for map in [defaults, stored].into_iter().flatten() {
            for (key, value) in map {
                if !schema.iter().any(|(k, _)| k == key) {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }

    for (key, strategy) in schema {
        let default = defaults.and_then(|m| m.get(*key)).unwrap_or(&Value::Null);
        let stored = stored.and_then(|m| m.get(*key));
        merged.insert((*key).to_string(), strategy.merge(default, stored));
    }

    merged
}

/// Merge a stored document onto a default document using
/// [`SHEET_MERGE_SCHEMA`].
///
/// A stored payload that is not an object (e.g. `null`) counts as empty.
/// Top-level keys outside the schema are carried through, stored over
/// default.
pub fn merge_value(defaults: &Value, stored: &Value) -> Value {
    Value::Object(merge_fields(
        SHEET_MERGE_SCHEMA,
        defaults.as_object(),
        stored.as_object(),
        true,
    ))
}

/// Load a stored payload as a sheet, filling gaps from the starter template.
///
/// Fails only when a stored value has the wrong shape for its field (e.g.
/// an unknown ability key).
pub fn merge_onto_defaults(stored: &Value) -> Result<CharacterSheet, serde_json::Error> {
    let defaults = serde_json::to_value(starter_template())?;
    serde_json::from_value(merge_value(&defaults, stored))
}
