//! The quality schema: every key the scenario knows about, each
//! mapped to exactly one value domain and a sense derived from the
//! key's name.

use crate::{QualityKey, error::SchemaError};
use fxhash::FxHashMap;

/// Whether more of a quality is better (`Positive`) or worse
/// (`Negative`). Derived purely from whether the key's name starts with
/// `_` — there is no separate declaration for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    Positive,
    Negative,
}

impl Sense {
    #[must_use]
    pub fn of(key: &str) -> Sense {
        if key.starts_with('_') {
            Sense::Negative
        } else {
            Sense::Positive
        }
    }
}

/// The value domain of a quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Str,
    Set,
}

/// A single schema entry: a quality's declared type and derived sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEntry {
    pub ty: ValueType,
    pub sense: Sense,
}

/// The set of quality keys known to a scenario, each with its type and
/// sense. Assembled once, by merging every state/action/test's schema
/// fragment (see [`crate::scenario::ScenarioBuilder`]); fixed thereafter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entries: FxHashMap<QualityKey, SchemaEntry>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Schema::default()
    }

    #[must_use]
    pub fn get(&self, key: &QualityKey) -> Option<SchemaEntry> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &QualityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &QualityKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QualityKey, &SchemaEntry)> {
        self.entries.iter()
    }

    /// Declare a single quality, or check it against an existing
    /// declaration. Aborts with [`SchemaError::InconsistentType`] if the
    /// key was already declared with a different type.
    pub fn declare(&mut self, key: QualityKey, ty: ValueType) -> Result<(), SchemaError> {
        let sense = Sense::of(&key);
        match self.entries.get(&key) {
            Some(existing) if existing.ty != ty => Err(SchemaError::InconsistentType {
                key,
                first: existing.ty,
                second: ty,
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(key, SchemaEntry { ty, sense });
                Ok(())
            }
        }
    }

    /// Merge another schema fragment into this one, erroring on the
    /// first type conflict (see design note 1: scenario assembly merges
    /// fragments from every declared state/action/test).
    pub fn merge(&mut self, other: &Schema) -> Result<(), SchemaError> {
        for (key, entry) in &other.entries {
            self.declare(key.clone(), entry.ty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sense_from_leading_underscore() {
        assert_eq!(Sense::of("sword"), Sense::Positive);
        assert_eq!(Sense::of("_did_thing"), Sense::Negative);
    }

    #[test]
    fn declare_is_idempotent() {
        let mut schema = Schema::new();
        let key: QualityKey = "sword".into();
        schema.declare(key.clone(), ValueType::Bool).unwrap();
        schema.declare(key, ValueType::Bool).unwrap();
    }

    #[test]
    fn declare_conflict_is_an_error() {
        let mut schema = Schema::new();
        let key: QualityKey = "sword".into();
        schema.declare(key.clone(), ValueType::Bool).unwrap();
        let err = schema.declare(key, ValueType::Int).unwrap_err();
        assert!(matches!(err, SchemaError::InconsistentType { .. }));
    }

    #[test]
    fn merge_propagates_conflicts() {
        let mut a = Schema::new();
        a.declare("food".into(), ValueType::Bool).unwrap();
        let mut b = Schema::new();
        b.declare("food".into(), ValueType::Int).unwrap();
        assert!(a.merge(&b).is_err());
    }
}
