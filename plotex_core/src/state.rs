//! States: immutable, canonical quality assignments, the partial
//! order over them, and their meet.

use crate::{
    QualityKey,
    error::SchemaError,
    schema::{Schema, Sense, ValueType},
    value::QualityValue,
};
use fxhash::FxHashMap;
use std::hash::{Hash, Hasher};

/// An immutable snapshot of every non-default quality value. Construction
/// always canonicalizes: falsy values (`false`, `0`, `""`, `{}`) never
/// appear in `qualities`, so two states with the same canonical content
/// are `==` regardless of how they were built.
#[derive(Debug, Clone, Default)]
pub struct State {
    qualities: FxHashMap<QualityKey, QualityValue>,
}

impl State {
    #[must_use]
    pub fn empty() -> Self {
        State::default()
    }

    /// Build a state from raw key/value pairs, dropping any falsy value.
    /// The pairs' own `QualityValue` variants are the type declaration —
    /// there is no separate inference step, since Rust already knows the
    /// type of whatever the caller wrote.
    pub fn new(pairs: impl IntoIterator<Item = (QualityKey, QualityValue)>) -> Self {
        let mut qualities = FxHashMap::default();
        for (key, value) in pairs {
            if !value.is_falsy() {
                qualities.insert(key, value);
            }
        }
        State { qualities }
    }

    #[must_use]
    pub fn qualities(&self) -> &FxHashMap<QualityKey, QualityValue> {
        &self.qualities
    }

    #[must_use]
    pub fn get(&self, key: &QualityKey) -> Option<&QualityValue> {
        self.qualities.get(key)
    }

    /// The schema fragment implied by this state's own values: every key
    /// present, typed by whichever `QualityValue` variant it was built
    /// with. Scenario assembly merges this with every other state's,
    /// action's, and test's fragment (see [`crate::scenario`]).
    #[must_use]
    pub fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for (key, value) in &self.qualities {
            schema
                .declare(key.clone(), value.ty())
                .expect("a state's own fragment cannot self-conflict");
        }
        schema
    }

    /// `self.contains(other)` holds iff `other <= self`: `self` is at
    /// least as good a state as `other`.  For positive-sense keys,
    /// `self` must carry at least as much of whatever `other` has; for
    /// negative-sense keys, `self`'s burden must be no larger than the
    /// burden `other` would tolerate (expressed, per the original
    /// algebra, as `other.at_least(key, self[key])`).
    #[must_use]
    pub fn contains(&self, other: &State, schema: &Schema) -> bool {
        for (key, want) in &other.qualities {
            let Some(entry) = schema.get(key) else {
                continue;
            };
            if entry.sense == Sense::Positive && !at_least(self.qualities.get(key), want) {
                return false;
            }
        }
        for (key, burden) in &self.qualities {
            let Some(entry) = schema.get(key) else {
                continue;
            };
            if entry.sense == Sense::Negative && !at_least(other.qualities.get(key), burden) {
                return false;
            }
        }
        true
    }

    /// `self <= other`, the strict/partial-order counterpart of
    /// [`State::contains`]: `other.contains(self)`.
    #[must_use]
    pub fn at_most(&self, other: &State, schema: &Schema) -> bool {
        other.contains(self, schema)
    }

    /// Whether this state has at least `want` of a single positive-sense
    /// quality, or at most `want` of a single negative-sense one,
    /// depending on the key's declared sense — the constraint the `Has`
    /// action checks per key.
    #[must_use]
    pub fn satisfies(&self, key: &QualityKey, want: &QualityValue, schema: &Schema) -> bool {
        match schema.get(key).map(|e| e.sense) {
            Some(Sense::Negative) => at_most(self.qualities.get(key), want),
            _ => at_least(self.qualities.get(key), want),
        }
    }

    /// The greatest lower bound of `self` and `other`:
    /// positive-sense keys take the pessimistic combination (bool AND,
    /// int min, set intersection); negative-sense keys take the
    /// optimistic one (bool OR, int max, set union). A key present in
    /// only one operand drops out entirely for positive sense (absence
    /// is already the pessimistic extreme) and survives unchanged for
    /// negative sense (absence is already the optimistic extreme).
    /// String-valued keys, positive or negative, meet to their shared
    /// value or drop out if they disagree — meet on negative-sense
    /// strings has no principled "more negative" direction, so this
    /// crate treats it the same as the positive case (see `DESIGN.md`).
    #[must_use]
    pub fn meet(&self, other: &State, schema: &Schema) -> State {
        let mut keys: std::collections::HashSet<&QualityKey> = std::collections::HashSet::new();
        keys.extend(self.qualities.keys());
        keys.extend(other.qualities.keys());

        let mut qualities = FxHashMap::default();
        for key in keys {
            let Some(entry) = schema.get(key) else {
                continue;
            };
            let a = self.qualities.get(key);
            let b = other.qualities.get(key);
            let merged = match entry.sense {
                Sense::Positive => match (a, b) {
                    (Some(a), Some(b)) => meet_pessimistic(a, b),
                    _ => None,
                },
                Sense::Negative => match (a, b) {
                    (Some(a), Some(b)) => meet_optimistic(a, b),
                    (Some(a), None) => Some(a.clone()),
                    (None, Some(b)) => Some(b.clone()),
                    (None, None) => None,
                },
            };
            if let Some(value) = merged {
                if !value.is_falsy() {
                    qualities.insert(key.clone(), value);
                }
            }
        }
        State { qualities }
    }

    /// Returns a copy of this state with `key` updated to `value`,
    /// coerced to the key's schema type: a lone string or single-element
    /// set is folded into an existing set-valued quality rather than
    /// replacing it; every other type must already match.
    pub fn add_quality(
        &self,
        key: &QualityKey,
        value: QualityValue,
        schema: &Schema,
    ) -> Result<State, SchemaError> {
        let entry = schema
            .get(key)
            .ok_or_else(|| SchemaError::UndeclaredQuality(key.clone()))?;
        let mut qualities = self.qualities.clone();
        if entry.ty == ValueType::Set {
            let member = match &value {
                QualityValue::Str(s) => s.clone(),
                QualityValue::Set(set) if set.len() == 1 => set.iter().next().unwrap().clone(),
                _ => {
                    return Err(SchemaError::ValueTypeMismatch {
                        key: key.clone(),
                        expected: ValueType::Set,
                        got: value.ty(),
                    });
                }
            };
            let mut set = match qualities.remove(key) {
                Some(QualityValue::Set(existing)) => existing,
                _ => std::collections::BTreeSet::new(),
            };
            set.insert(member);
            qualities.insert(key.clone(), QualityValue::Set(set));
        } else if value.ty() == entry.ty {
            if value.is_falsy() {
                qualities.remove(key);
            } else {
                qualities.insert(key.clone(), value);
            }
        } else {
            return Err(SchemaError::ValueTypeMismatch {
                key: key.clone(),
                expected: entry.ty,
                got: value.ty(),
            });
        }
        Ok(State { qualities })
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.qualities == other.qualities
    }
}

impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // `FxHashMap` has no `Hash` impl (its iteration order isn't
        // stable), so hash a key-sorted snapshot instead. `ArcIntern`'s
        // `Ord` compares the interned content, not the pointer, so this
        // sort is deterministic across runs and processes.
        let mut entries: Vec<_> = self.qualities.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.len().hash(state);
        for (key, value) in entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

fn at_least(have: Option<&QualityValue>, want: &QualityValue) -> bool {
    if want.is_falsy() {
        return true;
    }
    let Some(have) = have else {
        return false;
    };
    match (have, want) {
        (QualityValue::Bool(h), QualityValue::Bool(w)) => h == w,
        (QualityValue::Int(h), QualityValue::Int(w)) => h >= w,
        (QualityValue::Set(h), QualityValue::Set(w)) => h.is_superset(w),
        (QualityValue::Str(h), QualityValue::Str(w)) => h == w,
        _ => false,
    }
}

fn at_most(have: Option<&QualityValue>, want: &QualityValue) -> bool {
    if want.is_falsy() {
        return match have {
            None => true,
            Some(have) => have.is_falsy(),
        };
    }
    let Some(have) = have else {
        return true;
    };
    match (have, want) {
        (QualityValue::Int(h), QualityValue::Int(w)) => h <= w,
        (QualityValue::Set(h), QualityValue::Set(w)) => h.is_subset(w),
        (QualityValue::Bool(h), QualityValue::Bool(w)) => h == w,
        (QualityValue::Str(h), QualityValue::Str(w)) => h == w,
        _ => false,
    }
}

fn meet_pessimistic(a: &QualityValue, b: &QualityValue) -> Option<QualityValue> {
    match (a, b) {
        (QualityValue::Bool(x), QualityValue::Bool(y)) => Some(QualityValue::Bool(*x && *y)),
        (QualityValue::Int(x), QualityValue::Int(y)) => Some(QualityValue::Int((*x).min(*y))),
        (QualityValue::Set(x), QualityValue::Set(y)) => {
            Some(QualityValue::Set(x.intersection(y).cloned().collect()))
        }
        (QualityValue::Str(x), QualityValue::Str(y)) => (x == y).then(|| a.clone()),
        _ => None,
    }
}

fn meet_optimistic(a: &QualityValue, b: &QualityValue) -> Option<QualityValue> {
    match (a, b) {
        (QualityValue::Bool(x), QualityValue::Bool(y)) => Some(QualityValue::Bool(*x || *y)),
        (QualityValue::Int(x), QualityValue::Int(y)) => Some(QualityValue::Int((*x).max(*y))),
        (QualityValue::Set(x), QualityValue::Set(y)) => {
            Some(QualityValue::Set(x.union(y).cloned().collect()))
        }
        (QualityValue::Str(x), QualityValue::Str(y)) => (x == y).then(|| a.clone()),
        _ => None,
    }
}
