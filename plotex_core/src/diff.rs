//! Structured diffs. Rendering a diff into `+k`/`-k`/`k=+n`/`k=[+a,-b]`
//! text is a CLI boundary concern; the core only has to hand back the
//! list of changed keys.

use crate::{QualityKey, schema::Schema, value::QualityValue};
use internment::ArcIntern;
use std::collections::BTreeSet;

/// What changed about a single quality between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffValue {
    BoolGained,
    BoolLost,
    StrSet(ArcIntern<str>),
    StrLost,
    IntDelta(i64),
    SetDelta {
        added: BTreeSet<ArcIntern<str>>,
        removed: BTreeSet<ArcIntern<str>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub key: QualityKey,
    pub value: DiffValue,
}

/// The quality-by-quality delta of `from` relative to `base`, omitting
/// unchanged keys. Keys are returned in schema-declaration order; the
/// CLI is responsible for sorting them for display.
#[must_use]
pub fn diff(from: &crate::state::State, base: &crate::state::State, schema: &Schema) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let mut keys: std::collections::HashSet<&QualityKey> = std::collections::HashSet::new();
    keys.extend(from.qualities().keys());
    keys.extend(base.qualities().keys());

    for key in keys {
        let Some(entry) = schema.get(key) else {
            continue;
        };
        let a = from.qualities().get(key);
        let b = base.qualities().get(key);
        let value = match entry.ty {
            crate::schema::ValueType::Bool => match (a, b) {
                (Some(QualityValue::Bool(true)), None | Some(QualityValue::Bool(false))) => {
                    Some(DiffValue::BoolGained)
                }
                (None | Some(QualityValue::Bool(false)), Some(QualityValue::Bool(true))) => {
                    Some(DiffValue::BoolLost)
                }
                _ => None,
            },
            crate::schema::ValueType::Str => match (a, b) {
                (Some(QualityValue::Str(s)), other) => {
                    let changed = !matches!(other, Some(QualityValue::Str(o)) if o == s);
                    changed.then(|| DiffValue::StrSet(s.clone()))
                }
                (None, Some(QualityValue::Str(_))) => Some(DiffValue::StrLost),
                _ => None,
            },
            crate::schema::ValueType::Int => {
                let av = int_of(a);
                let bv = int_of(b);
                (av != bv).then_some(DiffValue::IntDelta(av - bv))
            }
            crate::schema::ValueType::Set => {
                let aset = set_of(a);
                let bset = set_of(b);
                let added: BTreeSet<_> = aset.difference(bset).cloned().collect();
                let removed: BTreeSet<_> = bset.difference(aset).cloned().collect();
                (!added.is_empty() || !removed.is_empty())
                    .then_some(DiffValue::SetDelta { added, removed })
            }
        };
        if let Some(value) = value {
            entries.push(DiffEntry { key: key.clone(), value });
        }
    }
    entries
}

fn int_of(v: Option<&QualityValue>) -> i64 {
    match v {
        Some(QualityValue::Int(n)) => *n,
        _ => 0,
    }
}

static EMPTY_SET: BTreeSet<ArcIntern<str>> = BTreeSet::new();

fn set_of(v: Option<&QualityValue>) -> &BTreeSet<ArcIntern<str>> {
    match v {
        Some(QualityValue::Set(s)) => s,
        _ => &EMPTY_SET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::ValueType, state::State, value::intern_key};

    fn schema_with(keys: &[(&str, ValueType)]) -> Schema {
        let mut schema = Schema::new();
        for (k, ty) in keys {
            schema.declare(intern_key(k), *ty).unwrap();
        }
        schema
    }

    #[test]
    fn bool_gain_and_loss() {
        let schema = schema_with(&[("sword", ValueType::Bool)]);
        let has = State::new([(intern_key("sword"), QualityValue::Bool(true))]);
        let empty = State::empty();
        let d = diff(&has, &empty, &schema);
        assert_eq!(d, vec![DiffEntry { key: intern_key("sword"), value: DiffValue::BoolGained }]);
        let d = diff(&empty, &has, &schema);
        assert_eq!(d, vec![DiffEntry { key: intern_key("sword"), value: DiffValue::BoolLost }]);
    }

    #[test]
    fn int_delta_both_directions() {
        let schema = schema_with(&[("gold", ValueType::Int)]);
        let five = State::new([(intern_key("gold"), QualityValue::Int(5))]);
        let two = State::new([(intern_key("gold"), QualityValue::Int(2))]);
        assert_eq!(
            diff(&five, &two, &schema),
            vec![DiffEntry { key: intern_key("gold"), value: DiffValue::IntDelta(3) }]
        );
        assert_eq!(
            diff(&two, &five, &schema),
            vec![DiffEntry { key: intern_key("gold"), value: DiffValue::IntDelta(-3) }]
        );
    }
}
