//! Printed state format: `<"Name": k1 k2=v k3=[a,b]>`, keys sorted
//! case-insensitively, bare key for `true` booleans, diff-form prefixes
//! for `--diff` output.

use itertools::Itertools;
use plotex_core::{
    diff::{DiffEntry, DiffValue},
    schema::{Schema, ValueType},
    state::State,
    value::QualityValue,
};

fn sorted_keys(schema: &Schema, present: impl Fn(&plotex_core::QualityKey) -> bool) -> Vec<plotex_core::QualityKey> {
    schema
        .keys()
        .filter(|k| present(k))
        .cloned()
        .sorted_by_key(|k| k.to_lowercase())
        .collect()
}

/// Render a full state as `<"Name": k1 k2=v k3=[a,b]>`.
#[must_use]
pub fn format_state(name: &str, state: &State, schema: &Schema) -> String {
    let keys = sorted_keys(schema, |k| state.get(k).is_some());
    let parts = keys
        .iter()
        .map(|key| {
            let value = state.get(key).expect("filtered to present keys");
            match value {
                QualityValue::Bool(true) => key.to_string(),
                QualityValue::Bool(false) => unreachable!("falsy values are never stored"),
                QualityValue::Int(n) => format!("{key}={n}"),
                QualityValue::Str(s) => format!("{key}={s}"),
                QualityValue::Set(set) => {
                    format!("{key}=[{}]", set.iter().join(","))
                }
            }
        })
        .join(" ");
    format!("<\"{name}\": {parts}>")
}

/// Render a structured diff (see [`plotex_core::diff::diff`]) as
/// `<"Name": +k -k k=+n k=[+a,-b]>`.
#[must_use]
pub fn format_diff(name: &str, mut entries: Vec<DiffEntry>) -> String {
    entries.sort_by(|a, b| a.key.to_lowercase().cmp(&b.key.to_lowercase()));
    let parts = entries
        .iter()
        .map(|entry| match &entry.value {
            DiffValue::BoolGained => format!("+{}", entry.key),
            DiffValue::BoolLost => format!("-{}", entry.key),
            DiffValue::StrSet(s) => format!("{}={}", entry.key, s),
            DiffValue::StrLost => format!("-{}", entry.key),
            DiffValue::IntDelta(n) if *n >= 0 => format!("{}=+{}", entry.key, n),
            DiffValue::IntDelta(n) => format!("{}={}", entry.key, n),
            DiffValue::SetDelta { added, removed } => {
                let added = added.iter().map(|m| format!("+{m}"));
                let removed = removed.iter().map(|m| format!("-{m}"));
                format!("{}=[{}]", entry.key, added.chain(removed).join(","))
            }
        })
        .join(" ");
    format!("<\"{name}\": {parts}>")
}
