//! Preferred-set computation: of a set of candidate states, which
//! ones are *not* strictly dominated by another member of the same set.
//! "Strictly dominates" is defined once, against the
//! [`pareto_front::Dominate`] trait, so this module and any future
//! scoring work share one notion of it instead of reimplementing it.

use crate::{schema::Schema, state::State};
use pareto_front::Dominate;

/// Above this many candidates the quadratic trumped-check is skipped
/// outright and every candidate is reported preferred.
pub const TRUMP_CHECK_LIMIT: usize = 20;

struct Candidate<'a> {
    state: &'a State,
    schema: &'a Schema,
}

impl Dominate for Candidate<'_> {
    fn dominate(&self, other: &Self) -> bool {
        self.state != other.state && self.state.contains(other.state, self.schema)
    }
}

/// The subset of `states` not trumped by any other member of `states`.
/// Order is preserved; for more than [`TRUMP_CHECK_LIMIT`] candidates the
/// O(n^2) check is skipped and every candidate is returned, with a
/// debug-level log noting the skip.
#[must_use]
pub fn preferred<'a>(states: &[&'a State], schema: &Schema) -> Vec<&'a State> {
    if states.len() > TRUMP_CHECK_LIMIT {
        log::debug!(
            "skipping trumped-state check for {} candidates (limit {TRUMP_CHECK_LIMIT})",
            states.len()
        );
        return states.to_vec();
    }

    let candidates: Vec<Candidate<'a>> =
        states.iter().map(|state| Candidate { state, schema }).collect();

    candidates
        .iter()
        .enumerate()
        .filter(|(i, candidate)| {
            !candidates
                .iter()
                .enumerate()
                .any(|(j, other)| *i != j && other.dominate(candidate))
        })
        .map(|(_, candidate)| candidate.state)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{schema::ValueType, value::{QualityValue, intern_key}};

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.declare(intern_key("gold"), ValueType::Int).unwrap();
        schema.declare(intern_key("fame"), ValueType::Int).unwrap();
        schema
    }

    #[test]
    fn dominated_state_is_excluded() {
        let schema = schema();
        let rich = State::new([(intern_key("gold"), QualityValue::Int(10)), (intern_key("fame"), QualityValue::Int(10))]);
        let poor = State::new([(intern_key("gold"), QualityValue::Int(1)), (intern_key("fame"), QualityValue::Int(1))]);
        let states = vec![&rich, &poor];
        let result = preferred(&states, &schema);
        assert_eq!(result, vec![&rich]);
    }

    #[test]
    fn incomparable_states_both_survive() {
        let schema = schema();
        let gold_heavy = State::new([(intern_key("gold"), QualityValue::Int(10)), (intern_key("fame"), QualityValue::Int(1))]);
        let fame_heavy = State::new([(intern_key("gold"), QualityValue::Int(1)), (intern_key("fame"), QualityValue::Int(10))]);
        let states = vec![&gold_heavy, &fame_heavy];
        let result = preferred(&states, &schema);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn beyond_limit_skips_check() {
        let schema = schema();
        let pool: Vec<State> = (0..(TRUMP_CHECK_LIMIT as i64) + 1)
            .map(|n| State::new([(intern_key("gold"), QualityValue::Int(n + 1))]))
            .collect();
        let refs: Vec<&State> = pool.iter().collect();
        let result = preferred(&refs, &schema);
        assert_eq!(result.len(), refs.len());
    }
}
