//! Scenario assembly: a `ScenarioBuilder` collects named states, actions,
//! and tests, then merges their schema fragments into one `Schema`.
//! There is no reflection-driven registration here; the caller lists
//! everything explicitly, and a type conflict between two fragments
//! aborts the whole build before anything is usable.

use crate::{
    action::Action,
    error::{NameKind, PlotexError},
    schema::Schema,
    state::State,
    test_runner::Test,
};
use fxhash::FxHashMap;

#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    states: Vec<(String, State)>,
    actions: Vec<(String, Action)>,
    tests: Vec<(String, Test)>,
}

impl ScenarioBuilder {
    #[must_use]
    pub fn new() -> Self {
        ScenarioBuilder::default()
    }

    #[must_use]
    pub fn state(mut self, name: impl Into<String>, state: State) -> Self {
        self.states.push((name.into(), state));
        self
    }

    #[must_use]
    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.push((name.into(), action));
        self
    }

    #[must_use]
    pub fn test(mut self, name: impl Into<String>, test: Test) -> Self {
        self.tests.push((name.into(), test));
        self
    }

    /// Merge every state's, action's, and test's schema fragment and
    /// assemble the final `Scenario`. Fails on the first type conflict
    /// between fragments.
    pub fn build(self) -> Result<Scenario, PlotexError> {
        let mut schema = Schema::new();
        for (_, state) in &self.states {
            schema.merge(&state.schema_fragment())?;
        }
        for (_, action) in &self.actions {
            schema.merge(&action.schema_fragment())?;
        }
        for (_, test) in &self.tests {
            schema.merge(&test.schema_fragment())?;
        }

        Ok(Scenario {
            schema,
            states: self.states.into_iter().collect(),
            actions: self.actions.into_iter().collect(),
            tests: self.tests.into_iter().collect(),
        })
    }
}

/// An assembled scenario: the merged `Schema` plus every named state,
/// action, and test. Owns the canonical schema for the lifetime of a
/// run; `State`/`Action` operations borrow it rather than reaching for a
/// process-wide global.
#[derive(Debug)]
pub struct Scenario {
    schema: Schema,
    states: FxHashMap<String, State>,
    actions: FxHashMap<String, Action>,
    tests: FxHashMap<String, Test>,
}

impl Scenario {
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self, name: &str) -> Result<&State, PlotexError> {
        self.states
            .get(name)
            .ok_or_else(|| PlotexError::UnknownName { kind: NameKind::State, name: name.to_owned() })
    }

    pub fn action(&self, name: &str) -> Result<&Action, PlotexError> {
        self.actions
            .get(name)
            .ok_or_else(|| PlotexError::UnknownName { kind: NameKind::Action, name: name.to_owned() })
    }

    pub fn test(&self, name: &str) -> Result<&Test, PlotexError> {
        self.tests
            .get(name)
            .ok_or_else(|| PlotexError::UnknownName { kind: NameKind::Test, name: name.to_owned() })
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.keys().map(String::as_str)
    }

    pub fn actions(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action))
    }

    pub fn tests(&self) -> impl Iterator<Item = (&str, &Test)> {
        self.tests.iter().map(|(name, test)| (name.as_str(), test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::Increment,
        value::{QualityValue, intern_key},
    };

    #[test]
    fn build_merges_schema_fragments() {
        let scenario = ScenarioBuilder::new()
            .state("start", State::new([(intern_key("gold"), QualityValue::Int(1))]))
            .action("earn", Action::from(Increment::new(intern_key("gold"), 5)))
            .build()
            .unwrap();
        assert!(scenario.schema().contains(&intern_key("gold")));
        assert!(scenario.state("start").is_ok());
        assert!(scenario.state("missing").is_err());
    }

    #[test]
    fn build_rejects_conflicting_fragments() {
        let scenario = ScenarioBuilder::new()
            .state("a", State::new([(intern_key("gold"), QualityValue::Int(1))]))
            .state(
                "b",
                State::new([(intern_key("gold"), crate::value::singleton_set("nope"))]),
            )
            .build();
        assert!(scenario.is_err());
    }
}
