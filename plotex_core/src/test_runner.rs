//! The test runner: a test runs its own search (optionally from an
//! alternate start state, optionally with some actions blocked) and
//! narrows that search's
//! states through a sequence of clauses, in a fixed order — `gets`,
//! `can`, `includes` positively narrow the candidate set; `gets_not`,
//! `cannot`, `excludes` reject it outright if anything still matches.
//! An empty candidate set after any positive clause fails the test
//! immediately without evaluating the rest.

use crate::{
    QualityKey,
    action::{Action, ActionLike},
    graph::Graph,
    scenario::Scenario,
    state::State,
};

/// A single named test.
#[derive(Debug, Clone, Default)]
pub struct Test {
    /// States to search from. Empty means "the scenario's `Start` state".
    pub start_states: Vec<State>,
    /// Action names excluded from this test's own search.
    pub block: Vec<String>,
    /// Every surviving state must carry this quality.
    pub gets: Vec<QualityKey>,
    /// No surviving state may carry this quality.
    pub gets_not: Vec<QualityKey>,
    /// Every one of these predicate actions must apply to at least one
    /// surviving state.
    pub can: Vec<Action>,
    /// None of these predicate actions may apply to any surviving state.
    pub cannot: Vec<Action>,
    /// Every one of these action names must appear in some surviving
    /// state's path from the start.
    pub includes: Vec<String>,
    /// None of these action names may appear in any surviving state's path.
    pub excludes: Vec<String>,
    pub generation_limit: Option<usize>,
}

impl Test {
    #[must_use]
    pub fn new() -> Self {
        Test::default()
    }

    #[must_use]
    pub fn start(mut self, state: State) -> Self {
        self.start_states.push(state);
        self
    }

    #[must_use]
    pub fn block(mut self, action_name: impl Into<String>) -> Self {
        self.block.push(action_name.into());
        self
    }

    #[must_use]
    pub fn gets(mut self, key: QualityKey) -> Self {
        self.gets.push(key);
        self
    }

    #[must_use]
    pub fn gets_not(mut self, key: QualityKey) -> Self {
        self.gets_not.push(key);
        self
    }

    #[must_use]
    pub fn can(mut self, action: Action) -> Self {
        self.can.push(action);
        self
    }

    #[must_use]
    pub fn cannot(mut self, action: Action) -> Self {
        self.cannot.push(action);
        self
    }

    #[must_use]
    pub fn includes(mut self, action_name: impl Into<String>) -> Self {
        self.includes.push(action_name.into());
        self
    }

    #[must_use]
    pub fn excludes(mut self, action_name: impl Into<String>) -> Self {
        self.excludes.push(action_name.into());
        self
    }

    #[must_use]
    pub fn generation_limit(mut self, limit: usize) -> Self {
        self.generation_limit = Some(limit);
        self
    }

    /// The schema fragment implied by this test's own typed pieces:
    /// its start states and its `can`/`cannot` predicate actions.
    /// `gets`/`gets_not`/`includes`/`excludes`/`block` name things
    /// declared elsewhere in the scenario and contribute no type
    /// information of their own.
    #[must_use]
    pub fn schema_fragment(&self) -> crate::schema::Schema {
        let mut schema = crate::schema::Schema::new();
        for state in &self.start_states {
            schema.merge(&state.schema_fragment()).unwrap();
        }
        for action in self.can.iter().chain(&self.cannot) {
            schema.merge(&action.schema_fragment()).unwrap();
        }
        schema
    }

    /// Run this test's search(es) against `scenario` and report the
    /// outcome. Passes only if every one of `start_states` (or the
    /// scenario's `Start` state, if none were given) independently
    /// satisfies every clause.
    pub fn run(&self, name: &str, scenario: &Scenario) -> Result<TestReport, crate::PlotexError> {
        let starts: Vec<State> = if self.start_states.is_empty() {
            vec![scenario.state("Start")?.clone()]
        } else {
            self.start_states.clone()
        };

        let mut allowed: Vec<&str> = scenario
            .action_names()
            .filter(|n| !self.block.iter().any(|b| b == n))
            .collect();
        allowed.sort_unstable();

        let mut passed = true;
        let mut examined = 0;
        for start in starts {
            let graph = Graph::run_with_actions(start, scenario, &allowed, self.generation_limit, false);
            examined += graph.nodes.len();
            if !self.verify(scenario, &graph) {
                passed = false;
            }
        }

        Ok(TestReport { name: name.to_owned(), passed, examined })
    }

    fn verify(&self, scenario: &Scenario, graph: &Graph) -> bool {
        let schema = scenario.schema();
        let mut candidates: Vec<&crate::graph::GraphNode> = graph.nodes.iter().collect();

        for key in &self.gets {
            candidates.retain(|n| n.state.get(key).is_some());
            if candidates.is_empty() {
                return false;
            }
        }
        for action in &self.can {
            candidates.retain(|n| action.apply(&n.state, schema).is_some());
            if candidates.is_empty() {
                return false;
            }
        }
        for name in &self.includes {
            candidates.retain(|n| n.action_history.iter().any(|a| a == name));
            if candidates.is_empty() {
                return false;
            }
        }
        for key in &self.gets_not {
            if candidates.iter().any(|n| n.state.get(key).is_some()) {
                return false;
            }
        }
        for action in &self.cannot {
            if candidates.iter().any(|n| action.apply(&n.state, schema).is_some()) {
                return false;
            }
        }
        for name in &self.excludes {
            if candidates.iter().any(|n| n.action_history.iter().any(|a| a == name)) {
                return false;
            }
        }
        true
    }
}

/// The outcome of running a single [`Test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub name: String,
    pub passed: bool,
    pub examined: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{Has, Increment, Once},
        scenario::ScenarioBuilder,
        value::{QualityValue, intern_key},
    };

    fn scenario() -> Scenario {
        ScenarioBuilder::new()
            .state("Start", State::empty())
            .action(
                "earn",
                Action::from(Once::new(
                    intern_key("_earned"),
                    Action::from(Increment::new(intern_key("gold"), 5)),
                )),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn gets_fails_when_quality_never_reached() {
        let scenario = scenario();
        let test = Test::new().gets(intern_key("wand"));
        let report = test.run("t", &scenario).unwrap();
        assert!(!report.passed);
    }

    #[test]
    fn gets_passes_when_some_state_has_quality() {
        let scenario = scenario();
        let test = Test::new().gets(intern_key("gold"));
        let report = test.run("t", &scenario).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn can_predicate_narrows_candidates() {
        let scenario = scenario();
        let test = Test::new().can(Action::from(Has::new(intern_key("gold"), QualityValue::Int(5))));
        let report = test.run("t", &scenario).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn block_removes_an_action_from_the_search() {
        let scenario = scenario();
        let test = Test::new().block("earn").gets(intern_key("gold"));
        let report = test.run("t", &scenario).unwrap();
        assert!(!report.passed);
    }

    #[test]
    fn includes_requires_action_on_path() {
        let scenario = scenario();
        let test = Test::new().includes("earn");
        let report = test.run("t", &scenario).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn excludes_fails_when_action_was_used() {
        let scenario = scenario();
        let test = Test::new().excludes("earn").gets(intern_key("gold"));
        let report = test.run("t", &scenario).unwrap();
        assert!(!report.passed);
    }
}
