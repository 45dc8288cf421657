//! The search engine: BFS over reachable states, exploiting the
//! partial order so that a state's "maximal" — what you reach by
//! greedily applying every improving action until none apply — is
//! computed once per node instead of once per action.

use crate::{
    action::{ActionLike, EquivHint},
    schema::Schema,
    scenario::Scenario,
    state::State,
};
use fxhash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// A single visited state. Most entries are closure intermediates — a
/// state passed through on the way to some maximal, never itself a
/// frontier state — and carry only `state`/`maximal`/`maximal_chain`;
/// `children`/`parents`/`ancestors`/`action_history` are only ever
/// populated for entries that reached the frontier (where
/// `state == maximal`).
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// The raw state this entry represents.
    pub state: State,
    /// The fixpoint reached by greedily improving from `state`.
    pub maximal: State,
    /// The actions remaining, from `state`, to reach `maximal`.
    pub maximal_chain: Vec<String>,
    /// Outgoing frontier edges: `(action name, child node index)`.
    pub children: Vec<(String, usize)>,
    /// Incoming frontier edges, by parent node index.
    pub parents: Vec<usize>,
    /// The full action path from the search's start state to `maximal`.
    pub action_history: Vec<String>,
    /// Every frontier node index already known to lie on some path that
    /// led here — checked to reject a transition that would only
    /// re-close a cycle already explored.
    pub ancestors: FxHashSet<usize>,
}

/// The result of a search run: every state visited, including closure
/// intermediates, indexed by position, plus the index of the start
/// state's own entry.
#[derive(Debug, Clone)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub start: usize,
}

impl Graph {
    #[must_use]
    pub fn node(&self, index: usize) -> &GraphNode {
        &self.nodes[index]
    }

    /// Every visited state, in discovery order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.nodes.iter().map(|n| &n.state)
    }

    /// Run the BFS-with-maximization search from `start` using every
    /// action the scenario declares. `generation_limit` bounds the
    /// number of distinct maximal states reached; when the frontier is
    /// cut off before exhausting, the partial graph is returned and a
    /// warning is logged rather than an error.
    #[must_use]
    pub fn run(start: State, scenario: &Scenario, generation_limit: Option<usize>) -> Graph {
        let mut action_names: Vec<&str> = scenario.action_names().collect();
        action_names.sort_unstable();
        Graph::run_with_actions(start, scenario, &action_names, generation_limit, false)
    }

    /// As [`Graph::run`], but exploring only the named actions — the
    /// core of a test's `block` option and the CLI's `--block` flag,
    /// which exclude specific actions from the search entirely rather
    /// than filtering results after the fact.
    ///
    /// Unless `noopt`, actions are split by their hint: everything but
    /// `Loss` feeds the improvement closure, since a `Same`/`Improve`/
    /// `Unknown`-hinted action might still be the one that advances a
    /// state; only `Loss`/`Unknown`-hinted actions are retried when
    /// expanding the frontier, since a `Same`/`Improve`-hinted action
    /// can't produce a new frontier edge the closure wouldn't already
    /// have absorbed. `noopt` (the CLI's `--noopt`) disables the split:
    /// both roles see every action, at the cost of redundant work, with
    /// the partial order itself still the final word on whether a step
    /// is accepted.
    #[must_use]
    pub fn run_with_actions(
        start: State,
        scenario: &Scenario,
        action_names: &[&str],
        generation_limit: Option<usize>,
        noopt: bool,
    ) -> Graph {
        let schema = scenario.schema();
        let (improve_actions, change_actions) = partition_actions(scenario, action_names, noopt);

        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut node_table: FxHashMap<State, usize> = FxHashMap::default();

        let start_index = find_maximal_state(&mut nodes, &mut node_table, start, scenario, &improve_actions, schema);
        nodes[start_index].action_history = nodes[start_index].maximal_chain.clone();

        let mut frontier: VecDeque<usize> = VecDeque::new();
        frontier.push_back(start_index);
        let mut distinct_maximals: FxHashSet<State> = FxHashSet::default();
        distinct_maximals.insert(nodes[start_index].maximal.clone());

        let mut cut_off = false;

        while let Some(index) = frontier.pop_front() {
            if let Some(limit) = generation_limit {
                if distinct_maximals.len() >= limit {
                    cut_off = true;
                    break;
                }
            }

            let current_state = nodes[index].state.clone();
            let mut discovered = Vec::new();
            for &name in &change_actions {
                let action = scenario
                    .action(name)
                    .expect("name came from the scenario's own action table");
                let Some(next_state) = action.apply(&current_state, schema) else {
                    continue;
                };
                discovered.push((name.to_owned(), next_state));
            }

            for (name, next_state) in discovered {
                let child_index =
                    find_maximal_state(&mut nodes, &mut node_table, next_state.clone(), scenario, &improve_actions, schema);
                let child_maximal = nodes[child_index].maximal.clone();

                // No progress: this transition's closure lands right
                // back on the parent's own maximal.
                if child_maximal == current_state {
                    continue;
                }
                // Ancestor cycle: the child's maximal already lies on
                // the path that reached the parent, so accepting the
                // edge would only re-close an already-explored loop.
                if nodes[index].ancestors.contains(&child_index) {
                    continue;
                }

                let raw_index = *node_table
                    .get(&next_state)
                    .expect("find_maximal_state installs the state it was given");
                let mut action_history = nodes[index].action_history.clone();
                action_history.push(name.clone());
                action_history.extend(nodes[raw_index].maximal_chain.clone());

                let mut ancestors = nodes[index].ancestors.clone();
                ancestors.insert(index);
                nodes[child_index].ancestors.extend(ancestors);

                if distinct_maximals.insert(child_maximal.clone()) {
                    nodes[child_index].action_history = action_history;
                    frontier.push_back(child_index);
                }

                nodes[index].children.push((name, child_index));
                nodes[child_index].parents.push(index);
            }
        }

        if cut_off {
            log::warn!(
                "generation limit {} reached with {} distinct maximal states; returning partial graph",
                generation_limit.unwrap_or_default(),
                distinct_maximals.len()
            );
        }

        Graph { nodes, start: start_index }
    }
}

/// Split `action_names` into the improvement-closure list and the
/// frontier-expansion list. See [`Graph::run_with_actions`] for the
/// rationale.
fn partition_actions<'a>(scenario: &Scenario, action_names: &[&'a str], noopt: bool) -> (Vec<&'a str>, Vec<&'a str>) {
    if noopt {
        return (action_names.to_vec(), action_names.to_vec());
    }
    let mut improve = Vec::new();
    let mut change = Vec::new();
    for &name in action_names {
        let action = scenario
            .action(name)
            .expect("name came from the scenario's own action table");
        match action.hint() {
            EquivHint::Loss => change.push(name),
            EquivHint::Unknown => {
                improve.push(name);
                change.push(name);
            }
            EquivHint::Same | EquivHint::Improve => improve.push(name),
        }
    }
    (improve, change)
}

enum Resolution {
    /// The walk reached a fixpoint at this raw state: it is its own maximal.
    Maximal(State),
    /// The walk stepped onto a state the table already knows; its
    /// maximal (and the remaining chain to it) is reused rather than
    /// walked again.
    Known(usize),
}

/// Walk the improvement closure from `start`, installing every state
/// visited along the way — not just the final maximal — into
/// `nodes`/`node_table`, then return the index of the entry keyed by the
/// maximal itself.
fn find_maximal_state(
    nodes: &mut Vec<GraphNode>,
    node_table: &mut FxHashMap<State, usize>,
    start: State,
    scenario: &Scenario,
    improve_actions: &[&str],
    schema: &Schema,
) -> usize {
    if let Some(&idx) = node_table.get(&start) {
        let maximal = nodes[idx].maximal.clone();
        return *node_table
            .get(&maximal)
            .expect("a recorded maximal always has its own table entry");
    }

    let mut chain_states = vec![start.clone()];
    let mut chain_actions: Vec<String> = Vec::new();
    let mut visited: FxHashSet<State> = FxHashSet::default();
    visited.insert(start.clone());
    let mut current = start;

    let resolution = loop {
        let mut advanced = None;
        for &name in improve_actions {
            let action = scenario
                .action(name)
                .expect("name came from the scenario's own action table");
            let Some(candidate) = action.apply(&current, schema) else {
                continue;
            };
            if candidate == current || !candidate.contains(&current, schema) {
                continue;
            }
            advanced = Some((name.to_owned(), candidate));
            break;
        }

        let Some((name, candidate)) = advanced else {
            break Resolution::Maximal(current);
        };

        if let Some(&known_idx) = node_table.get(&candidate) {
            chain_actions.push(name);
            break Resolution::Known(known_idx);
        }

        if !visited.insert(candidate.clone()) {
            // Revisiting a state means the greedy walk found a cycle; a
            // lying hint can't be trusted to terminate on its own.
            log::warn!("improvement closure cycled back to a visited state; stopping early");
            break Resolution::Maximal(current);
        }

        chain_actions.push(name);
        chain_states.push(candidate.clone());
        current = candidate;
    };

    let (maximal_state, known_suffix) = match resolution {
        Resolution::Maximal(state) => (state, Vec::new()),
        Resolution::Known(known_idx) => (nodes[known_idx].maximal.clone(), nodes[known_idx].maximal_chain.clone()),
    };

    for (i, state) in chain_states.into_iter().enumerate() {
        let mut remaining: Vec<String> = chain_actions[i..].to_vec();
        remaining.extend(known_suffix.clone());
        let idx = nodes.len();
        nodes.push(GraphNode {
            state: state.clone(),
            maximal: maximal_state.clone(),
            maximal_chain: remaining,
            children: Vec::new(),
            parents: Vec::new(),
            action_history: Vec::new(),
            ancestors: FxHashSet::default(),
        });
        node_table.insert(state, idx);
    }

    *node_table
        .get(&maximal_state)
        .expect("the chain just built installs its own maximal, or borrows one already present")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{Action, Decrement, Increment, Set},
        scenario::ScenarioBuilder,
        value::{QualityValue, intern_key},
    };

    #[test]
    fn closure_applies_improve_until_fixpoint() {
        let scenario = ScenarioBuilder::new()
            .action("pickup", Action::from(crate::action::Include::new(intern_key("tools"), "rope")))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(10));
        let start = graph.node(graph.start);
        // Adding the same rope twice is a no-op, so the closure reaches a
        // fixpoint after a single application.
        assert_eq!(start.action_history, vec!["pickup".to_owned()]);
        assert_eq!(start.maximal.get(&intern_key("tools")), Some(&crate::value::singleton_set("rope")));
    }

    #[test]
    fn closure_intermediate_states_are_their_own_nodes() {
        let scenario = ScenarioBuilder::new()
            .action("earn5", Action::from(Increment::new(intern_key("gold"), 5)))
            .action("earn1", Action::from(Increment::new(intern_key("gold"), 1)))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(10));
        // The raw (empty) start state is distinct from the maximal it
        // improves to, and must still appear as its own table entry.
        assert!(graph.nodes.iter().any(|n| n.state == State::empty() && n.state != n.maximal));
    }

    #[test]
    fn frontier_rejects_no_progress_transitions() {
        let scenario = ScenarioBuilder::new()
            .action("earn", Action::from(Increment::new(intern_key("gold"), 5)))
            .action("sword", Action::from(Set::new(intern_key("sword"), QualityValue::Bool(true))))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(10));
        let start = graph.node(graph.start);
        // "sword" only ever improves, so its effect is already absorbed
        // by the closure; reapplying it from the maximal can't produce a
        // distinct child and must not appear as a frontier edge.
        assert!(start.children.iter().all(|(name, _)| name != "sword"));
    }

    #[test]
    fn generation_limit_bounds_distinct_maximals() {
        let scenario = ScenarioBuilder::new()
            .action("bump", Action::from(Increment::new(intern_key("gold"), 1)))
            .action("drop", Action::from(Decrement::new(intern_key("gold"), 1)))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(3));
        let distinct: FxHashSet<&State> = graph.nodes.iter().map(|n| &n.maximal).collect();
        assert!(distinct.len() <= 3);
    }

    #[test]
    fn action_history_tracks_path_to_each_maximal() {
        let scenario = ScenarioBuilder::new()
            .action("flip", Action::from(Set::new(intern_key("sword"), QualityValue::Bool(true))))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(10));
        let reached_sword = graph
            .nodes
            .iter()
            .find(|n| n.state == n.maximal && n.state.get(&intern_key("sword")).is_some())
            .expect("the sword-bearing maximal must be reachable");
        assert_eq!(reached_sword.action_history, vec!["flip".to_owned()]);
    }

    #[test]
    fn run_reaches_a_bounded_state_space() {
        use crate::action::Has;
        let scenario = ScenarioBuilder::new()
            .action(
                "earn_once",
                Action::from(crate::action::Once::new(
                    intern_key("_earned"),
                    Action::from(Increment::new(intern_key("gold"), 3)),
                )),
            )
            .action("spend", Action::from(Decrement::new(intern_key("gold"), 1)))
            .action("broke", Action::from(Has::new(intern_key("gold"), QualityValue::Int(0))))
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(10));
        assert!(graph.nodes.len() > 1);
        assert!(graph.states().any(|s| s.get(&intern_key("gold")).is_none()));
    }
}
