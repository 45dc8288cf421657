//! Graphviz emission: a `.gv` text file with one filled-circle
//! node per result state and one labeled edge per parent/child relation.
//! Hand-written templated text, matching the corpus's own preference for
//! not pulling in a graph-drawing crate for a handful of lines of `dot`.

use itertools::Itertools;
use plotex_core::graph::Graph;
use std::fmt::Write as _;

/// Build the `.gv` source for `graph`. A node is green-filled when its
/// index is in `matched` (the CLI's `--filter`/`--history` criteria),
/// gray otherwise; terminal (childless) nodes get a heavier outline.
#[must_use]
pub fn render(graph: &Graph, matched: &[bool]) -> String {
    let mut out = String::new();
    writeln!(out, "digraph plotex {{").unwrap();
    for (index, node) in graph.nodes.iter().enumerate() {
        let fill = if matched.get(index).copied().unwrap_or(false) { "green" } else { "gray" };
        let penwidth = if node.children.is_empty() { 3 } else { 1 };
        writeln!(
            out,
            "  n{index} [label=\"{index}\", shape=circle, style=filled, fillcolor={fill}, penwidth={penwidth}];"
        )
        .unwrap();
    }
    for (from, node) in graph.nodes.iter().enumerate() {
        let mut by_child: std::collections::BTreeMap<usize, Vec<&str>> = std::collections::BTreeMap::new();
        for (action, child) in &node.children {
            by_child.entry(*child).or_default().push(action.as_str());
        }
        for (child, actions) in by_child {
            let label = actions.iter().join("\\n");
            writeln!(out, "  n{from} -> n{child} [label=\"{label}\"];").unwrap();
        }
    }
    writeln!(out, "}}").unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotex_core::{scenario::ScenarioBuilder, state::State};

    #[test]
    fn renders_start_node_and_edge() {
        let scenario = ScenarioBuilder::new()
            .action(
                "flip",
                plotex_core::Action::from(plotex_core::action::Set::new(
                    plotex_core::value::intern_key("sword"),
                    plotex_core::QualityValue::Bool(true),
                )),
            )
            .build()
            .unwrap();
        let graph = Graph::run(State::empty(), &scenario, Some(4));
        let matched = vec![false; graph.nodes.len()];
        let gv = render(&graph, &matched);
        assert!(gv.starts_with("digraph plotex {"));
        assert!(gv.contains("n0"));
    }
}
