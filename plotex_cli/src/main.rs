#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)]

mod format;
mod graphviz;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use itertools::Itertools;
use plotex_core::{
    QualityValue,
    graph::Graph,
    preferred::preferred,
    scenario::Scenario,
    scenarios::test_scenario,
    state::State,
    value::intern_key,
};

/// Explore a scenario's reachable states, or run its named tests.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Starting state name(s), repeatable (default: Start)
    #[arg(short = 's', long = "start")]
    start: Vec<String>,

    /// Boolean qualities added (true) to every starting state
    #[arg(long = "startwith")]
    startwith: Vec<String>,

    /// Actions forbidden for this run
    #[arg(long = "block")]
    block: Vec<String>,

    /// Actions held out of the first pass; after completion the engine
    /// re-runs from the non-trumped survivors with those actions re-enabled
    #[arg(long = "withhold")]
    withhold: Vec<String>,

    /// Run named test(s)
    #[arg(short = 't', long = "test", conflicts_with = "alltest")]
    test: Vec<String>,

    /// Run all tests
    #[arg(short = 'T', long = "alltest")]
    alltest: bool,

    /// Override the generation limit
    #[arg(long = "genlimit", default_value_t = 10_000)]
    genlimit: usize,

    /// Include intermediate (non-maximal) states
    #[arg(short = 'm', long = "showmed")]
    showmed: bool,
    /// Print each state's in-edges
    #[arg(long = "showin")]
    showin: bool,
    /// Print each state's out-edges
    #[arg(long = "showout")]
    showout: bool,
    /// showmed + showin + showout
    #[arg(short = 'a', long = "showall")]
    showall: bool,
    /// Print each state as a delta from the meet of all results
    #[arg(short = 'd', long = "diff")]
    diff: bool,
    /// Print only the summary counts
    #[arg(short = 'c', long = "count")]
    count: bool,
    /// Emit a Graphviz file
    #[arg(long = "graph")]
    graph: Option<PathBuf>,
    /// Retain only states containing the given quality
    #[arg(short = 'f', long = "filter")]
    filter: Vec<String>,
    /// Retain only states whose history includes the given action
    #[arg(short = 'H', long = "history")]
    history: Vec<String>,
    /// Disable the improve/change partition (use all actions in both roles)
    #[arg(long = "noopt")]
    noopt: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let scenario = test_scenario::build();

    if cli.alltest || !cli.test.is_empty() {
        return run_tests(&scenario, &cli);
    }
    run_exploration(&scenario, &cli)
}

fn run_tests(scenario: &Scenario, cli: &Cli) -> Result<()> {
    let names: Vec<String> = if cli.alltest {
        scenario.test_names().map(str::to_owned).sorted().collect()
    } else {
        cli.test.clone()
    };

    let mut failures = 0;
    for name in &names {
        let test = scenario.test(name)?;
        let report = test.run(name, scenario)?;
        if report.passed {
            println!("PASS {name} ({} states examined)", report.examined);
        } else {
            println!("FAIL {name} ({} states examined)", report.examined);
            failures += 1;
        }
    }

    if failures > 0 {
        return Err(eyre!("{failures} of {} test(s) failed", names.len()));
    }
    Ok(())
}

fn run_exploration(scenario: &Scenario, cli: &Cli) -> Result<()> {
    let schema = scenario.schema();

    let start_names: Vec<String> =
        if cli.start.is_empty() { vec!["Start".to_owned()] } else { cli.start.clone() };

    let mut starts = Vec::new();
    for name in &start_names {
        let mut state = scenario.state(name)?.clone();
        for key in &cli.startwith {
            state = state.add_quality(&intern_key(key), QualityValue::Bool(true), schema)?;
        }
        starts.push(state);
    }

    let mut allowed: Vec<&str> = scenario
        .action_names()
        .filter(|n| !cli.block.iter().any(|b| b == n))
        .filter(|n| !cli.withhold.iter().any(|w| w == n))
        .collect();
    allowed.sort_unstable();

    let mut full: Vec<&str> = scenario.action_names().filter(|n| !cli.block.iter().any(|b| b == n)).collect();
    full.sort_unstable();

    let limit = Some(cli.genlimit);
    let mut graphs: Vec<Graph> =
        starts.iter().cloned().map(|start| Graph::run_with_actions(start, scenario, &allowed, limit, cli.noopt)).collect();

    if !cli.withhold.is_empty() {
        let maximals: Vec<State> = graphs.iter().flat_map(|g| g.states().cloned()).collect();
        let refs: Vec<&State> = maximals.iter().collect();
        let survivors = preferred(&refs, schema);
        graphs = survivors
            .into_iter()
            .map(|state| Graph::run_with_actions(state.clone(), scenario, &full, limit, cli.noopt))
            .collect();
    }

    let all_states: Vec<&State> = graphs.iter().flat_map(Graph::states).collect();
    let meet_base = all_states
        .iter()
        .copied()
        .fold(None, |acc: Option<State>, s| Some(acc.map_or_else(|| s.clone(), |a| a.meet(s, schema))));

    if cli.count {
        println!("{} state(s) across {} run(s)", all_states.len(), graphs.len());
        return Ok(());
    }

    for graph in &graphs {
        for (index, node) in graph.nodes.iter().enumerate() {
            if !cli.showmed && node.state != node.maximal {
                continue;
            }
            if !cli.filter.is_empty()
                && !cli.filter.iter().any(|k| node.maximal.get(&intern_key(k)).is_some())
            {
                continue;
            }
            if !cli.history.is_empty()
                && !cli.history.iter().any(|a| node.action_history.iter().any(|h| h == a))
            {
                continue;
            }

            let label = format!("state {index}");
            if cli.diff {
                let base = meet_base.clone().unwrap_or_else(State::empty);
                let entries = plotex_core::diff::diff(&node.maximal, &base, schema);
                println!("{}", format::format_diff(&label, entries));
            } else {
                println!("{}", format::format_state(&label, &node.maximal, schema));
            }

            if cli.showin || cli.showall {
                for parent in &node.parents {
                    println!("  in: {parent}");
                }
            }
            if cli.showout || cli.showall {
                for (action, child) in &node.children {
                    println!("  out: {action} -> {child}");
                }
            }
        }
    }

    if let Some(path) = &cli.graph {
        for graph in &graphs {
            let matched: Vec<bool> = graph
                .nodes
                .iter()
                .map(|n| {
                    let filter_ok = cli.filter.is_empty()
                        || cli.filter.iter().any(|k| n.maximal.get(&intern_key(k)).is_some());
                    let history_ok = cli.history.is_empty()
                        || cli.history.iter().any(|a| n.action_history.iter().any(|h| h == a));
                    filter_ok && history_ok
                })
                .collect();
            std::fs::write(path, graphviz::render(graph, &matched))?;
        }
    }

    Ok(())
}
