#![warn(clippy::pedantic)]
#![allow(
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! The state-space exploration engine described by PlotEx: a typed
//! partial order of "qualities", actions that transform states within
//! that order, and a BFS-with-maximization search over the reachable
//! states of a scenario.

pub mod action;
pub mod diff;
pub mod error;
pub mod graph;
pub mod preferred;
pub mod scenario;
pub mod schema;
pub mod scenarios;
pub mod state;
pub mod test_runner;
pub mod value;

pub use action::{Action, EquivHint};
pub use error::{NameKind, PlotexError, SchemaError};
pub use graph::Graph;
pub use scenario::{Scenario, ScenarioBuilder};
pub use schema::{Schema, Sense, ValueType};
pub use state::State;
pub use test_runner::{Test, TestReport};
pub use value::QualityValue;

/// A quality's name. Interned so that clones and comparisons inside the
/// search's hot loop are cheap; see [`state`] for how this is used as a
/// map key.
pub type QualityKey = internment::ArcIntern<str>;
