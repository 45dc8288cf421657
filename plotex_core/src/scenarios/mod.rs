//! Concrete, fully-assembled scenarios, kept in-tree as worked examples
//! and as fixtures for the integration tests.

pub mod test_scenario;
