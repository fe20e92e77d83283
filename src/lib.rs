//! boardlink
//!
//! Automatic board and port selection for sketch editors. The selection
//! core lives in the workspace crates; this crate adds the headless
//! command line hosts.

pub mod headless;
pub mod scenario;

pub use headless::runner::{
    replay_engine, replay_scenario, run_replay, run_watch, HeadlessOptions,
};
pub use headless::HeadlessEvent;
pub use scenario::{Scenario, ScenarioStep};
