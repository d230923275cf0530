//! Scenario DSL: JSON documents describing a command, scripted steps and
//! expectations, lowered into a [`crate::capture::ScriptConfig`].

mod model;
mod planner;

pub use model::{
  Expectation, Scenario, ScenarioMeta, ScenarioStep, load_scenario, load_scenario_file,
};
pub use planner::build_script_config;
