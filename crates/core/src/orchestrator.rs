//! High-level runner that ties DSL parsing to the script driver.

use std::path::Path;

use crate::capture::{ScriptConfig, ScriptDriver, SessionArtifacts};
use crate::error::Result;
use crate::scenario::{Scenario, build_script_config, load_scenario, load_scenario_file};

/// Outcome of one orchestrated scenario run.
#[derive(Debug)]
pub struct ExecutionResult {
  pub scenario: Scenario,
  pub config: ScriptConfig,
  pub artifacts: SessionArtifacts,
}

#[derive(Debug, Default)]
pub struct ExecutionOrchestrator {
  driver: ScriptDriver,
}

impl ExecutionOrchestrator {
  #[must_use]
  pub fn new() -> Self {
    Self {
      driver: ScriptDriver::new(),
    }
  }

  /// Parse, plan and run an in-memory scenario document.
  pub fn execute(
    &self,
    source: &serde_json::Value,
    output_dir: Option<&Path>,
  ) -> Result<ExecutionResult> {
    let scenario = load_scenario(source)?;
    self.execute_scenario(scenario, output_dir)
  }

  /// Parse, plan and run a scenario file.
  pub fn execute_file(&self, path: &Path, output_dir: Option<&Path>) -> Result<ExecutionResult> {
    let scenario = load_scenario_file(path)?;
    self.execute_scenario(scenario, output_dir)
  }

  fn execute_scenario(
    &self,
    scenario: Scenario,
    output_dir: Option<&Path>,
  ) -> Result<ExecutionResult> {
    let config = build_script_config(&scenario, output_dir)?;
    let artifacts = self.driver.run(&config)?;
    Ok(ExecutionResult {
      scenario,
      config,
      artifacts,
    })
  }
}
