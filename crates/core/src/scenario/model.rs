use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TimewalkerError};
use crate::pty::PtySize;

/// Expectation over decoded output: a substring and/or a regex.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
  #[serde(default)]
  pub contains: Option<String>,
  #[serde(default)]
  pub regex: Option<String>,
}

/// Scenario-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioMeta {
  #[serde(default)]
  pub id: Option<String>,
  pub command: Vec<String>,
  #[serde(default)]
  pub cwd: Option<PathBuf>,
  #[serde(default)]
  pub env: HashMap<String, String>,
  #[serde(default)]
  pub pty: Option<PtySize>,
  #[serde(default = "default_meta_timeout")]
  pub timeout: f64,
  #[serde(default = "default_read_timeout")]
  pub read_timeout: f64,
  #[serde(default)]
  pub output_dir: Option<PathBuf>,
}

fn default_meta_timeout() -> f64 {
  120.0
}

fn default_read_timeout() -> f64 {
  0.2
}

fn default_true() -> bool {
  true
}

fn default_wait_timeout() -> f64 {
  10.0
}

/// One declared step of a scenario document.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
  Command {
    run: String,
    #[serde(default)]
    mark: Option<String>,
    #[serde(default)]
    expect: Option<Expectation>,
    #[serde(default)]
    timeout: Option<f64>,
    #[serde(default)]
    delay: f64,
    #[serde(default = "default_true")]
    send_newline: bool,
  },
  Wait {
    expect: Expectation,
    #[serde(default = "default_wait_timeout")]
    timeout: f64,
  },
  Snapshot {
    label: String,
  },
  Resize {
    rows: u16,
    cols: u16,
  },
}

/// Parsed and validated scenario document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  pub meta: ScenarioMeta,
  pub steps: Vec<ScenarioStep>,
}

/// Load a scenario from a JSON file on disk.
pub fn load_scenario_file(path: &Path) -> Result<Scenario> {
  let raw = fs::read_to_string(path)?;
  let value: serde_json::Value = serde_json::from_str(&raw)
    .map_err(|err| TimewalkerError::SchemaValidation(format!("invalid scenario JSON: {err}")))?;
  load_scenario(&value)
}

/// Load a scenario from an in-memory JSON document.
pub fn load_scenario(value: &serde_json::Value) -> Result<Scenario> {
  let scenario: Scenario = serde_json::from_value(value.clone())
    .map_err(|err| TimewalkerError::SchemaValidation(err.to_string()))?;
  validate(&scenario)?;
  Ok(scenario)
}

fn validate(scenario: &Scenario) -> Result<()> {
  if scenario.meta.command.is_empty() {
    return Err(schema_error("meta.command must not be empty"));
  }
  if scenario.steps.is_empty() {
    return Err(schema_error("steps must not be empty"));
  }
  if scenario.meta.timeout < 0.0 {
    return Err(schema_error("meta.timeout must not be negative"));
  }
  if scenario.meta.read_timeout < 0.0 {
    return Err(schema_error("meta.read_timeout must not be negative"));
  }
  if let Some(pty) = scenario.meta.pty
    && (pty.rows == 0 || pty.cols == 0)
  {
    return Err(schema_error("meta.pty dimensions must be at least 1"));
  }

  for (index, step) in scenario.steps.iter().enumerate() {
    match step {
      ScenarioStep::Command {
        expect,
        timeout,
        delay,
        ..
      } => {
        if let Some(expect) = expect {
          validate_expectation(expect, index)?;
        }
        if timeout.is_some_and(|value| value < 0.0) {
          return Err(schema_error(&format!("step {index}: timeout must not be negative")));
        }
        if *delay < 0.0 {
          return Err(schema_error(&format!("step {index}: delay must not be negative")));
        }
      }
      ScenarioStep::Wait { expect, timeout } => {
        validate_expectation(expect, index)?;
        if *timeout < 0.0 {
          return Err(schema_error(&format!("step {index}: timeout must not be negative")));
        }
      }
      ScenarioStep::Resize { rows, cols } => {
        if *rows == 0 || *cols == 0 {
          return Err(schema_error(&format!(
            "step {index}: resize dimensions must be at least 1"
          )));
        }
      }
      ScenarioStep::Snapshot { .. } => {}
    }
  }
  Ok(())
}

fn validate_expectation(expect: &Expectation, index: usize) -> Result<()> {
  if expect.contains.is_none() && expect.regex.is_none() {
    return Err(schema_error(&format!(
      "step {index}: expect requires contains or regex"
    )));
  }
  Ok(())
}

fn schema_error(message: &str) -> TimewalkerError {
  TimewalkerError::SchemaValidation(message.to_string())
}
