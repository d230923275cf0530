use std::path::{Path, PathBuf};
use std::time::Duration;

use super::model::{Expectation, Scenario, ScenarioMeta, ScenarioStep};
use crate::capture::{
  InputStep, MarkStep, OutputCondition, ResizeStep, ScriptConfig, Step, WaitStep,
};
use crate::error::Result;
use crate::pty::PtySize;

const DEFAULT_RUNS_DIR: &str = "e2e_timewalker_runs";

/// Lower a parsed scenario into a fully-resolved script config.
///
/// Output directory precedence: explicit override, then `meta.output_dir`,
/// then `./e2e_timewalker_runs/<id or "session">`.
pub fn build_script_config(scenario: &Scenario, output_dir: Option<&Path>) -> Result<ScriptConfig> {
  let meta = &scenario.meta;
  let destination = resolve_output_dir(meta, output_dir);
  let steps = plan_steps(&scenario.steps)?;
  Ok(ScriptConfig {
    command: meta.command.clone(),
    steps,
    output_dir: destination,
    env: if meta.env.is_empty() {
      None
    } else {
      Some(meta.env.clone())
    },
    cwd: meta.cwd.clone(),
    pty_size: meta.pty.unwrap_or_default(),
    timeout: Duration::from_secs_f64(meta.timeout),
    read_timeout: Duration::from_secs_f64(meta.read_timeout),
  })
}

fn resolve_output_dir(meta: &ScenarioMeta, override_dir: Option<&Path>) -> PathBuf {
  if let Some(dir) = override_dir {
    return dir.to_path_buf();
  }
  if let Some(dir) = &meta.output_dir {
    return dir.clone();
  }
  let identifier = meta.id.as_deref().unwrap_or("session");
  PathBuf::from(DEFAULT_RUNS_DIR).join(identifier)
}

fn plan_steps(steps: &[ScenarioStep]) -> Result<Vec<Step>> {
  steps.iter().map(plan_step).collect()
}

fn plan_step(step: &ScenarioStep) -> Result<Step> {
  Ok(match step {
    ScenarioStep::Command {
      run,
      mark,
      expect,
      timeout,
      delay,
      send_newline,
    } => Step::Input(InputStep {
      payload: run.clone(),
      mark: mark.clone(),
      expect: expect.as_ref().map(to_condition).transpose()?,
      expect_timeout: timeout.map(Duration::from_secs_f64),
      delay: Duration::from_secs_f64(*delay),
      send_newline: *send_newline,
    }),
    ScenarioStep::Wait { expect, timeout } => Step::Wait(WaitStep {
      condition: to_condition(expect)?,
      timeout: Duration::from_secs_f64(*timeout),
    }),
    ScenarioStep::Snapshot { label } => Step::Mark(MarkStep {
      label: label.clone(),
    }),
    ScenarioStep::Resize { rows, cols } => Step::Resize(ResizeStep {
      size: PtySize {
        rows: *rows,
        cols: *cols,
      },
    }),
  })
}

fn to_condition(expect: &Expectation) -> Result<OutputCondition> {
  OutputCondition::new(expect.contains.clone(), expect.regex.as_deref())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scenario::load_scenario;
  use serde_json::json;

  #[test]
  fn output_dir_precedence_is_override_then_meta_then_default() {
    let scenario = load_scenario(&json!({
      "meta": {"id": "demo", "command": ["sh"], "output_dir": "/tmp/from-meta"},
      "steps": [{"type": "snapshot", "label": "x"}]
    }))
    .unwrap();

    let overridden =
      build_script_config(&scenario, Some(Path::new("/tmp/override"))).unwrap();
    assert_eq!(overridden.output_dir, PathBuf::from("/tmp/override"));

    let from_meta = build_script_config(&scenario, None).unwrap();
    assert_eq!(from_meta.output_dir, PathBuf::from("/tmp/from-meta"));

    let bare = load_scenario(&json!({
      "meta": {"id": "demo", "command": ["sh"]},
      "steps": [{"type": "snapshot", "label": "x"}]
    }))
    .unwrap();
    let defaulted = build_script_config(&bare, None).unwrap();
    assert_eq!(
      defaulted.output_dir,
      PathBuf::from("e2e_timewalker_runs/demo")
    );

    let anonymous = load_scenario(&json!({
      "meta": {"command": ["sh"]},
      "steps": [{"type": "snapshot", "label": "x"}]
    }))
    .unwrap();
    let session = build_script_config(&anonymous, None).unwrap();
    assert_eq!(
      session.output_dir,
      PathBuf::from("e2e_timewalker_runs/session")
    );
  }

  #[test]
  fn invalid_expectation_regex_is_rejected_at_planning() {
    let scenario = load_scenario(&json!({
      "meta": {"command": ["sh"]},
      "steps": [{"type": "wait", "expect": {"regex": "(unclosed"}}]
    }))
    .unwrap();
    let err = build_script_config(&scenario, None).unwrap_err();
    assert!(matches!(
      err,
      crate::error::TimewalkerError::InvalidArgument(_)
    ));
  }
}
