use std::time::Duration;

use serde_json::json;
use timewalker_core::TimewalkerError;
use timewalker_core::capture::Step;
use timewalker_core::orchestrator::ExecutionOrchestrator;
use timewalker_core::scenario::{build_script_config, load_scenario};

fn simple_scenario() -> serde_json::Value {
  json!({
    "name": "demo",
    "meta": {
      "id": "demo",
      "command": ["/bin/sh"],
      "timeout": 15,
      "pty": {"rows": 30, "cols": 120}
    },
    "steps": [
      {
        "type": "command",
        "run": "printf 'dsl-step'",
        "mark": "after-command",
        "expect": {"contains": "dsl"},
        "timeout": 5
      },
      {"type": "wait", "expect": {"contains": "dsl-step"}},
      {"type": "snapshot", "label": "snapshot-1"},
      {"type": "resize", "rows": 40, "cols": 100},
      {"type": "command", "run": "exit", "send_newline": true}
    ]
  })
}

#[test]
fn build_script_config_from_scenario() {
  let scenario = load_scenario(&simple_scenario()).unwrap();
  let td = tempfile::tempdir().unwrap();
  let config = build_script_config(&scenario, Some(&td.path().join("run"))).unwrap();

  assert_eq!(config.steps.len(), 5);
  let Step::Input(first) = &config.steps[0] else {
    panic!("expected an input step first");
  };
  assert_eq!(first.expect_timeout, Some(Duration::from_secs(5)));
  let expect = first.expect.as_ref().expect("first step has an expectation");
  assert!(expect.matches("found dsl here"));
  assert!(!expect.matches("something unrelated"));

  let Step::Wait(wait) = &config.steps[1] else {
    panic!("expected a wait step second");
  };
  assert_eq!(wait.timeout, Duration::from_secs(10));

  let Step::Mark(mark) = &config.steps[2] else {
    panic!("expected a mark step third");
  };
  assert_eq!(mark.label, "snapshot-1");

  let Step::Resize(resize) = &config.steps[3] else {
    panic!("expected a resize step fourth");
  };
  assert_eq!((resize.size.rows, resize.size.cols), (40, 100));

  assert!(matches!(config.steps[4], Step::Input(_)));
  assert_eq!((config.pty_size.rows, config.pty_size.cols), (30, 120));
  assert_eq!(config.timeout, Duration::from_secs(15));
}

#[test]
fn orchestrator_runs_scenario() {
  let td = tempfile::tempdir().unwrap();
  let result = ExecutionOrchestrator::new()
    .execute(&simple_scenario(), Some(&td.path().join("orchestrated")))
    .unwrap();

  assert_eq!(result.artifacts.exit_status, Some(0));
  assert!(
    result
      .artifacts
      .keyframes
      .iter()
      .any(|frame| frame.label == "after-command")
  );
  assert!(
    result
      .artifacts
      .keyframes
      .iter()
      .any(|frame| frame.label == "snapshot-1")
  );
  assert!(result.artifacts.ansi_path.exists());
  assert_eq!(result.scenario.name.as_deref(), Some("demo"));
}

#[test]
fn invalid_scenario_is_rejected() {
  let bad = json!({"meta": {"cwd": "."}, "steps": []});
  let err = load_scenario(&bad).unwrap_err();
  assert!(matches!(err, TimewalkerError::SchemaValidation(_)));
}
