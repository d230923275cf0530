use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;
use timewalker_core::capture::ScriptDriver;
use timewalker_core::logging::{self, LogLevel};
use timewalker_core::scenario::{build_script_config, load_scenario_file};

use crate::args::{LogLevelArg, RunArgs};

pub fn execute(args: &RunArgs) -> Result<()> {
  let scenario = load_scenario_file(&args.scenario)
    .with_context(|| format!("load scenario {}", args.scenario.display()))?;
  let config = build_script_config(&scenario, args.output_dir.as_deref())?;
  logging::init(&config.output_dir.join("logs.jsonl"), level(args.log_level));

  tracing::debug!(
    event = "cli_run_planned",
    scenario = %args.scenario.display(),
    output_dir = %config.output_dir.display(),
    steps = config.steps.len()
  );

  let artifacts = ScriptDriver::new()
    .run(&config)
    .context("scenario run failed")?;

  let status = match (artifacts.exit_status, artifacts.signal) {
    (_, Some(signal)) => format!("signal {signal}"),
    (Some(code), None) => format!("exit {code}"),
    (None, None) => "unknown".to_string(),
  };
  println!("{} {}", "recorded".green(), artifacts.ansi_path.display());
  println!("  status: {status}");
  println!("  keyframes: {}", artifacts.keyframes.len());
  for frame in &artifacts.keyframes {
    println!("    {} @ {}", frame.label, frame.offset);
  }
  Ok(())
}

fn level(arg: LogLevelArg) -> LogLevel {
  match arg {
    LogLevelArg::Off => LogLevel::Off,
    LogLevelArg::Warn => LogLevel::Warn,
    LogLevelArg::Info => LogLevel::Info,
    LogLevelArg::Debug => LogLevel::Debug,
    LogLevelArg::Trace => LogLevel::Trace,
  }
}
