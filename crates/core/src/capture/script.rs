use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::condition::OutputCondition;
use super::keyframes::Keyframe;
use crate::pty::PtySize;

/// Default budget for `InputStep.expect` without an explicit timeout.
pub const DEFAULT_EXPECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Write a payload to the PTY, optionally marking a keyframe and waiting
/// for an output expectation afterwards.
#[derive(Debug, Clone)]
pub struct InputStep {
  pub payload: String,
  pub mark: Option<String>,
  pub expect: Option<OutputCondition>,
  pub expect_timeout: Option<Duration>,
  pub delay: Duration,
  pub send_newline: bool,
}

impl InputStep {
  #[must_use]
  pub fn new(payload: impl Into<String>) -> Self {
    Self {
      payload: payload.into(),
      mark: None,
      expect: None,
      expect_timeout: None,
      delay: Duration::ZERO,
      send_newline: true,
    }
  }
}

/// Block until a condition matches the accumulated output.
#[derive(Debug, Clone)]
pub struct WaitStep {
  pub condition: OutputCondition,
  pub timeout: Duration,
}

/// Record a keyframe at the current stream offset.
#[derive(Debug, Clone)]
pub struct MarkStep {
  pub label: String,
}

/// Change the PTY window size.
#[derive(Debug, Clone, Copy)]
pub struct ResizeStep {
  pub size: PtySize,
}

/// One scripted interaction; the driver dispatches on this sum type.
#[derive(Debug, Clone)]
pub enum Step {
  Input(InputStep),
  Wait(WaitStep),
  Mark(MarkStep),
  Resize(ResizeStep),
}

/// Fully-resolved scenario for the script driver.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
  pub command: Vec<String>,
  pub steps: Vec<Step>,
  pub output_dir: PathBuf,
  pub env: Option<HashMap<String, String>>,
  pub cwd: Option<PathBuf>,
  pub pty_size: PtySize,
  pub timeout: Duration,
  pub read_timeout: Duration,
}

impl ScriptConfig {
  pub fn new(command: Vec<String>, steps: Vec<Step>, output_dir: impl Into<PathBuf>) -> Self {
    Self {
      command,
      steps,
      output_dir: output_dir.into(),
      env: None,
      cwd: None,
      pty_size: PtySize::default(),
      timeout: Duration::from_secs(60),
      read_timeout: Duration::from_millis(200),
    }
  }
}

/// Artifacts produced by one driver run.
#[derive(Debug, Clone)]
pub struct SessionArtifacts {
  pub exit_status: Option<i32>,
  pub signal: Option<i32>,
  pub ansi_path: PathBuf,
  pub keyframes: Vec<Keyframe>,
}
