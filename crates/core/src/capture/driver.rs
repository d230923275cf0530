use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::buffer::OutputBuffer;
use super::keyframes::KeyframeRegistry;
use super::pump::OutputPump;
use super::recorder::AnsiStreamRecorder;
use super::script::{
  DEFAULT_EXPECT_TIMEOUT, InputStep, ScriptConfig, SessionArtifacts, Step, WaitStep,
};
use crate::error::{Result, TimewalkerError};
use crate::pty::PtySession;

const PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const BUFFER_TAIL_BYTES: usize = 200;

/// Executes a scripted scenario against a PTY and captures artifacts.
///
/// Resources are built bottom-up (session, recorder, registry, pump) and
/// released in reverse on every exit path; a step failure still stops the
/// pump, flushes recorded keyframes and terminates the child before the
/// error reaches the caller.
#[derive(Debug, Default)]
pub struct ScriptDriver;

impl ScriptDriver {
  #[must_use]
  pub fn new() -> Self {
    Self
  }

  pub fn run(&self, config: &ScriptConfig) -> Result<SessionArtifacts> {
    fs::create_dir_all(&config.output_dir)?;
    let ansi_path = config.output_dir.join("ansi.bin");
    let keyframe_path = config.output_dir.join("keyframes.json");

    let buffer = Arc::new(OutputBuffer::new());
    let session = Arc::new(PtySession::open(
      &config.command,
      config.env.as_ref(),
      config.cwd.as_deref(),
      config.pty_size,
    )?);
    let recorder = Arc::new(AnsiStreamRecorder::create(&ansi_path)?);
    let registry = KeyframeRegistry::new(Arc::clone(&recorder), &keyframe_path);
    let pump = OutputPump::start(
      Arc::clone(&session),
      Arc::clone(&recorder),
      Arc::clone(&buffer),
      config.read_timeout,
    );
    debug!(
      event = "driver_session_started",
      command = ?config.command,
      output_dir = %config.output_dir.display(),
      "capture session started"
    );

    let outcome = self
      .execute_steps(&config.steps, &session, &registry, &buffer)
      .and_then(|()| session.wait(config.timeout));

    // Cleanup runs on success and failure alike, before any error
    // propagates: pump stop+join, registry flush, recorder close. The
    // session terminates the child when the last reference drops.
    pump.stop();
    if !pump.join(PUMP_JOIN_TIMEOUT) {
      warn!(event = "driver_pump_join_timeout", "output pump did not stop in time");
    }
    let flush_result = registry.flush();
    if let Err(err) = &flush_result {
      warn!(event = "driver_registry_flush_failed", error = %err, "keyframes not persisted");
    }
    let close_result = recorder.close();
    if let Err(err) = &close_result {
      warn!(event = "driver_recorder_close_failed", error = %err);
    }

    let exit = outcome?;
    flush_result?;
    close_result?;

    debug!(
      event = "driver_session_finished",
      returncode = ?exit.returncode,
      signal = ?exit.signal,
      keyframes = registry.records().len(),
      "capture session finished"
    );
    Ok(SessionArtifacts {
      exit_status: exit.returncode,
      signal: exit.signal,
      ansi_path,
      keyframes: registry.records(),
    })
  }

  fn execute_steps(
    &self,
    steps: &[Step],
    session: &PtySession,
    registry: &KeyframeRegistry,
    buffer: &OutputBuffer,
  ) -> Result<()> {
    for step in steps {
      match step {
        Step::Input(input) => self.run_input_step(input, session, registry, buffer)?,
        Step::Wait(wait) => self.run_wait_step(wait, buffer)?,
        Step::Mark(mark) => {
          registry.mark(&mark.label);
        }
        Step::Resize(resize) => session.resize(resize.size)?,
      }
    }
    Ok(())
  }

  fn run_input_step(
    &self,
    step: &InputStep,
    session: &PtySession,
    registry: &KeyframeRegistry,
    buffer: &OutputBuffer,
  ) -> Result<()> {
    if step.delay > Duration::ZERO {
      thread::sleep(step.delay);
    }

    let mut payload = step.payload.clone().into_bytes();
    if step.send_newline && !payload.ends_with(b"\n") {
      payload.push(b'\n');
    }
    session.write(&payload)?;
    debug!(event = "driver_input", bytes = payload.len(), mark = ?step.mark);

    // Mark before waiting on the expectation so the recorded offset sits
    // at the post-write/pre-output boundary.
    if let Some(label) = &step.mark {
      registry.mark(label);
    }

    if let Some(expect) = &step.expect {
      let timeout = step.expect_timeout.unwrap_or(DEFAULT_EXPECT_TIMEOUT);
      if !buffer.wait_until(|text| expect.matches(text), timeout) {
        return Err(TimewalkerError::ExpectationTimeout {
          expectation: format!("{expect:?}"),
          tail: buffer_tail(buffer),
        });
      }
    }
    Ok(())
  }

  fn run_wait_step(&self, step: &WaitStep, buffer: &OutputBuffer) -> Result<()> {
    if !buffer.wait_until(|text| step.condition.matches(text), step.timeout) {
      return Err(TimewalkerError::WaitTimeout {
        expectation: format!("{:?}", step.condition),
        tail: buffer_tail(buffer),
      });
    }
    Ok(())
  }
}

fn buffer_tail(buffer: &OutputBuffer) -> String {
  let text = buffer.as_text();
  tail(&text, BUFFER_TAIL_BYTES).to_string()
}

fn tail(text: &str, limit: usize) -> &str {
  if text.len() <= limit {
    return text;
  }
  let mut start = text.len() - limit;
  while !text.is_char_boundary(start) {
    start += 1;
  }
  &text[start..]
}
