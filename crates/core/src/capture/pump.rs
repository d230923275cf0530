use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use tracing::{debug, warn};

use super::buffer::OutputBuffer;
use super::recorder::AnsiStreamRecorder;
use crate::error::TimewalkerError;
use crate::pty::PtySession;

const DRAIN_READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Background thread draining PTY output into the recorder and buffer.
///
/// The main loop runs until the child is gone or `stop` is requested; a
/// drain phase then collects residual bytes so output racing the child's
/// exit is not lost. Chunks always hit the recorder before the buffer, so
/// any offset read after observing bytes in the buffer covers them.
pub struct OutputPump {
  stop: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
  done: Receiver<()>,
}

impl OutputPump {
  pub fn start(
    session: Arc<PtySession>,
    recorder: Arc<AnsiStreamRecorder>,
    buffer: Arc<OutputBuffer>,
    read_timeout: Duration,
  ) -> Self {
    let stop = Arc::new(AtomicBool::new(false));
    let (done_tx, done) = bounded(1);
    let stop_flag = Arc::clone(&stop);
    let handle = thread::spawn(move || {
      pump_loop(&session, &recorder, &buffer, read_timeout, &stop_flag);
      drain(&session, &recorder, &buffer);
      let _ = done_tx.send(());
    });
    Self {
      stop,
      handle: Some(handle),
      done,
    }
  }

  /// Ask the pump to stop. The drain phase still runs to completion.
  pub fn stop(&self) {
    self.stop.store(true, Ordering::SeqCst);
  }

  /// Wait up to `timeout` for the pump to finish. Returns whether it did;
  /// on timeout the thread is left detached.
  pub fn join(mut self, timeout: Duration) -> bool {
    let finished = match self.done.recv_timeout(timeout) {
      Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
      Err(RecvTimeoutError::Timeout) => false,
    };
    if finished && let Some(handle) = self.handle.take() {
      let _ = handle.join();
    }
    finished
  }
}

fn pump_loop(
  session: &PtySession,
  recorder: &AnsiStreamRecorder,
  buffer: &OutputBuffer,
  read_timeout: Duration,
  stop: &AtomicBool,
) {
  while !stop.load(Ordering::SeqCst) {
    let chunk = match session.read(read_timeout) {
      Ok(chunk) => chunk,
      Err(TimewalkerError::Timeout(_)) => {
        if !session.is_running() {
          break;
        }
        continue;
      }
      Err(err) => {
        warn!(event = "pump_read_error", error = %err, "pty read failed");
        break;
      }
    };
    if chunk.is_empty() {
      if !session.is_running() {
        break;
      }
      continue;
    }
    if forward(recorder, buffer, &chunk).is_err() {
      break;
    }
  }
}

/// Collect whatever the kernel still buffers after the child exited.
fn drain(session: &PtySession, recorder: &AnsiStreamRecorder, buffer: &OutputBuffer) {
  loop {
    match session.read(DRAIN_READ_TIMEOUT) {
      Ok(chunk) if !chunk.is_empty() => {
        if forward(recorder, buffer, &chunk).is_err() {
          break;
        }
      }
      _ => break,
    }
  }
  debug!(
    event = "pump_drained",
    offset = recorder.offset(),
    "output pump finished"
  );
}

fn forward(
  recorder: &AnsiStreamRecorder,
  buffer: &OutputBuffer,
  chunk: &[u8],
) -> crate::error::Result<()> {
  if let Err(err) = recorder.append(chunk) {
    warn!(event = "pump_forward_error", error = %err, "dropping chunk");
    return Err(err);
  }
  buffer.append(chunk);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pty::PtySize;

  #[test]
  fn pumps_output_until_child_exit_and_drains_the_tail() {
    let td = tempfile::tempdir().unwrap();
    let session = Arc::new(
      PtySession::open(
        &["/bin/sh".to_string(), "-c".to_string(), "printf 'pumped-bytes'".to_string()],
        None,
        None,
        PtySize::default(),
      )
      .unwrap(),
    );
    let recorder =
      Arc::new(AnsiStreamRecorder::create(&td.path().join("ansi.bin")).unwrap());
    let buffer = Arc::new(OutputBuffer::new());

    let pump = OutputPump::start(
      Arc::clone(&session),
      Arc::clone(&recorder),
      Arc::clone(&buffer),
      Duration::from_millis(200),
    );

    session.wait(Duration::from_secs(5)).unwrap();
    pump.stop();
    // Must finish even though stop raced the drain phase.
    assert!(pump.join(Duration::from_secs(2)));
    assert!(buffer.as_text().contains("pumped-bytes"));
    assert_eq!(recorder.offset(), buffer.snapshot().len() as u64);
  }

  #[test]
  fn stop_terminates_the_pump_while_child_is_alive() {
    let td = tempfile::tempdir().unwrap();
    let session = Arc::new(
      PtySession::open(&["cat".to_string()], None, None, PtySize::default()).unwrap(),
    );
    let recorder =
      Arc::new(AnsiStreamRecorder::create(&td.path().join("ansi.bin")).unwrap());
    let buffer = Arc::new(OutputBuffer::new());

    let pump = OutputPump::start(
      Arc::clone(&session),
      recorder,
      buffer,
      Duration::from_millis(100),
    );
    pump.stop();
    assert!(pump.join(Duration::from_secs(2)));
  }
}
