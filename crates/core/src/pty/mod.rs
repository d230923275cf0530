//! PTY session lifecycle.
//!
//! A `PtySession` owns the master side of a pseudo-terminal pair and the
//! child process attached to the slave side. The master is non-blocking;
//! reads go through a single-fd `poll` so every read carries an explicit
//! timeout. Release order on drop: signal the child with TERM, wait
//! briefly, escalate to KILL, reap, then close the master.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::pty::{Winsize, openpty};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, TimewalkerError};

pub const DEFAULT_READ_CHUNK: usize = 4096;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DROP_TERM_GRACE: Duration = Duration::from_secs(1);

nix::ioctl_write_ptr_bad!(tiocswinsz, libc::TIOCSWINSZ, Winsize);

/// Terminal size descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PtySize {
  pub rows: u16,
  pub cols: u16,
}

impl Default for PtySize {
  fn default() -> Self {
    Self { rows: 24, cols: 80 }
  }
}

impl PtySize {
  fn winsize(self) -> Winsize {
    Winsize {
      ws_row: self.rows,
      ws_col: self.cols,
      ws_xpixel: 0,
      ws_ypixel: 0,
    }
  }
}

/// Exit information for a PTY-backed subprocess. At most one of
/// `returncode` and `signal` is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtyExitStatus {
  pub returncode: Option<i32>,
  pub signal: Option<i32>,
}

impl PtyExitStatus {
  #[must_use]
  pub fn succeeded(&self) -> bool {
    self.returncode == Some(0) && self.signal.is_none()
  }
}

#[derive(Debug)]
pub struct PtySession {
  master: OwnedFd,
  child: Mutex<Child>,
  size: Mutex<PtySize>,
  chunk_size: usize,
}

impl PtySession {
  /// Allocate a PTY pair and spawn `command` with the slave side as its
  /// stdin/stdout/stderr, in a new session. The slave is closed in the
  /// parent before this returns.
  pub fn open(
    command: &[String],
    env: Option<&HashMap<String, String>>,
    cwd: Option<&Path>,
    size: PtySize,
  ) -> Result<Self> {
    Self::open_with_chunk_size(command, env, cwd, size, DEFAULT_READ_CHUNK)
  }

  pub fn open_with_chunk_size(
    command: &[String],
    env: Option<&HashMap<String, String>>,
    cwd: Option<&Path>,
    size: PtySize,
    chunk_size: usize,
  ) -> Result<Self> {
    if command.is_empty() {
      return Err(TimewalkerError::InvalidArgument(
        "command must not be empty".to_string(),
      ));
    }

    let winsize = size.winsize();
    let pty = openpty(&winsize, None).map_err(io::Error::from)?;
    let master = pty.master;
    let slave = pty.slave;

    set_nonblocking(master.as_raw_fd())?;

    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..]);
    if let Some(env) = env {
      for (key, value) in env {
        cmd.env(key, value);
      }
    }
    if let Some(dir) = cwd {
      cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::from(slave.try_clone()?));
    cmd.stdout(Stdio::from(slave.try_clone()?));
    cmd.stderr(Stdio::from(slave));
    unsafe {
      cmd.pre_exec(|| nix::unistd::setsid().map(|_| ()).map_err(io::Error::from));
    }

    let child = cmd.spawn()?;
    debug!(
      event = "pty_open",
      pid = child.id(),
      rows = size.rows,
      cols = size.cols,
      program = %command[0],
      "spawned child in pty"
    );

    // `cmd` drops here, closing the parent's slave descriptors.
    Ok(Self {
      master,
      child: Mutex::new(child),
      size: Mutex::new(size),
      chunk_size: chunk_size.max(1),
    })
  }

  /// Wait up to `timeout` for readability, then perform one bounded read.
  /// A zero-length result means the child side reached EOF.
  pub fn read(&self, timeout: Duration) -> Result<Vec<u8>> {
    let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLIN)];
    let ready = poll(
      &mut fds,
      PollTimeout::try_from(timeout).unwrap_or(PollTimeout::MAX),
    )
    .map_err(io::Error::from)?;
    if ready == 0 {
      return Err(TimewalkerError::Timeout("pty read timed out".to_string()));
    }

    let mut buf = vec![0u8; self.chunk_size];
    match nix::unistd::read(&self.master, &mut buf) {
      Ok(count) => {
        buf.truncate(count);
        Ok(buf)
      }
      // Master reads fail with EIO once the slave side is fully closed.
      Err(nix::errno::Errno::EIO) | Err(nix::errno::Errno::EAGAIN) => Ok(Vec::new()),
      Err(err) => Err(io::Error::from(err).into()),
    }
  }

  /// Unbuffered write to the master. Returns the number of bytes written.
  pub fn write(&self, data: &[u8]) -> Result<usize> {
    let written = nix::unistd::write(&self.master, data).map_err(io::Error::from)?;
    Ok(written)
  }

  /// Block until the child exits, up to `timeout`.
  pub fn wait(&self, timeout: Duration) -> Result<PtyExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
      if let Some(status) = self.child.lock().try_wait()? {
        return Ok(translate_exit(status));
      }
      let now = Instant::now();
      if now >= deadline {
        return Err(TimewalkerError::Timeout(
          "subprocess did not exit within timeout".to_string(),
        ));
      }
      thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
    }
  }

  /// Forward a signal to the child. A child that is already gone is not an
  /// error.
  pub fn terminate(&self, sig: Signal) -> Result<()> {
    let pid = Pid::from_raw(self.child.lock().id() as libc::pid_t);
    match kill(pid, sig) {
      Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
      Err(err) => Err(io::Error::from(err).into()),
    }
  }

  /// Non-blocking liveness poll.
  #[must_use]
  pub fn is_running(&self) -> bool {
    matches!(self.child.lock().try_wait(), Ok(None))
  }

  /// Apply a new window size to the master and remember it.
  pub fn resize(&self, size: PtySize) -> Result<()> {
    let winsize = size.winsize();
    unsafe { tiocswinsz(self.master.as_raw_fd(), &winsize) }.map_err(io::Error::from)?;
    *self.size.lock() = size;
    debug!(event = "pty_resize", rows = size.rows, cols = size.cols);
    Ok(())
  }

  #[must_use]
  pub fn size(&self) -> PtySize {
    *self.size.lock()
  }
}

impl Drop for PtySession {
  fn drop(&mut self) {
    let mut child = self.child.lock();
    if matches!(child.try_wait(), Ok(None)) {
      let pid = Pid::from_raw(child.id() as libc::pid_t);
      let _ = kill(pid, Signal::SIGTERM);
      let deadline = Instant::now() + DROP_TERM_GRACE;
      while matches!(child.try_wait(), Ok(None)) && Instant::now() < deadline {
        thread::sleep(EXIT_POLL_INTERVAL);
      }
      if matches!(child.try_wait(), Ok(None)) {
        let _ = child.kill();
        let _ = child.wait();
      }
    }
    debug!(event = "pty_closed", "released pty session");
  }
}

fn set_nonblocking(fd: libc::c_int) -> Result<()> {
  let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
  if flags < 0 {
    return Err(io::Error::last_os_error().into());
  }
  if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
    return Err(io::Error::last_os_error().into());
  }
  Ok(())
}

fn translate_exit(status: std::process::ExitStatus) -> PtyExitStatus {
  if let Some(sig) = status.signal() {
    PtyExitStatus {
      returncode: None,
      signal: Some(sig),
    }
  } else {
    PtyExitStatus {
      returncode: status.code(),
      signal: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
  }

  #[test]
  fn rejects_empty_command() {
    let err = PtySession::open(&[], None, None, PtySize::default()).unwrap_err();
    assert!(matches!(err, TimewalkerError::InvalidArgument(_)));
  }

  #[test]
  fn reports_exit_code() {
    let session =
      PtySession::open(&argv(&["/bin/sh", "-c", "exit 7"]), None, None, PtySize::default())
        .unwrap();
    let status = session.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(status.returncode, Some(7));
    assert_eq!(status.signal, None);
    assert!(!status.succeeded());
  }

  #[test]
  fn reports_signal_termination() {
    let session =
      PtySession::open(&argv(&["/bin/sh", "-c", "sleep 30"]), None, None, PtySize::default())
        .unwrap();
    assert!(session.is_running());
    session.terminate(Signal::SIGKILL).unwrap();
    let status = session.wait(Duration::from_secs(5)).unwrap();
    assert_eq!(status.returncode, None);
    assert_eq!(status.signal, Some(libc::SIGKILL));
    assert!(!status.succeeded());
  }

  #[test]
  fn echoes_written_input() {
    let session = PtySession::open(&argv(&["cat"]), None, None, PtySize::default()).unwrap();
    session.write(b"ping\n").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut collected = Vec::new();
    while Instant::now() < deadline {
      match session.read(Duration::from_millis(100)) {
        Ok(chunk) => collected.extend_from_slice(&chunk),
        Err(TimewalkerError::Timeout(_)) => {}
        Err(err) => panic!("unexpected read error: {err}"),
      }
      if String::from_utf8_lossy(&collected).contains("ping") {
        break;
      }
    }
    assert!(
      String::from_utf8_lossy(&collected).contains("ping"),
      "echo not observed in {collected:?}"
    );
  }

  #[test]
  fn read_times_out_without_output() {
    let session = PtySession::open(&argv(&["cat"]), None, None, PtySize::default()).unwrap();
    let err = session.read(Duration::from_millis(100)).unwrap_err();
    assert!(err.is_timeout());
  }

  #[test]
  fn resize_updates_stored_size() {
    let session = PtySession::open(&argv(&["cat"]), None, None, PtySize::default()).unwrap();
    session.resize(PtySize { rows: 40, cols: 100 }).unwrap();
    assert_eq!(session.size(), PtySize { rows: 40, cols: 100 });
  }

  #[test]
  fn wait_times_out_while_child_runs() {
    let session = PtySession::open(&argv(&["cat"]), None, None, PtySize::default()).unwrap();
    let err = session.wait(Duration::from_millis(100)).unwrap_err();
    assert!(err.is_timeout());
  }
}
