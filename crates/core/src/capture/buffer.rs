use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Thread-safe collector for PTY output with predicate waits.
///
/// A single condition variable pairs with the byte buffer; `append`
/// broadcast-notifies after extending. `wait_until` decodes and evaluates
/// the predicate inside the critical section, so a match can never be
/// missed between evaluation and sleep.
pub struct OutputBuffer {
  bytes: Mutex<Vec<u8>>,
  cond: Condvar,
}

impl OutputBuffer {
  #[must_use]
  pub fn new() -> Self {
    Self {
      bytes: Mutex::new(Vec::new()),
      cond: Condvar::new(),
    }
  }

  pub fn append(&self, chunk: &[u8]) {
    if chunk.is_empty() {
      return;
    }
    let mut bytes = self.bytes.lock();
    bytes.extend_from_slice(chunk);
    self.cond.notify_all();
  }

  /// Immutable copy of all accumulated bytes.
  #[must_use]
  pub fn snapshot(&self) -> Vec<u8> {
    self.bytes.lock().clone()
  }

  /// UTF-8 decoding of the buffer, invalid sequences replaced.
  #[must_use]
  pub fn as_text(&self) -> String {
    String::from_utf8_lossy(&self.bytes.lock()).into_owned()
  }

  /// Wait until `predicate` holds for the decoded buffer text, re-checking
  /// on every wakeup, for at most `timeout`. Returns whether it matched.
  ///
  /// The predicate runs under the buffer lock: it must be quick and must
  /// not call back into this buffer.
  pub fn wait_until(&self, predicate: impl Fn(&str) -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut bytes = self.bytes.lock();
    loop {
      {
        let text = String::from_utf8_lossy(&bytes);
        if predicate(&text) {
          return true;
        }
      }
      if Instant::now() >= deadline {
        return false;
      }
      self.cond.wait_until(&mut bytes, deadline);
    }
  }
}

impl Default for OutputBuffer {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn wait_until_sees_bytes_appended_by_another_thread() {
    let buffer = Arc::new(OutputBuffer::new());
    let writer = Arc::clone(&buffer);
    let handle = thread::spawn(move || {
      thread::sleep(Duration::from_millis(50));
      writer.append(b"partial ");
      thread::sleep(Duration::from_millis(50));
      writer.append(b"ready");
    });

    let matched = buffer.wait_until(|text| text.contains("ready"), Duration::from_secs(5));
    handle.join().unwrap();
    assert!(matched);
    assert_eq!(buffer.as_text(), "partial ready");
  }

  #[test]
  fn wait_until_returns_false_on_deadline() {
    let buffer = OutputBuffer::new();
    buffer.append(b"something else");
    let start = Instant::now();
    let matched = buffer.wait_until(|text| text.contains("missing"), Duration::from_millis(100));
    assert!(!matched);
    assert!(start.elapsed() >= Duration::from_millis(100));
  }

  #[test]
  fn wait_until_matches_immediately_without_sleeping() {
    let buffer = OutputBuffer::new();
    buffer.append(b"already here");
    assert!(buffer.wait_until(|text| text.contains("here"), Duration::ZERO));
  }

  #[test]
  fn as_text_replaces_invalid_utf8() {
    let buffer = OutputBuffer::new();
    buffer.append(b"ok\xff\xfeok");
    let text = buffer.as_text();
    assert!(text.starts_with("ok"));
    assert!(text.ends_with("ok"));
  }

  #[test]
  fn snapshot_copies_bytes() {
    let buffer = OutputBuffer::new();
    buffer.append(b"abc");
    buffer.append(b"");
    assert_eq!(buffer.snapshot(), b"abc");
  }
}
