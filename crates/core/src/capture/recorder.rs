use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, TimewalkerError};

/// Append-only log of the raw ANSI byte stream with a monotonic offset
/// counter. Appends are serialized under the file lock; the offset is
/// published with a SeqCst add so readers outside the lock observe at
/// least the sum of completed appends.
pub struct AnsiStreamRecorder {
  path: PathBuf,
  file: Mutex<Option<File>>,
  offset: AtomicU64,
}

impl AnsiStreamRecorder {
  /// Create (truncate) the log file, making parent directories as needed.
  pub fn create(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    Ok(Self {
      path: path.to_path_buf(),
      file: Mutex::new(Some(file)),
      offset: AtomicU64::new(0),
    })
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    &self.path
  }

  #[must_use]
  pub fn offset(&self) -> u64 {
    self.offset.load(Ordering::SeqCst)
  }

  /// Append a chunk and return the new offset. Empty chunks are a no-op
  /// returning the current offset.
  pub fn append(&self, chunk: &[u8]) -> Result<u64> {
    if chunk.is_empty() {
      return Ok(self.offset());
    }
    let mut slot = self.file.lock();
    let file = slot.as_mut().ok_or_else(|| {
      TimewalkerError::InvariantViolation("append on closed recorder".to_string())
    })?;
    file.write_all(chunk)?;
    let len = chunk.len() as u64;
    Ok(self.offset.fetch_add(len, Ordering::SeqCst) + len)
  }

  /// Flush and close the underlying file. Idempotent.
  pub fn close(&self) -> Result<()> {
    let mut slot = self.file.lock();
    if let Some(mut file) = slot.take() {
      file.flush()?;
    }
    Ok(())
  }
}
