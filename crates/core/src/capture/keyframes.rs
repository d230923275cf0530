use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::recorder::AnsiStreamRecorder;
use crate::error::{Result, TimewalkerError};

/// A labeled position in the recorded byte stream. The offset is the
/// recorder's byte count at the instant of marking; the timestamp is
/// advisory wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
  pub label: String,
  pub offset: u64,
  pub timestamp: f64,
}

/// Ordered list of keyframes recorded during a capture run, dumped as a
/// JSON array on flush. All mutation happens under a single lock.
pub struct KeyframeRegistry {
  recorder: Arc<AnsiStreamRecorder>,
  json_path: PathBuf,
  records: Mutex<Vec<Keyframe>>,
}

impl KeyframeRegistry {
  pub fn new(recorder: Arc<AnsiStreamRecorder>, json_path: impl Into<PathBuf>) -> Self {
    Self {
      recorder,
      json_path: json_path.into(),
      records: Mutex::new(Vec::new()),
    }
  }

  /// Snapshot the recorder offset and wall clock, append the record and
  /// return it.
  pub fn mark(&self, label: &str) -> Keyframe {
    let mut records = self.records.lock();
    let frame = Keyframe {
      label: label.to_string(),
      offset: self.recorder.offset(),
      timestamp: epoch_seconds(),
    };
    records.push(frame.clone());
    frame
  }

  pub fn extend(&self, frames: impl IntoIterator<Item = Keyframe>) {
    self.records.lock().extend(frames);
  }

  pub fn clear(&self) {
    self.records.lock().clear();
  }

  #[must_use]
  pub fn records(&self) -> Vec<Keyframe> {
    self.records.lock().clone()
  }

  /// Write the full record list as pretty-printed JSON.
  pub fn flush(&self) -> Result<()> {
    let records = self.records.lock();
    if let Some(parent) = self.json_path.parent() {
      fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(&*records)
      .map_err(|err| TimewalkerError::InvariantViolation(format!("serialize keyframes: {err}")))?;
    fs::write(&self.json_path, payload)?;
    Ok(())
  }
}

fn epoch_seconds() -> f64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs_f64()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mark_snapshots_the_current_offset() {
    let td = tempfile::tempdir().unwrap();
    let recorder = Arc::new(AnsiStreamRecorder::create(&td.path().join("ansi.bin")).unwrap());
    let registry = KeyframeRegistry::new(Arc::clone(&recorder), td.path().join("keyframes.json"));

    recorder.append(b"0123456789").unwrap();
    let frame = registry.mark("ten");
    assert_eq!(frame.offset, 10);
    assert!(frame.timestamp > 0.0);

    recorder.append(b"abc").unwrap();
    assert_eq!(registry.mark("thirteen").offset, 13);
    assert_eq!(registry.records().len(), 2);
  }

  #[test]
  fn flush_writes_a_json_array() {
    let td = tempfile::tempdir().unwrap();
    let recorder = Arc::new(AnsiStreamRecorder::create(&td.path().join("ansi.bin")).unwrap());
    let json_path = td.path().join("keyframes.json");
    let registry = KeyframeRegistry::new(recorder, &json_path);
    registry.mark("start");
    registry.flush().unwrap();

    let parsed: Vec<Keyframe> = serde_json::from_str(&fs::read_to_string(&json_path).unwrap())
      .unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].label, "start");
    assert_eq!(parsed[0].offset, 0);
  }

  #[test]
  fn clear_resets_records() {
    let td = tempfile::tempdir().unwrap();
    let recorder = Arc::new(AnsiStreamRecorder::create(&td.path().join("ansi.bin")).unwrap());
    let registry = KeyframeRegistry::new(recorder, td.path().join("keyframes.json"));
    registry.mark("one");
    registry.clear();
    assert!(registry.records().is_empty());
  }
}
