//! Structured JSON logging for capture runs.
//!
//! Each capture run appends JSON lines to a `logs.jsonl` next to its other
//! artifacts, so a failed scenario can be diagnosed from the run directory
//! alone.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::{info, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

// The non-blocking writer stops flushing once its guard drops; park it for
// the process lifetime.
static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
  Off,
  Warn,
  Info,
  Debug,
  Trace,
}

impl LogLevel {
  fn directive(self) -> &'static str {
    match self {
      LogLevel::Off => "off",
      LogLevel::Warn => "warn",
      LogLevel::Info => "info",
      LogLevel::Debug => "debug",
      LogLevel::Trace => "trace",
    }
  }
}

/// Install the global JSON subscriber writing to `logs_path`, creating the
/// parent directory if needed. `RUST_LOG` overrides `level` when set. Safe
/// to call more than once; later calls keep the first subscriber.
pub fn init(logs_path: &Path, level: LogLevel) {
  if let Some(parent) = logs_path.parent() {
    let _ = fs::create_dir_all(parent);
  }

  let file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(logs_path)
    .expect("open logs.jsonl for append");

  let (writer, guard) = tracing_appender::non_blocking(file);
  let _ = WORKER_GUARD.set(guard);

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

  let subscriber = Registry::default().with(filter).with(
    fmt::layer()
      .json()
      .with_current_span(true)
      .with_span_list(true)
      .with_target(false)
      .with_thread_ids(false)
      .with_thread_names(false)
      .with_writer(move || writer.clone()),
  );
  let _ = set_global_default(subscriber);

  info!(
    event = "log_sink_ready",
    logs_path = %logs_path.display(),
    level = ?level,
    "capture logging ready"
  );
}
