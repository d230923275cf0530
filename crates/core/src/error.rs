use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimewalkerError>;

/// Errors surfaced by the capture and replay engine.
#[derive(Debug, Error)]
pub enum TimewalkerError {
  #[error("invalid argument: {0}")]
  InvalidArgument(String),
  #[error("timed out: {0}")]
  Timeout(String),
  #[error("expectation not met: {expectation}; buffer tail: {tail:?}")]
  ExpectationTimeout { expectation: String, tail: String },
  #[error("wait step timed out: {expectation}; buffer tail: {tail:?}")]
  WaitTimeout { expectation: String, tail: String },
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[error("scenario validation failed: {0}")]
  SchemaValidation(String),
  #[error("invariant violation: {0}")]
  InvariantViolation(String),
}

impl TimewalkerError {
  /// True for plain timeouts (PTY read/wait budget exceeded).
  #[must_use]
  pub fn is_timeout(&self) -> bool {
    matches!(self, Self::Timeout(_))
  }
}
