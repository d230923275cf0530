use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Result, TimewalkerError};

/// Disjunction of predicates over the decoded output buffer.
///
/// At least one alternative must be configured. Regex patterns are
/// compiled at construction so malformed ones fail fast. Custom
/// predicates only exist on this programmatic API; persisted scenarios
/// are restricted to `contains`/`regex`.
#[derive(Clone)]
pub struct OutputCondition {
  contains: Option<String>,
  regex: Option<Regex>,
  predicate: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl OutputCondition {
  pub fn new(contains: Option<String>, regex: Option<&str>) -> Result<Self> {
    if contains.is_none() && regex.is_none() {
      return Err(TimewalkerError::InvalidArgument(
        "expectation requires at least one of contains or regex".to_string(),
      ));
    }
    let regex = regex.map(compile).transpose()?;
    Ok(Self {
      contains,
      regex,
      predicate: None,
    })
  }

  #[must_use]
  pub fn contains(needle: impl Into<String>) -> Self {
    Self {
      contains: Some(needle.into()),
      regex: None,
      predicate: None,
    }
  }

  pub fn regex(pattern: &str) -> Result<Self> {
    Ok(Self {
      contains: None,
      regex: Some(compile(pattern)?),
      predicate: None,
    })
  }

  pub fn predicate(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
    Self {
      contains: None,
      regex: None,
      predicate: Some(Arc::new(predicate)),
    }
  }

  #[must_use]
  pub fn matches(&self, text: &str) -> bool {
    if let Some(needle) = &self.contains
      && !needle.is_empty()
      && text.contains(needle.as_str())
    {
      return true;
    }
    if let Some(regex) = &self.regex
      && regex.is_match(text)
    {
      return true;
    }
    if let Some(predicate) = &self.predicate
      && predicate(text)
    {
      return true;
    }
    false
  }
}

impl fmt::Debug for OutputCondition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut parts = Vec::new();
    if let Some(needle) = &self.contains {
      parts.push(format!("contains={needle:?}"));
    }
    if let Some(regex) = &self.regex {
      parts.push(format!("regex={:?}", regex.as_str()));
    }
    if self.predicate.is_some() {
      parts.push("predicate=<fn>".to_string());
    }
    write!(f, "OutputCondition({})", parts.join(", "))
  }
}

fn compile(pattern: &str) -> Result<Regex> {
  Regex::new(pattern).map_err(|err| {
    TimewalkerError::InvalidArgument(format!("invalid expectation regex {pattern:?}: {err}"))
  })
}
