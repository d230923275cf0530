use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static DEC_PRIVATE_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\x1b\[(\?[\d;]*)([hl])").expect("valid DEC private regex"));
static OSC_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)\x1b\].*?(?:\x07|\x1b\\)").expect("valid OSC regex"));

/// Escape-sequence families the replay terminal is allowed to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalCapabilities {
  #[serde(default)]
  pub supports_dec_private: bool,
  #[serde(default)]
  pub allow_osc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
  #[serde(rename = "dec-private")]
  DecPrivate,
  #[serde(rename = "osc-suppressed")]
  OscSuppressed,
}

impl fmt::Display for WarningKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WarningKind::DecPrivate => write!(f, "dec-private"),
      WarningKind::OscSuppressed => write!(f, "osc-suppressed"),
    }
  }
}

/// One normalization rewrite, with the original sequence in escaped form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
  pub kind: WarningKind,
  pub original: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub normalized: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

/// A warning plus the raw-stream byte position it was emitted at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningEntry {
  pub offset: u64,
  pub warning: ParseWarning,
}

/// Accumulates warnings during a replay pass.
#[derive(Debug, Default)]
pub struct WarningCollector {
  entries: Vec<WarningEntry>,
}

impl WarningCollector {
  pub fn add(&mut self, warning: ParseWarning, offset: u64) {
    self.entries.push(WarningEntry { offset, warning });
  }

  pub fn extend(&mut self, entries: impl IntoIterator<Item = WarningEntry>) {
    self.entries.extend(entries);
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  #[must_use]
  pub fn entries(&self) -> &[WarningEntry] {
    &self.entries
  }

  #[must_use]
  pub fn into_entries(self) -> Vec<WarningEntry> {
    self.entries
  }
}

/// Rewrites or suppresses private terminal control sequences.
///
/// Two independent capability gates: DEC private set/reset
/// (`CSI ? … h|l`) and OSC (`ESC ] … BEL | ESC \`). Everything else
/// passes through unchanged. Warning offsets are attached by the caller
/// (the chunk's start in the raw stream).
#[derive(Debug, Clone, Default)]
pub struct SequenceNormalizer {
  capabilities: TerminalCapabilities,
}

impl SequenceNormalizer {
  #[must_use]
  pub fn new(capabilities: TerminalCapabilities) -> Self {
    Self { capabilities }
  }

  /// Decode a raw chunk (invalid UTF-8 dropped) and apply the gated
  /// rewrites. Returns the normalized text and one warning per deleted
  /// occurrence.
  pub fn normalize(&self, chunk: &[u8]) -> (String, Vec<ParseWarning>) {
    let text = decode_dropping_invalid(chunk);
    let mut warnings = Vec::new();

    let text = if self.capabilities.supports_dec_private {
      text
    } else {
      DEC_PRIVATE_RE
        .replace_all(&text, |caps: &Captures<'_>| {
          warnings.push(ParseWarning {
            kind: WarningKind::DecPrivate,
            original: escape_sequence(&caps[0]),
            normalized: Some(String::new()),
            message: None,
          });
          ""
        })
        .into_owned()
    };

    let text = if self.capabilities.allow_osc {
      text
    } else {
      OSC_RE
        .replace_all(&text, |caps: &Captures<'_>| {
          warnings.push(ParseWarning {
            kind: WarningKind::OscSuppressed,
            original: escape_sequence(&caps[0]),
            normalized: Some(String::new()),
            message: None,
          });
          ""
        })
        .into_owned()
    };

    (text, warnings)
  }
}

/// JSON-style escaping for a log-friendly rendition of a control sequence.
fn escape_sequence(seq: &str) -> String {
  let quoted = serde_json::to_string(seq).unwrap_or_else(|_| format!("{seq:?}"));
  quoted[1..quoted.len() - 1].to_string()
}

/// Strict UTF-8 decode that drops invalid byte ranges instead of
/// replacing them.
fn decode_dropping_invalid(bytes: &[u8]) -> String {
  match std::str::from_utf8(bytes) {
    Ok(text) => text.to_string(),
    Err(_) => {
      let mut out = String::with_capacity(bytes.len());
      let mut rest = bytes;
      loop {
        match std::str::from_utf8(rest) {
          Ok(tail) => {
            out.push_str(tail);
            break;
          }
          Err(err) => {
            let valid = err.valid_up_to();
            out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or(""));
            let skip = err.error_len().unwrap_or(rest.len() - valid);
            rest = &rest[valid + skip..];
          }
        }
      }
      out
    }
  }
}
