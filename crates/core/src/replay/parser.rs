use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::normalize::{SequenceNormalizer, TerminalCapabilities, WarningCollector, WarningEntry};
use crate::error::Result;
use crate::pty::PtySize;

pub const DEFAULT_REPLAY_CHUNK: usize = 4096;

/// Color of a cell when it differs from the terminal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellColor {
  Indexed(u8),
  Rgb(u8, u8, u8),
}

/// One styled cell of the emulated screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStyle {
  pub ch: String,
  pub fg: Option<CellColor>,
  pub bg: Option<CellColor>,
  pub bold: bool,
  pub reverse: bool,
}

impl CellStyle {
  fn blank() -> Self {
    Self {
      ch: " ".to_string(),
      fg: None,
      bg: None,
      bold: false,
      reverse: false,
    }
  }
}

/// Immutable snapshot of the emulated terminal at a consumed-byte
/// boundary. The offset counts raw pre-normalization bytes, the same
/// coordinate system keyframes are recorded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenState {
  pub offset: u64,
  pub cursor_row: u16,
  pub cursor_col: u16,
  pub cells: Vec<Vec<CellStyle>>,
}

impl ScreenState {
  /// Row-wise concatenation of the cell contents.
  #[must_use]
  pub fn text_lines(&self) -> Vec<String> {
    self
      .cells
      .iter()
      .map(|row| row.iter().map(|cell| cell.ch.as_str()).collect())
      .collect()
  }
}

#[derive(Debug, Clone)]
pub struct ReplayResult {
  pub states: Vec<ScreenState>,
  pub warnings: Vec<WarningEntry>,
}

/// Deterministically replays a recorded byte stream into screen states.
pub struct AnsiReplayParser {
  size: PtySize,
  normalizer: SequenceNormalizer,
}

impl AnsiReplayParser {
  #[must_use]
  pub fn new(size: PtySize) -> Self {
    Self {
      size,
      normalizer: SequenceNormalizer::default(),
    }
  }

  #[must_use]
  pub fn with_capabilities(size: PtySize, capabilities: TerminalCapabilities) -> Self {
    Self {
      size,
      normalizer: SequenceNormalizer::new(capabilities),
    }
  }

  pub fn parse(&self, path: &Path) -> Result<ReplayResult> {
    self.parse_chunked(path, DEFAULT_REPLAY_CHUNK)
  }

  /// Replay `path` chunk by chunk, snapshotting the screen after every
  /// chunk that survives normalization.
  pub fn parse_chunked(&self, path: &Path, chunk_size: usize) -> Result<ReplayResult> {
    let mut file = File::open(path)?;
    let mut parser = vt100::Parser::new(self.size.rows, self.size.cols, 0);
    let mut collector = WarningCollector::default();
    let mut states = Vec::new();
    let mut consumed: u64 = 0;
    let mut chunk = vec![0u8; chunk_size.max(1)];

    loop {
      let count = file.read(&mut chunk)?;
      if count == 0 {
        break;
      }
      let raw = &chunk[..count];
      let (normalized, warnings) = self.normalizer.normalize(raw);
      for warning in warnings {
        collector.add(warning, consumed);
      }
      consumed += count as u64;
      if normalized.is_empty() {
        continue;
      }
      parser.process(normalized.as_bytes());
      states.push(snapshot(parser.screen(), consumed));
    }

    Ok(ReplayResult {
      states,
      warnings: collector.into_entries(),
    })
  }
}

/// Read the emulator's screen into an immutable rows × cols matrix.
/// Cells without contents become a single space with default styling.
fn snapshot(screen: &vt100::Screen, offset: u64) -> ScreenState {
  let (rows, cols) = screen.size();
  let mut cells = Vec::with_capacity(rows as usize);
  for row in 0..rows {
    let mut line = Vec::with_capacity(cols as usize);
    for col in 0..cols {
      line.push(match screen.cell(row, col) {
        Some(cell) => CellStyle {
          ch: if cell.has_contents() {
            cell.contents().to_string()
          } else {
            " ".to_string()
          },
          fg: convert_color(cell.fgcolor()),
          bg: convert_color(cell.bgcolor()),
          bold: cell.bold(),
          reverse: cell.inverse(),
        },
        None => CellStyle::blank(),
      });
    }
    cells.push(line);
  }
  let (cursor_row, cursor_col) = screen.cursor_position();
  ScreenState {
    offset,
    cursor_row,
    cursor_col,
    cells,
  }
}

fn convert_color(color: vt100::Color) -> Option<CellColor> {
  match color {
    vt100::Color::Default => None,
    vt100::Color::Idx(idx) => Some(CellColor::Indexed(idx)),
    vt100::Color::Rgb(r, g, b) => Some(CellColor::Rgb(r, g, b)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn write_fixture(bytes: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("ansi.bin");
    fs::write(&path, bytes).unwrap();
    (td, path)
  }

  #[test]
  fn replays_plain_text_into_screen_cells() {
    let (_td, path) = write_fixture(b"hello\r\nworld");
    let parser = AnsiReplayParser::new(PtySize { rows: 4, cols: 10 });
    let result = parser.parse(&path).unwrap();
    assert_eq!(result.states.len(), 1);
    let state = &result.states[0];
    assert_eq!(state.offset, 12);
    let lines = state.text_lines();
    assert!(lines[0].starts_with("hello"));
    assert!(lines[1].starts_with("world"));
    assert_eq!(state.cursor_row, 1);
    assert_eq!(state.cursor_col, 5);
  }

  #[test]
  fn captures_sgr_styling() {
    let (_td, path) = write_fixture(b"\x1b[31;1mrx");
    let parser = AnsiReplayParser::new(PtySize { rows: 2, cols: 8 });
    let result = parser.parse(&path).unwrap();
    let state = &result.states[0];
    let cell = &state.cells[0][0];
    assert_eq!(cell.ch, "r");
    assert_eq!(cell.fg, Some(CellColor::Indexed(1)));
    assert!(cell.bold);
  }

  #[test]
  fn offsets_count_raw_bytes_and_stay_monotonic() {
    let body: Vec<u8> = (0..3 * DEFAULT_REPLAY_CHUNK)
      .map(|i| b'a' + (i % 26) as u8)
      .collect();
    let (_td, path) = write_fixture(&body);
    let parser = AnsiReplayParser::new(PtySize { rows: 24, cols: 80 });
    let result = parser.parse(&path).unwrap();
    assert_eq!(result.states.len(), 3);
    assert!(
      result
        .states
        .windows(2)
        .all(|pair| pair[0].offset <= pair[1].offset)
    );
    assert_eq!(result.states.last().unwrap().offset, body.len() as u64);
  }

  #[test]
  fn chunk_of_only_suppressed_sequences_produces_no_state() {
    let (_td, path) = write_fixture(b"\x1b[?25l");
    let parser = AnsiReplayParser::new(PtySize::default());
    let result = parser.parse(&path).unwrap();
    assert!(result.states.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].offset, 0);
  }

  #[test]
  fn warning_offsets_point_at_chunk_starts_in_the_raw_stream() {
    let mut body = vec![b'A'; DEFAULT_REPLAY_CHUNK];
    body.extend_from_slice(b"\x1b[?25lvisible");
    let (_td, path) = write_fixture(&body);
    let parser = AnsiReplayParser::new(PtySize { rows: 24, cols: 80 });
    let result = parser.parse(&path).unwrap();
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].offset, DEFAULT_REPLAY_CHUNK as u64);
  }
}
