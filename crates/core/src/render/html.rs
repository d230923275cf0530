use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::replay::{CellColor, CellStyle, ScreenState};

const DEFAULT_FG: &str = "#d0d0d0";
const DEFAULT_BG: &str = "#000000";
const DEFAULT_TITLE: &str = "Terminal Frame";

/// The base 16 ANSI colors, indexed 0-15.
const ANSI_PALETTE: [&str; 16] = [
  "#000000", "#d70000", "#5f8700", "#875f00", "#005faf", "#af005f", "#00afaf", "#ffffff",
  "#585858", "#ff5f5f", "#87ff5f", "#ffffaf", "#5fd7ff", "#ff87ff", "#5fffff", "#ffffff",
];

/// Renders screen states to standalone HTML documents. A pure function of
/// the state: same input, same markup.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
  default_fg: String,
  default_bg: String,
}

impl Default for HtmlRenderer {
  fn default() -> Self {
    Self::new()
  }
}

impl HtmlRenderer {
  #[must_use]
  pub fn new() -> Self {
    Self {
      default_fg: DEFAULT_FG.to_string(),
      default_bg: DEFAULT_BG.to_string(),
    }
  }

  #[must_use]
  pub fn with_defaults(default_fg: impl Into<String>, default_bg: impl Into<String>) -> Self {
    Self {
      default_fg: default_fg.into(),
      default_bg: default_bg.into(),
    }
  }

  /// Render to a file, creating parent directories as needed.
  pub fn render(&self, state: &ScreenState, path: &Path, title: Option<&str>) -> Result<()> {
    let html = self.render_to_string(state, title);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, html)?;
    Ok(())
  }

  #[must_use]
  pub fn render_to_string(&self, state: &ScreenState, title: Option<&str>) -> String {
    let title = title.unwrap_or(DEFAULT_TITLE);
    let mut body = String::new();
    for (row_idx, row) in state.cells.iter().enumerate() {
      if row_idx > 0 {
        body.push('\n');
      }
      for (col_idx, cell) in row.iter().enumerate() {
        self.render_cell(&mut body, row_idx, col_idx, cell, state);
      }
    }
    format!(
      "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
       <title>{title}</title>\n<style>\n\
       body {{ background: #1d1f21; color: #d0d0d0; font-family: 'Fira Code', 'Consolas', 'Menlo', monospace; }}\n\
       pre {{ line-height: 1.2; font-size: 14px; margin: 16px; }}\n\
       .cursor {{ outline: 1px solid #ffb454; }}\n\
       </style>\n</head>\n<body>\n<pre>\n{body}\n</pre>\n</body>\n</html>\n",
      title = escape_html(title),
    )
  }

  fn render_cell(
    &self,
    out: &mut String,
    row_idx: usize,
    col_idx: usize,
    cell: &CellStyle,
    state: &ScreenState,
  ) {
    let mut fg = self.resolve(cell.fg, &self.default_fg);
    let mut bg = self.resolve(cell.bg, &self.default_bg);
    if cell.reverse {
      std::mem::swap(&mut fg, &mut bg);
    }
    let cursor =
      row_idx == state.cursor_row as usize && col_idx == state.cursor_col as usize;
    let class_attr = if cursor { " class=\"cursor\"" } else { "" };
    let weight = if cell.bold { " font-weight: bold;" } else { "" };
    let glyph = if cell.ch.is_empty() || cell.ch == " " {
      "&nbsp;".to_string()
    } else {
      escape_html(&cell.ch)
    };
    out.push_str(&format!(
      "<span{class_attr} style=\"color: {fg}; background: {bg};{weight}\">{glyph}</span>"
    ));
  }

  fn resolve(&self, color: Option<CellColor>, default: &str) -> String {
    match color {
      None => default.to_string(),
      Some(CellColor::Indexed(idx)) => indexed_hex(idx),
      Some(CellColor::Rgb(r, g, b)) => format!("#{r:02x}{g:02x}{b:02x}"),
    }
  }
}

/// Resolve an xterm-256 palette index: the 16 base colors, the 6x6x6
/// cube, then the grayscale ramp.
fn indexed_hex(idx: u8) -> String {
  if idx < 16 {
    return ANSI_PALETTE[idx as usize].to_string();
  }
  if idx < 232 {
    let idx = idx - 16;
    let steps = [0u8, 95, 135, 175, 215, 255];
    let r = steps[(idx / 36) as usize];
    let g = steps[((idx / 6) % 6) as usize];
    let b = steps[(idx % 6) as usize];
    return format!("#{r:02x}{g:02x}{b:02x}");
  }
  let level = 8 + 10 * (idx - 232);
  format!("#{level:02x}{level:02x}{level:02x}")
}

fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      _ => out.push(ch),
    }
  }
  out
}
