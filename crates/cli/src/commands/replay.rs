use std::fs;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize as _;
use timewalker_core::capture::Keyframe;
use timewalker_core::pty::PtySize;
use timewalker_core::render::HtmlRenderer;
use timewalker_core::replay::{AnsiReplayParser, extract_keyframes};

use crate::args::ReplayArgs;

pub fn execute(args: &ReplayArgs) -> Result<()> {
  let ansi_path = args.run_dir.join("ansi.bin");
  let keyframe_path = args.run_dir.join("keyframes.json");
  if !ansi_path.exists() {
    bail!("{} does not contain ansi.bin", args.run_dir.display());
  }
  let keyframes: Vec<Keyframe> = if keyframe_path.exists() {
    serde_json::from_str(&fs::read_to_string(&keyframe_path)?)
      .context("parse keyframes.json")?
  } else {
    Vec::new()
  };

  let parser = AnsiReplayParser::new(PtySize {
    rows: args.rows,
    cols: args.cols,
  });
  let result = parser.parse(&ansi_path)?;
  println!(
    "{} states, {} warnings, {} keyframes",
    result.states.len(),
    result.warnings.len(),
    keyframes.len()
  );
  for entry in &result.warnings {
    println!(
      "  {} {} at byte {}: {}",
      "warn".yellow(),
      entry.warning.kind,
      entry.offset,
      entry.warning.original
    );
  }

  let frames = extract_keyframes(&result.states, &keyframes);
  let export_dir = args.export.clone().unwrap_or_else(|| args.run_dir.clone());
  let renderer = HtmlRenderer::new();
  let mut labels: Vec<String> = frames.keys().cloned().collect();
  labels.sort();
  for label in labels {
    let state = frames[&label];
    let path = export_dir.join(format!("{label}.html"));
    renderer.render(state, &path, Some(&label))?;
    println!("  {} {}", "frame".green(), path.display());
  }
  Ok(())
}
