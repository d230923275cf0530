use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(version, about = "Record and replay terminal sessions", long_about = None, bin_name = "timewalker")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Execute a scenario and capture artifacts
  Run(RunArgs),
  /// Replay a captured run and export keyframe frames
  Replay(ReplayArgs),
}

#[derive(Debug, ClapArgs)]
pub struct RunArgs {
  /// Path to the scenario JSON document
  pub scenario: PathBuf,
  /// Override the artifact output directory
  #[arg(long)]
  pub output_dir: Option<PathBuf>,
  /// Level for logs.jsonl in the output directory
  #[arg(long, value_enum, default_value = "info")]
  pub log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
  Off,
  Warn,
  Info,
  Debug,
  Trace,
}

#[derive(Debug, ClapArgs)]
pub struct ReplayArgs {
  /// Run directory containing ansi.bin and keyframes.json
  pub run_dir: PathBuf,
  /// Terminal rows used during capture
  #[arg(long, default_value_t = 24)]
  pub rows: u16,
  /// Terminal cols used during capture
  #[arg(long, default_value_t = 80)]
  pub cols: u16,
  /// Directory for exported HTML frames (defaults to the run directory)
  #[arg(long)]
  pub export: Option<PathBuf>,
}
