//! Timewalker CLI: capture scripted terminal sessions and replay the
//! recordings into reviewable HTML frames.

pub mod args;
pub mod commands;

use anyhow::Result;
use clap::Parser;

pub fn run() -> Result<()> {
  let cli = args::Cli::parse();
  match cli.command {
    args::Commands::Run(run_args) => commands::run::execute(&run_args),
    args::Commands::Replay(replay_args) => commands::replay::execute(&replay_args),
  }
}
