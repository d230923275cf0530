//! Offline replay: normalization, VT emulation and keyframe correlation.

mod correlate;
mod normalize;
mod parser;

pub use correlate::extract_keyframes;
pub use normalize::{
  ParseWarning, SequenceNormalizer, TerminalCapabilities, WarningCollector, WarningEntry,
  WarningKind,
};
pub use parser::{
  AnsiReplayParser, CellColor, CellStyle, DEFAULT_REPLAY_CHUNK, ReplayResult, ScreenState,
};
