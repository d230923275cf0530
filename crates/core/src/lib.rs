//! Core library for the timewalker capture/replay engine.
//!
//! Drives an interactive program under a pseudo-terminal, records the raw
//! output stream byte-for-byte together with labeled keyframe offsets, and
//! deterministically replays the recording through a VT emulator to
//! reconstruct the screen at each keyframe.
//!
//! Quick start:
//! - Build a [`capture::ScriptConfig`] (or load a scenario JSON through
//!   [`scenario::load_scenario`]) and run it with [`capture::ScriptDriver`].
//! - Replay the produced `ansi.bin` with [`replay::AnsiReplayParser`] and
//!   map keyframes onto screen states via [`replay::extract_keyframes`].
//! - Export frames with [`render::HtmlRenderer`].

pub mod capture;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod pty;
pub mod render;
pub mod replay;
pub mod scenario;

pub use error::{Result, TimewalkerError};
