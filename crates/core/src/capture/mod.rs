//! Interactive capture: scripted PTY sessions, output pumping, stream
//! recording and keyframe marking.

mod buffer;
mod condition;
mod driver;
mod keyframes;
mod pump;
mod recorder;
mod script;

pub use buffer::OutputBuffer;
pub use condition::OutputCondition;
pub use driver::ScriptDriver;
pub use keyframes::{Keyframe, KeyframeRegistry};
pub use pump::OutputPump;
pub use recorder::AnsiStreamRecorder;
pub use script::{
  DEFAULT_EXPECT_TIMEOUT, InputStep, MarkStep, ResizeStep, ScriptConfig, SessionArtifacts, Step,
  WaitStep,
};
