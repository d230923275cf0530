use std::collections::HashMap;

use super::parser::ScreenState;
use crate::capture::Keyframe;

/// Map each keyframe to the first state whose offset is at or past the
/// keyframe's offset, falling back to the terminal state. Returns an
/// empty mapping when there are no states; duplicate labels resolve to
/// the last occurrence.
#[must_use]
pub fn extract_keyframes<'a>(
  states: &'a [ScreenState],
  keyframes: &[Keyframe],
) -> HashMap<String, &'a ScreenState> {
  let mut mapping = HashMap::new();
  if states.is_empty() {
    return mapping;
  }
  for frame in keyframes {
    if let Some(state) = locate_state(states, frame.offset) {
      mapping.insert(frame.label.clone(), state);
    }
  }
  mapping
}

fn locate_state(states: &[ScreenState], offset: u64) -> Option<&ScreenState> {
  states
    .iter()
    .find(|state| state.offset >= offset)
    .or_else(|| states.last())
}
