use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton, MouseWheelDelta};

/// Logical pixels per scroll line for high-precision wheel input.
pub const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

/// Per-frame input deltas.
///
/// `InputState` holds what is currently down; `InputFrame` holds what happened
/// since the last `clear`.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Window size or scale factor changed this frame.
    pub resized: bool,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.resized = false;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    /// Vertical scroll this frame in lines; pixel deltas are converted.
    pub fn scroll_lines(&self) -> f32 {
        self.events
            .iter()
            .filter_map(|ev| match ev {
                InputEvent::MouseWheel { delta, .. } => Some(scroll_lines(*delta)),
                _ => None,
            })
            .filter(|y| y.is_finite())
            .sum()
    }
}

/// Vertical component of a wheel delta in lines.
pub fn scroll_lines(delta: MouseWheelDelta) -> f32 {
    match delta {
        MouseWheelDelta::Line { y, .. } => y,
        MouseWheelDelta::Pixel { y, .. } => y / PIXELS_PER_SCROLL_LINE,
    }
}
