//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! `platform::winit` translates window events into `InputEvent`s.

mod frame;
mod key_set;
pub mod platform;
mod state;
mod types;

pub use frame::{scroll_lines, InputFrame, PIXELS_PER_SCROLL_LINE};
pub use key_set::KeySet;
pub use state::InputState;
pub use types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent, PointerMoveEvent,
};
