use winit::window::WindowId;

use super::ctx::FrameCtx;
use crate::input::InputEvent;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by the runtime.
pub trait App {
    /// Called for every translated input event, before the window's `InputState` sees it.
    fn on_input(&mut self, window_id: WindowId, event: &InputEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per rendered frame per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once when the event loop is shutting down; release GPU resources here.
    fn on_exit(&mut self) {}
}
