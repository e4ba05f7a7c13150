//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and windows and wires them to the GPU and input layers.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
pub use winit::window::CursorIcon;
